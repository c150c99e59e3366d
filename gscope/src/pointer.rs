//! Typed views into a snapshot
//!
//! A [`TypedPointer`] pairs a target address with the [`Prototype`] that
//! describes what lives there, and decodes fields as little-endian unsigned
//! integers. Reads never fail hard: anything outside the snapshot comes back
//! as `None` so the registry scanner can simply move on.

use crate::layout::Prototype;
use crate::snapshot::Snapshot;

/// Decode 1, 2, 4 or 8 little-endian bytes
#[must_use]
pub fn decode_le(bytes: &[u8]) -> Option<u64> {
    Some(match bytes.len() {
        1 => u64::from(bytes[0]),
        2 => u64::from(u16::from_le_bytes(bytes.try_into().ok()?)),
        4 => u64::from(u32::from_le_bytes(bytes.try_into().ok()?)),
        8 => u64::from_le_bytes(bytes.try_into().ok()?),
        _ => return None,
    })
}

/// Address + layout + snapshot; a non-owning view
#[derive(Debug, Clone, Copy)]
pub struct TypedPointer<'a> {
    address: u64,
    proto: Option<&'a Prototype>,
    snapshot: &'a Snapshot,
}

impl<'a> TypedPointer<'a> {
    #[must_use]
    pub fn new(address: u64, proto: &'a Prototype, snapshot: &'a Snapshot) -> Self {
        Self { address, proto: Some(proto), snapshot }
    }

    /// Pointer to an array whose elements have no prototype; only [`Self::index`] applies
    #[must_use]
    pub fn untyped(address: u64, snapshot: &'a Snapshot) -> Self {
        Self { address, proto: None, snapshot }
    }

    #[must_use]
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Read a named field, `None` if its bytes are not in the snapshot
    ///
    /// # Panics
    /// Panics if the pointer is untyped or the prototype has no such field.
    /// Prototypes are validated when their [`LayoutSet`](crate::layout::LayoutSet)
    /// is built, so this only fires on a programming error.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<u64> {
        let proto = self
            .proto
            .unwrap_or_else(|| panic!("field {name} read through an untyped pointer"));
        let field = proto
            .field(name)
            .unwrap_or_else(|| panic!("prototype {} has no field {name}", proto.name()));
        let addr = self.address.checked_add(field.offset)?;
        decode_le(self.snapshot.read(addr, field.size)?)
    }

    /// Read the `i`-th element of `size` bytes starting at this address
    #[must_use]
    pub fn index(&self, i: u64, size: u64) -> Option<u64> {
        let addr = self.address.checked_add(i.checked_mul(size)?)?;
        decode_le(self.snapshot.read(addr, size)?)
    }
}
