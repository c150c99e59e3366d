//! # gscope - Goroutine Inspector for Live Go Processes
//!
//! gscope lists every goroutine of a running Go program together with its
//! call stack, without attaching a debugger, stopping the process or
//! requiring anything from the target beyond an unstripped binary. It reads
//! the target's memory through `/proc/<pid>/mem`, finds the runtime's
//! goroutine registry (`runtime.allgs`) by brute force, and walks each
//! goroutine's frame-pointer chain.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │  /proc/<pid>/maps    │      │  target executable   │
//! │  /proc/<pid>/mem     │      │  (ELF symbols,       │
//! │                      │      │   .go.buildinfo)     │
//! └──────────┬───────────┘      └──────────┬───────────┘
//!            │ ProcessImage                │ MetadataSource
//!            ▼                             ▼
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │  Snapshot            │      │  BinaryMetadata      │
//! │  text / other / heap │      │  version, functions  │
//! └──────────┬───────────┘      └──────────┬───────────┘
//!            │                             │ version
//!            │                             ▼
//!            │                  ┌──────────────────────┐
//!            │                  │  LayoutSet           │
//!            │                  │  runtime.g offsets   │
//!            │                  └──────────┬───────────┘
//!            ▼                             │
//! ┌─────────────────────────────────────────────────────┐
//! │  RegistryScanner  (every aligned word is a          │
//! │  candidate slice header; first valid one wins)      │
//! └──────────┬──────────────────────────────────────────┘
//!            │ tasks
//!            ▼
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │  StackWalker         │─────▶│  SymbolResolver      │
//! │  bp chain            │ pcs  │  name+offset         │
//! └──────────────────────┘      └──────────┬───────────┘
//!                                          ▼
//!                                       Report
//! ```
//!
//! ## Module Structure
//!
//! - [`snapshot`]: `/proc` access and the frozen memory [`snapshot::Snapshot`]
//! - [`layout`]: runtime version parsing and per-version structure prototypes
//! - [`pointer`]: typed field reads through the snapshot
//! - [`scanner`]: registry search and the per-goroutine validity predicate
//! - [`walker`]: frame-pointer stack walking
//! - [`symbolization`]: ELF metadata, symbol table and pc resolution
//! - [`inspect`]: the end-to-end pipeline
//! - [`report`]: text and JSON output
//! - [`cli`], [`preflight`], [`process_lookup`]: the command-line edge
//! - [`domain`]: core types and errors
//!
//! ## Limitations
//!
//! - linux/amd64 only; offsets in `gscope-common` are pinned per Go release
//! - the target keeps running while it is read, so a snapshot is best-effort
//! - frames come from the frame-pointer chain only; inlined calls and
//!   assembly routines without frame pointers are invisible
//!
//! ## Typical Usage
//!
//! ```bash
//! sudo gscope my-server
//! sudo gscope --pid 1234 --json --export goroutines.json
//! ```

pub mod cli;
pub mod domain;
pub mod inspect;
pub mod layout;
pub mod pointer;
pub mod preflight;
pub mod process_lookup;
pub mod report;
pub mod scanner;
pub mod snapshot;
pub mod symbolization;
pub mod walker;
