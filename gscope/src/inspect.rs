//! End-to-end inspection of one process
//!
//! Ties the stages together: metadata, layout selection, snapshot, registry
//! scan, stack walks and symbolization.

use log::{debug, info};

use crate::domain::{InspectError, Task};
use crate::layout::LayoutSet;
use crate::report::{Report, TaskReport};
use crate::scanner::RegistryScanner;
use crate::snapshot::{ProcessImage, Snapshot};
use crate::symbolization::{MetadataSource, SymbolResolver, SymbolTable};
use crate::walker::{StackWalker, DEFAULT_MAX_DEPTH};

/// Knobs for one inspection
#[derive(Debug, Clone)]
pub struct InspectOptions {
    /// Report dead goroutines as well
    pub include_dead: bool,
    /// Maximum number of walked frames per goroutine
    pub max_depth: usize,
    /// Use this runtime version instead of the one found in the binary
    pub version_override: Option<String>,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self { include_dead: false, max_depth: DEFAULT_MAX_DEPTH, version_override: None }
    }
}

/// Symbolized frames of `task`: the saved pc, then every walked return address
#[must_use]
pub fn task_frames(
    task: &Task,
    snapshot: &Snapshot,
    resolver: &SymbolResolver,
    max_depth: usize,
) -> Vec<String> {
    let saved = (task.pc != 0).then_some(task.pc);
    saved
        .into_iter()
        .chain(StackWalker::new(snapshot, task.bp).with_max_depth(max_depth))
        .map(|pc| resolver.format(pc))
        .collect()
}

/// Inspect the process behind `image`, reading metadata from `metadata`
///
/// # Errors
/// Returns an error if metadata extraction, layout selection, the snapshot
/// or the registry scan fails
pub fn inspect<I, M>(image: &I, metadata: &M, options: &InspectOptions) -> Result<Report, InspectError>
where
    I: ProcessImage + ?Sized,
    M: MetadataSource + ?Sized,
{
    let metadata = metadata.extract()?;
    let version = options.version_override.clone().unwrap_or(metadata.version);
    let layouts = LayoutSet::for_version(&version)?;
    info!("Using layout {} for runtime {version:?}", layouts.label());

    let snapshot = Snapshot::capture(image)?;
    let registry = RegistryScanner::new(&snapshot, &layouts).scan()?;

    let table = SymbolTable::from_functions(&metadata.functions, metadata.text);
    debug!("Symbol table holds {} functions", table.len());
    let resolver = SymbolResolver::new(table, snapshot.init_addr());

    let tasks: Vec<TaskReport> = registry
        .tasks
        .iter()
        .filter(|task| options.include_dead || !task.is_dead())
        .map(|task| TaskReport::new(task, task_frames(task, &snapshot, &resolver, options.max_depth)))
        .collect();
    info!("Reporting {} of {} goroutines", tasks.len(), registry.tasks.len());

    Ok(Report {
        version,
        layout: layouts.label().to_string(),
        registry_address: registry.address,
        tasks,
    })
}
