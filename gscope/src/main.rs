//! # gscope - Main Entry Point
//!
//! - `gscope <PROCESS>` or `gscope --pid <PID>`: print every goroutine's stack
//! - `--json` / `--export FILE`: machine-readable report

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::io::{self, BufWriter, Write};

use gscope::cli::Args;
use gscope::domain::Pid;
use gscope::inspect::{inspect, InspectOptions};
use gscope::preflight::{check_proc_access, check_process_exists, run_preflight_checks};
use gscope::process_lookup::{find_process_by_name, resolve_exe_path};
use gscope::snapshot::ProcImage;
use gscope::symbolization::ElfMetadata;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = format!("{err:#}").to_lowercase();
    if msg.contains("permission denied") || msg.contains("operation not permitted") {
        EXIT_NOPERM
    } else if msg.contains("missing required argument") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

/// Resolve PID and binary path from CLI arguments.
///
/// Supports three modes:
/// - `gscope my-app` - find process by name, auto-detect binary
/// - `gscope --pid 1234` - explicit PID, auto-detect binary from /proc
/// - `gscope --pid 1234 --target ./app` - explicit PID and binary
fn resolve_pid_and_target(args: &Args) -> Result<(i32, String)> {
    if let Some(ref name) = args.process {
        if args.pid.is_some() || args.target.is_some() {
            anyhow::bail!(
                "Cannot use PROCESS argument with --pid or --target.\n\n\
                 Use either:\n  \
                 gscope my-app              (auto-detect)\n  \
                 gscope --pid 1234          (explicit PID)"
            );
        }
        let info = find_process_by_name(name)?;
        let target = info.exe_path.to_string_lossy().into_owned();
        return Ok((info.pid, target));
    }

    if let Some(pid) = args.pid {
        let target = if let Some(ref t) = args.target {
            std::fs::canonicalize(t)
                .with_context(|| format!("Failed to resolve path: {t}"))?
                .to_string_lossy()
                .into_owned()
        } else {
            resolve_exe_path(pid)?.to_string_lossy().into_owned()
        };
        return Ok((pid, target));
    }

    anyhow::bail!(
        "Missing required argument: PROCESS or --pid\n\n\
         Usage:\n  \
         gscope my-app              Auto-detect PID and binary\n  \
         gscope --pid 1234          Explicit PID, auto-detect binary\n\n\
         Run 'gscope --help' for more options"
    )
}

fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    let (pid, target_path) = resolve_pid_and_target(&args)?;

    run_preflight_checks(&target_path, quiet)?;
    check_process_exists(pid)?;
    check_proc_access(pid)?;

    if !quiet {
        eprintln!("gscope v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("target: {target_path}");
        eprintln!("pid: {pid}");
    }

    let image = ProcImage::open(Pid::from(pid))?;
    let metadata = ElfMetadata::new(&target_path);
    let options = InspectOptions {
        include_dead: args.all,
        max_depth: args.max_depth,
        version_override: args.go_version.clone(),
    };

    let report = inspect(&image, &metadata, &options)
        .with_context(|| format!("Failed to inspect process {pid}"))?;
    info!("Registry at 0x{:x}, layout {}", report.registry_address, report.layout);

    if !quiet {
        eprintln!(
            "runtime: {} (layout {}), goroutines: {}",
            if report.version.is_empty() { "unknown" } else { &report.version },
            report.layout,
            report.tasks.len()
        );
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if args.json {
        report.write_json(&mut out)?;
    } else {
        report.write_text(&mut out)?;
    }
    out.flush()?;

    if let Some(ref export_path) = args.export {
        report
            .export(export_path)
            .with_context(|| format!("Failed to export report to {}", export_path.display()))?;
        if !quiet {
            eprintln!("export: {}", export_path.display());
        }
    }

    Ok(())
}
