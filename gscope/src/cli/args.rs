//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::walker::DEFAULT_MAX_DEPTH;

#[derive(Parser, Debug)]
#[command(
    name = "gscope",
    about = "List the goroutines of a running Go program without stopping it",
    after_help = "\
EXAMPLES:
    sudo gscope my-app                          Auto-detect PID and binary
    sudo gscope --pid 1234                      Explicit PID, auto-detect binary
    sudo gscope --pid 1234 --target ./myapp     Explicit PID and binary
    sudo gscope my-app --json --all             Every goroutine, as JSON"
)]
pub struct Args {
    /// Process name to inspect (auto-detects PID and binary)
    #[arg(value_name = "PROCESS")]
    pub process: Option<String>,

    /// Process ID to inspect (binary path auto-detected from /proc)
    #[arg(short, long)]
    pub pid: Option<i32>,

    /// Path to binary for symbol resolution (optional, auto-detected if omitted)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Runtime version to assume instead of the one embedded in the binary (e.g. go1.21.5)
    #[arg(long, value_name = "VERSION")]
    pub go_version: Option<String>,

    /// Include dead goroutines
    #[arg(long)]
    pub all: bool,

    /// Maximum number of frames walked per goroutine
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Write the JSON report to a file
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Print JSON instead of the text listing
    #[arg(long)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}
