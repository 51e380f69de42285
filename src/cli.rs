//! CLI argument parsing for lineprof

use std::path::PathBuf;

use clap::Parser;

use crate::color::ColorMode;
use crate::demo::Scenario;

#[derive(Parser, Debug)]
#[command(name = "lineprof")]
#[command(version)]
#[command(about = "Line-by-line wall-clock profiler for scoped code blocks", long_about = None)]
pub struct Cli {
    /// Workload to run under the profiler
    #[arg(short, long, value_enum, default_value = "arith")]
    pub scenario: Scenario,

    /// Colorize report rows (auto honors NO_COLOR and terminal detection)
    #[arg(long, value_enum)]
    pub color: Option<ColorMode>,

    /// Load profiler settings from a TOML file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also write the finished profile as JSON
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Sleep duration for the sleep scenario, in milliseconds
    #[arg(long = "sleep-ms", value_name = "MS", default_value = "50")]
    pub sleep_ms: u64,

    /// Iteration count for the loop scenario
    #[arg(long, value_name = "N", default_value = "1000")]
    pub iterations: u64,

    /// Enable debug tracing output to stderr
    #[arg(long)]
    pub debug: bool,
}
