//! Command-line interface of the `symbasis` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::io::format::symbasis_output;

const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

/// Logs a nicely formatted `symbasis` heading to the `symbasis-output` logger.
pub fn log_heading() {
    let version = if let Some(ver) = VERSION {
        format!("v{ver}")
    } else {
        "v unknown".to_string()
    };
    symbasis_output!("╭──────────────────────────────────────────────────────────────────────────────╮");
    symbasis_output!("│                                                                              │");
    symbasis_output!("│    ┌─┐┬ ┬┌┬┐┌┐ ┌─┐┌─┐┬┌─┐                                                    │");
    symbasis_output!("│    └─┐└┬┘│││├┴┐├─┤└─┐│└─┐                                                    │");
    symbasis_output!("│    └─┘ ┴ ┴ ┴└─┘┴ ┴└─┘┴└─┘                                                    │");
    symbasis_output!("│                                                                              │");
    symbasis_output!("│    Symmetry-reduced many-body bases for lattice quantum systems              │");
    symbasis_output!("│                                                              {version:>15} │");
    symbasis_output!("╰──────────────────────────────────────────────────────────────────────────────╯");
    symbasis_output!("");
}

/// Command-line arguments of the `symbasis` binary.
#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a YAML input file.
    #[arg(short, long)]
    pub config: PathBuf,

    /// Path to the output file. If not given, the output is written to the console.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Increases the verbosity of the console log. May be given twice.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
