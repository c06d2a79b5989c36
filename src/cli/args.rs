use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wq-processor")]
#[command(about = "Water-quality monitoring data processor")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate and enrich a monitoring file, writing the derived table
    Process {
        #[arg(short, long, help = "Input delimited monitoring file")]
        input: PathBuf,

        #[arg(
            short,
            long,
            help = "Output CSV path [default: <input>-enriched.csv]"
        )]
        output: Option<PathBuf>,

        #[arg(long, help = "JSON file of plausible ranges, overrides defaults")]
        ranges: Option<PathBuf>,

        #[arg(long, default_value = "false", help = "Drop range-violating rows")]
        drop_flagged: bool,
    },

    /// Report plausible-range violations without writing output
    Validate {
        #[arg(short, long, help = "Input delimited monitoring file")]
        input: PathBuf,

        #[arg(long, help = "JSON file of plausible ranges, overrides defaults")]
        ranges: Option<PathBuf>,
    },

    /// Per-station summary statistics
    Summarize {
        #[arg(short, long, help = "Input delimited monitoring file")]
        input: PathBuf,

        #[arg(long, default_value = "station", help = "Group key column")]
        group_by: String,

        #[arg(long, default_value = "false", help = "Emit JSON instead of a table")]
        json: bool,
    },

    /// Missing-data and descriptive profile of a monitoring file
    Profile {
        #[arg(short, long, help = "Input delimited monitoring file")]
        input: PathBuf,
    },
}
