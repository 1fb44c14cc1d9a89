use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;

mod commands;
mod utils;

#[derive(Parser)]
#[command(name = "classad-index-cmd")]
#[command(about = "Diagnostics for ClassAd constraint indexes")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump a rectangle collection and the indexes built over it
    Inspect {
        /// JSON file holding the rectangles to index
        rectangles: String,

        /// JSON file holding a summary of the rectangles; its representatives are
        /// indexed instead
        #[arg(long)]
        summary: Option<String>,
    },

    /// Match a window of query rectangles against a rectangle collection
    Query {
        /// JSON file holding the rectangles to index
        rectangles: String,

        /// JSON file holding the query rectangles
        window: String,

        /// JSON file holding a summary of the rectangles
        #[arg(long)]
        summary: Option<String>,

        /// Also translate every match into the advertisement it stands for
        #[arg(long)]
        map: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Inspect {
            rectangles,
            summary,
        } => commands::inspect::run(rectangles, summary),
        Commands::Query {
            rectangles,
            window,
            summary,
            map,
        } => commands::query::run(rectangles, window, summary, map),
    }
}
