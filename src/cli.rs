use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the newsbrief digest pipeline.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the TOML config file (defaults to the platform config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the recurring summary and delivery scheduler
    Run,
    /// Generate the daily summaries for every active tag
    Summarize,
    /// Force regeneration of one tag's summary for today
    SummarizeTag {
        /// Tag to regenerate
        tag: String,
    },
    /// Summarize and classify articles that are missing summaries or tags
    Backfill,
    /// Drain the delivery queue once
    Drain,
    /// Print the stored daily summaries for a day
    Show {
        /// Day to show as YYYY-MM-DD (defaults to today)
        #[arg(short, long)]
        date: Option<String>,
        /// Restrict the listing to one tag
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Assemble one subscriber's digest, enqueue it, and deliver immediately
    Send {
        /// Subscriber email address
        email: String,
    },
    /// Compose a personalized news letter for one subscriber and print it
    Letter {
        /// Subscriber email address
        email: String,
    },
}
