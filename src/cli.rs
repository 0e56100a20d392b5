use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "golf-buddy")]
#[command(about = "Find the next available tee time on golf course websites", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look for the next tee time on each page, following booking links
    AnalyzeTeeTimes {
        /// Follow booking links the model suggests (default)
        #[arg(long, overrides_with = "no_follow")]
        follow: bool,

        /// Stop at the first booking link instead of following it
        #[arg(long, overrides_with = "follow")]
        no_follow: bool,

        /// Booking links to follow per URL (defaults to GOLF_BUDDY_MAX_HOPS or 1)
        #[arg(long)]
        max_hops: Option<u32>,

        /// Golf course pages to analyze
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Print the reduced, readable text of a page
    ConvertToMarkdown {
        /// Page to convert
        url: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Command {
    /// `--no-follow` wins only when it comes last.
    pub fn follow_links(&self) -> bool {
        match self {
            Self::AnalyzeTeeTimes { no_follow, .. } => !no_follow,
            Self::ConvertToMarkdown { .. } => false,
        }
    }
}
