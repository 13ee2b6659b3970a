mod batch;
mod check;
mod crawl;
mod merge;
mod options;
mod save;

pub use batch::Batch;
pub use check::Check;
pub use crawl::Crawl;
pub use merge::Merge;
pub use save::Save;

use clap::{ColorChoice, Parser, Subcommand};

/// Download HLS (.m3u8) streams into single video files, resuming where a
/// previous run stopped.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// When to output colored text.
    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Also print debug messages, such as skipped advertisement segments.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Batch(Batch),
    Check(Check),
    Crawl(Crawl),
    Merge(Merge),
    Save(Save),
}
