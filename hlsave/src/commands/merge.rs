use super::options;
use anyhow::{Result, bail};
use clap::Args;
use hlsave::{LogReporter, downloader};
use std::path::PathBuf;

/// Merge an existing directory of numbered .ts segments into one file.
#[derive(Debug, Clone, Args)]
pub struct Merge {
    /// Directory holding 00000.ts, 00001.ts, ...
    #[arg(required = true)]
    pub directory: PathBuf,

    /// Path for merged output file.
    #[arg(short, long, required = true)]
    pub output: PathBuf,

    /// Merge every segment without checking them for foreign content.
    #[arg(long)]
    pub no_probe: bool,
}

impl Merge {
    pub async fn execute(self) -> Result<()> {
        let probe = options::media_probe(self.no_probe);
        let reporter = LogReporter::new();
        let outcome =
            downloader::merge_dir(probe.as_ref(), &reporter, &self.directory, &self.output).await;

        if !outcome.is_success() {
            bail!("{}", options::describe(&outcome));
        }

        Ok(())
    }
}
