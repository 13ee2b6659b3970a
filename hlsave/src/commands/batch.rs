use super::options::{self, ClientArgs, DownloadArgs};
use anyhow::{Context, Result};
use clap::Args;
use hlsave::DownloadItem;
use std::{fs, path::PathBuf};

/// Download every item of a json file, e.g. one written by `crawl --list`.
///
/// Each item is `{"name": .., "episode": 1 | "HD", "page_url": .., "manifest_url": ..}`.
#[derive(Debug, Clone, Args)]
pub struct Batch {
    /// Json file holding an array of items.
    #[arg(required = true)]
    pub input: PathBuf,

    #[command(flatten)]
    pub client: ClientArgs,

    #[command(flatten)]
    pub download: DownloadArgs,
}

impl Batch {
    pub async fn execute(self) -> Result<()> {
        let bytes =
            fs::read(&self.input).with_context(|| format!("could not read {}", self.input.display()))?;
        let items = serde_json::from_slice::<Vec<DownloadItem>>(&bytes)
            .with_context(|| format!("could not parse {}", self.input.display()))?;
        let downloader = self.download.downloader(self.client.transport()?);

        options::download_all(&downloader, &items).await
    }
}
