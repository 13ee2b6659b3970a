use super::options::{self, ClientArgs, DownloadArgs};
use anyhow::{Result, bail};
use clap::Args;
use hlsave::{EpisodeRange, crawler_for, reqwest::Url};
use log::info;

/// Find every episode linked from a play page and download them in order.
#[derive(Debug, Clone, Args)]
pub struct Crawl {
    /// http(s):// url of an episode play page.
    #[arg(required = true)]
    pub input: Url,

    /// Title, used as the folder name.
    #[arg(short, long)]
    pub name: String,

    /// First numeric episode to download (inclusive).
    #[arg(long)]
    pub start: Option<u32>,

    /// Last numeric episode to download (inclusive).
    #[arg(long)]
    pub end: Option<u32>,

    /// Print the episodes found in json format instead of downloading them.
    #[arg(long)]
    pub list: bool,

    #[command(flatten)]
    pub client: ClientArgs,

    #[command(flatten)]
    pub download: DownloadArgs,
}

impl Crawl {
    pub async fn execute(self) -> Result<()> {
        let transport = self.client.transport()?;
        let range = EpisodeRange {
            start: self.start,
            end: self.end,
        };

        info!("Scraping {}", self.input);
        let items = crawler_for(&self.input, transport.clone())
            .pages(&self.name, &self.input, range)
            .await?;

        if items.is_empty() {
            bail!("No episodes were found on {}.", self.input);
        }

        info!("Found {} episodes", items.len());

        if self.list {
            serde_json::to_writer_pretty(std::io::stdout(), &items)?;
            println!();
            return Ok(());
        }

        let downloader = self.download.downloader(transport);
        options::download_all(&downloader, &items).await
    }
}
