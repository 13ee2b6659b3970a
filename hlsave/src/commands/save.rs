use super::options::{self, ClientArgs, DownloadArgs};
use anyhow::Result;
use clap::Args;
use hlsave::{DownloadItem, EpisodeLabel, reqwest::Url};

/// Download one HLS playlist into `<root>/<name>/<episode>.mp4`.
#[derive(Debug, Clone, Args)]
pub struct Save {
    /// http(s):// url of a media or master .m3u8 playlist.
    #[arg(required = true)]
    pub input: Url,

    /// Title, used as the folder name.
    #[arg(short, long)]
    pub name: String,

    /// Episode label, numbers are zero padded to three digits.
    #[arg(short, long, default_value = "HD")]
    pub episode: String,

    /// Page the playlist was found on. Only recorded for reference.
    #[arg(long)]
    pub page_url: Option<String>,

    #[command(flatten)]
    pub client: ClientArgs,

    #[command(flatten)]
    pub download: DownloadArgs,
}

impl Save {
    pub async fn execute(self) -> Result<()> {
        let item = DownloadItem {
            name: self.name,
            episode: EpisodeLabel::parse(&self.episode),
            page_url: self.page_url.unwrap_or_default(),
            manifest_url: self.input.to_string(),
        };
        let downloader = self.download.downloader(self.client.transport()?);

        options::download_all(&downloader, &[item]).await
    }
}
