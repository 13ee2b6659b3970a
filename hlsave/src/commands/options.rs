use anyhow::{Result, bail};
use clap::Args;
use hlsave::{
    ClientConfig, DownloadConfig, DownloadItem, Downloader, FfprobeProbe, HttpTransport,
    LogReporter, MediaProbe, NoopProbe, Outcome, Transport, client::DEFAULT_USER_AGENT,
};
use log::{info, warn};
use std::{path::PathBuf, sync::Arc, time::Duration};

#[derive(Debug, Clone, Args)]
pub struct ClientArgs {
    /// Custom headers for requests.
    /// This option can be used multiple times.
    #[arg(long, help_heading = "Client Options", num_args = 2, value_names = &["KEY", "VALUE"])]
    pub header: Vec<String>, // Vec<(String, String)> not supported

    /// Skip checking and validation of site certificates.
    #[arg(long, help_heading = "Client Options")]
    pub no_certificate_checks: bool,

    /// Set http(s) / socks proxy address for requests.
    #[arg(long, help_heading = "Client Options")]
    pub proxy: Option<String>,

    /// Seconds to wait for a connection to be established.
    #[arg(long, help_heading = "Client Options", default_value_t = 5)]
    pub connect_timeout: u64,

    /// Seconds to wait for data on an open connection.
    #[arg(long, help_heading = "Client Options", default_value_t = 10)]
    pub read_timeout: u64,

    /// Update and set user agent header for requests.
    #[arg(long, help_heading = "Client Options", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

impl ClientArgs {
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            user_agent: self.user_agent.clone(),
            headers: self
                .header
                .chunks(2)
                .filter_map(|x| match x {
                    [key, value] => Some((key.to_owned(), value.to_owned())),
                    _ => None,
                })
                .collect(),
            connect_timeout: Duration::from_secs(self.connect_timeout),
            read_timeout: Duration::from_secs(self.read_timeout),
            proxy: self.proxy.clone(),
            danger_accept_invalid_certs: self.no_certificate_checks,
        }
    }

    pub fn transport(&self) -> Result<Arc<dyn Transport>> {
        Ok(Arc::new(HttpTransport::new(&self.config())?))
    }
}

#[derive(Debug, Clone, Args)]
pub struct DownloadArgs {
    /// Directory under which `<name>/<episode>.mp4` files are written.
    #[arg(short, long, help_heading = "Download Options", default_value = "video")]
    pub root: PathBuf,

    /// Maximum number of segments downloaded in parallel.
    /// Number of threads should be in range 1-20 (inclusive).
    #[arg(short, long, help_heading = "Download Options", default_value_t = 10, value_parser = clap::value_parser!(u8).range(1..=20))]
    pub threads: u8,

    /// Maximum number of retries to download an individual segment.
    #[arg(long, help_heading = "Download Options", default_value_t = 10)]
    pub retry_count: usize,

    /// Seconds to wait before retrying a failed segment.
    #[arg(long, help_heading = "Download Options", default_value_t = 10)]
    pub retry_delay: u64,

    /// Seconds to wait before retrying a failed playlist request.
    #[arg(long, help_heading = "Download Options", default_value_t = 15)]
    pub playlist_retry_delay: u64,

    /// Merge segments without checking them for foreign (advertisement) content.
    /// Implied when ffprobe cannot be found.
    #[arg(long, help_heading = "Download Options")]
    pub no_probe: bool,
}

impl DownloadArgs {
    pub fn config(&self) -> DownloadConfig {
        DownloadConfig {
            root: self.root.clone(),
            threads: self.threads as usize,
            segment_retries: self.retry_count,
            segment_retry_delay: Duration::from_secs(self.retry_delay),
            manifest_retry_delay: Duration::from_secs(self.playlist_retry_delay),
            ..Default::default()
        }
    }

    pub fn downloader(&self, transport: Arc<dyn Transport>) -> Downloader {
        Downloader::new(
            self.config(),
            transport,
            media_probe(self.no_probe),
            Arc::new(LogReporter::new()),
        )
    }
}

pub fn media_probe(disabled: bool) -> Arc<dyn MediaProbe> {
    if disabled {
        return Arc::new(NoopProbe);
    }

    match FfprobeProbe::find() {
        Some(probe) => Arc::new(probe),
        None => {
            warn!("ffprobe couldn't be found, segments will be merged without checking them.");
            Arc::new(NoopProbe)
        }
    }
}

/// Downloads `items` one after another and fails if any of them did not
/// complete.
pub async fn download_all(downloader: &Downloader, items: &[DownloadItem]) -> Result<()> {
    let mut failed = vec![];

    for item in items {
        let outcome = downloader.download(item).await;

        if !outcome.is_success() {
            failed.push((item, outcome));
        }
    }

    info!(
        "{} of {} episodes completed",
        items.len() - failed.len(),
        items.len()
    );

    if failed.is_empty() {
        return Ok(());
    }

    for (item, outcome) in &failed {
        warn!("{} {}: {}", item.name, item.episode, describe(outcome));
    }

    bail!("{} episodes did not complete, run again to resume.", failed.len())
}

pub fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::AlreadyComplete { target } => format!("already merged {}", target.display()),
        Outcome::Merged {
            target,
            merged,
            skipped,
        } => format!(
            "merged {} ({} segments, {} skipped)",
            target.display(),
            merged,
            skipped
        ),
        Outcome::Incomplete { found, expected } => {
            format!("{} of {} segments downloaded", found, expected)
        }
        Outcome::MergeFailed { reason, .. } => format!("merge failed ({})", reason),
        Outcome::Unsupported { reason } => reason.to_owned(),
        Outcome::Failed { reason } => reason.to_owned(),
    }
}
