mod encryption;
mod fetch;
mod slots;
pub(crate) mod stream;

pub use encryption::{CipherContext, IvSource, get_cipher};
pub use fetch::resolve;
pub use slots::{ItemPaths, SLOT_EXTENSION, SlotDir};
pub use stream::{SegmentTask, Worker};

use crate::{
    client::Transport,
    crawler::DownloadItem,
    error::ManifestError,
    merger::Merger,
    probe::MediaProbe,
    report::Reporter,
};
use reqwest::Url;
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::{fs, task::JoinSet};

/// Tunables of a [`Downloader`].
#[derive(Clone, Debug)]
pub struct DownloadConfig {
    pub root: PathBuf,
    /// Segments downloaded at the same time.
    pub threads: usize,
    /// Retries of one segment after its first failed attempt.
    pub segment_retries: usize,
    pub segment_retry_delay: Duration,
    /// Playlist resolution is retried without limit, this far apart.
    pub manifest_retry_delay: Duration,
    pub max_variant_depth: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("video"),
            threads: 10,
            segment_retries: 10,
            segment_retry_delay: Duration::from_secs(10),
            manifest_retry_delay: Duration::from_secs(15),
            max_variant_depth: 10,
        }
    }
}

/// How a call to [`Downloader::download`] ended.
///
/// Every failure is also reported through the [`Reporter`]; a later call picks
/// up from whatever slots are already on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The target existed before the call, nothing was fetched.
    AlreadyComplete { target: PathBuf },
    Merged {
        target: PathBuf,
        merged: usize,
        skipped: usize,
    },
    /// Some segments are still missing after every worker finished.
    Incomplete { found: usize, expected: usize },
    MergeFailed { target: PathBuf, reason: String },
    /// The playlist uses an encryption this tool cannot undo.
    Unsupported { reason: String },
    /// Local filesystem failure outside the merge step.
    Failed { reason: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::AlreadyComplete { .. } | Self::Merged { .. })
    }
}

/// Downloads items one at a time, fetching the segments of each item in
/// parallel.
pub struct Downloader {
    config: DownloadConfig,
    transport: Arc<dyn Transport>,
    probe: Arc<dyn MediaProbe>,
    reporter: Arc<dyn Reporter>,
}

impl Downloader {
    pub fn new(
        config: DownloadConfig,
        transport: Arc<dyn Transport>,
        probe: Arc<dyn MediaProbe>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            config,
            transport,
            probe,
            reporter,
        }
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }

    pub async fn download(&self, item: &DownloadItem) -> Outcome {
        let paths = ItemPaths::new(&self.config.root, item);
        let target = paths.target.display().to_string();

        if paths.target.exists() {
            self.reporter.success(&format!("merged: {}", target));
            return Outcome::AlreadyComplete {
                target: paths.target,
            };
        }

        let url = match item.manifest_url.parse::<Url>() {
            Ok(url) => url,
            Err(e) => return self.failed(&format!("{} {}", item.manifest_url, e)),
        };

        if let Err(e) = fs::create_dir_all(paths.slots.dir()).await {
            return self.failed(&format!("{} {}", paths.slots.dir().display(), e));
        }

        let title = format!("m3u8: {}", target);
        self.reporter.progress(1, 2, &title);

        let (urls, cipher) = loop {
            match self.prepare(&url).await {
                Ok(x) => break x,
                Err(ManifestError::UnsupportedKey(method)) => {
                    let reason = format!("{} decryption is not supported", method);
                    self.reporter.error(&format!("failed: {} {}", target, reason));
                    return Outcome::Unsupported { reason };
                }
                Err(e) => {
                    self.reporter.warning(&e.to_string());
                    tokio::time::sleep(self.config.manifest_retry_delay).await;
                }
            }
        };

        self.reporter.progress(2, 2, &title);

        let total = urls.len();

        match self.reconcile(&paths.slots, total).await {
            Ok(x) if x == total => (),
            Ok(_) => {
                self.fetch_all(&paths, urls, cipher.map(Arc::new)).await;
            }
            Err(e) => return self.failed(&format!("{} {}", paths.slots.dir().display(), e)),
        }

        self.reporter.progress(0, 1, &format!("merge: {}", target));

        let found = match self.reconcile(&paths.slots, total).await {
            Ok(x) => x,
            Err(e) => return self.failed(&format!("{} {}", paths.slots.dir().display(), e)),
        };

        if found != total {
            self.reporter.progress(
                found as u64,
                total as u64,
                &format!("failed not equals: {} {:05}/{:05}", target, found, total),
            );
            self.reporter.error(&format!(
                "failed not equals: {} {:05}/{:05}",
                target, found, total
            ));
            return Outcome::Incomplete {
                found,
                expected: total,
            };
        }

        let slots = match paths.slots.list() {
            Ok(x) => x,
            Err(e) => return self.failed(&format!("{} {}", paths.slots.dir().display(), e)),
        };

        Merger::new(self.probe.as_ref(), self.reporter.as_ref())
            .merge(&slots, &paths.temp, &paths.target)
            .await
    }

    async fn prepare(
        &self,
        url: &Url,
    ) -> Result<(Vec<Url>, Option<CipherContext>), ManifestError> {
        let manifest =
            resolve(self.transport.as_ref(), url, self.config.max_variant_depth).await?;
        let cipher = get_cipher(self.transport.as_ref(), &manifest).await?;
        Ok((manifest.segment_urls()?, cipher))
    }

    /// Returns the number of slots left on disk.
    ///
    /// More slots than segments means they belong to another version of the
    /// playlist, so all of them are deleted. Must not run while workers are
    /// active.
    async fn reconcile(&self, slots: &SlotDir, total: usize) -> io::Result<usize> {
        let files = slots.list()?;

        if files.len() <= total {
            return Ok(files.len());
        }

        for file in &files {
            stream::remove_if_exists(file).await?;
            self.reporter
                .warning(&format!("{} deleted", file.display()));
        }

        Ok(0)
    }

    async fn fetch_all(
        &self,
        paths: &ItemPaths,
        urls: Vec<Url>,
        cipher: Option<Arc<CipherContext>>,
    ) {
        let label = paths.slots.dir().display().to_string();
        let total = urls.len();
        let worker = Arc::new(Worker::new(
            self.transport.clone(),
            self.reporter.clone(),
            cipher,
            paths.slots.clone(),
            self.config.segment_retries,
            self.config.segment_retry_delay,
        ));

        let mut set = JoinSet::new();
        let max_threads = self.config.threads.max(1);

        for (index, url) in urls.into_iter().enumerate() {
            while set.len() >= max_threads {
                self.joined(set.join_next().await);
            }

            let worker = worker.clone();
            let task = SegmentTask {
                index,
                total,
                url,
                label: label.clone(),
            };

            set.spawn(async move { worker.fetch_segment(&task).await });
        }

        while let Some(res) = set.join_next().await {
            self.joined(Some(res));
        }
    }

    fn joined(&self, res: Option<Result<(), tokio::task::JoinError>>) {
        if let Some(Err(e)) = res {
            self.reporter.error(&format!("segment task aborted: {}", e));
        }
    }

    fn failed(&self, reason: &str) -> Outcome {
        self.reporter.error(&format!("failed: {}", reason));
        Outcome::Failed {
            reason: reason.to_owned(),
        }
    }
}

/// Reassembles an existing slot directory into `target` without fetching.
pub async fn merge_dir(
    probe: &dyn MediaProbe,
    reporter: &dyn Reporter,
    dir: &Path,
    target: &Path,
) -> Outcome {
    let slots = match SlotDir::new(dir).list() {
        Ok(x) => x,
        Err(e) => {
            reporter.error(&format!("failed: {} {}", dir.display(), e));
            return Outcome::Failed {
                reason: e.to_string(),
            };
        }
    };

    Merger::new(probe, reporter)
        .merge(&slots, &crate::merger::temp_path(target), target)
        .await
}
