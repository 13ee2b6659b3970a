use crate::{
    client::Transport,
    downloader::{encryption::CipherContext, slots::SlotDir},
    error::SegmentError,
    report::Reporter,
};
use reqwest::Url;
use std::{io, path::Path, sync::Arc, time::Duration};
use tokio::fs;

/// One segment to place into its slot.
pub struct SegmentTask {
    pub index: usize,
    pub total: usize,
    pub url: Url,
    /// Display name of the item, e.g. `video/DB/001`.
    pub label: String,
}

/// Downloads segments into a slot directory, retrying each one on its own.
pub struct Worker {
    transport: Arc<dyn Transport>,
    reporter: Arc<dyn Reporter>,
    cipher: Option<Arc<CipherContext>>,
    slots: SlotDir,
    retries: usize,
    retry_delay: Duration,
}

impl Worker {
    pub fn new(
        transport: Arc<dyn Transport>,
        reporter: Arc<dyn Reporter>,
        cipher: Option<Arc<CipherContext>>,
        slots: SlotDir,
        retries: usize,
        retry_delay: Duration,
    ) -> Self {
        Self {
            transport,
            reporter,
            cipher,
            slots,
            retries,
            retry_delay,
        }
    }

    /// Fills the slot of `task`, or leaves it absent once retries run out.
    ///
    /// Never fails: a segment that cannot be fetched only shows up later as a
    /// missing slot.
    pub async fn fetch_segment(&self, task: &SegmentTask) {
        let mut tries = 0;

        loop {
            let error = match self.attempt(task).await {
                Ok(()) => return,
                Err(e) => e,
            };

            self.discard(task.index).await;

            if tries >= self.retries {
                self.reporter.error(&format!(
                    "failed: {}.mp4 {:05}/{:05}: {}",
                    task.label, task.index, task.total, error
                ));
                return;
            }

            tries += 1;
            self.reporter.warning(&format!(
                "retry: {}.mp4 {:05}/{:05}: {}",
                task.label, task.index, task.total, error
            ));
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    async fn attempt(&self, task: &SegmentTask) -> Result<(), SegmentError> {
        let title = format!(
            "download: {}.mp4 {:05}/{:05}",
            task.label, task.index, task.total
        );
        let path = self.slots.path(task.index);
        let head = self.transport.probe(&task.url).await?;

        if let Some(expected) = head.content_length {
            if let Ok(metadata) = fs::metadata(&path).await {
                if self.is_complete(metadata.len(), expected) {
                    self.reporter.progress(expected, expected, &title);
                    return Ok(());
                }
            }
        }

        let body = self.transport.fetch(&task.url).await?;
        let fetched = body.len() as u64;
        let body = match &self.cipher {
            Some(cipher) => cipher.decrypt(task.index, body)?,
            None => body,
        };

        // Readers only ever see complete slots.
        let part = self.slots.part_path(task.index);
        fs::write(&part, &body).await?;
        fs::rename(&part, &path).await?;

        self.reporter
            .progress(fetched, head.content_length.unwrap_or(fetched), &title);
        Ok(())
    }

    /// Whether an existing slot of `slot_len` bytes holds the segment whose
    /// server size is `expected`.
    ///
    /// Only sizes are compared, so a corrupted slot of the right length passes.
    fn is_complete(&self, slot_len: u64, expected: u64) -> bool {
        if self.cipher.is_none() {
            return slot_len == expected;
        }

        // PKCS7 removes between 1 and 16 bytes from a whole number of blocks.
        expected >= 16 && expected % 16 == 0 && slot_len < expected && slot_len + 16 >= expected
    }

    async fn discard(&self, index: usize) {
        for path in [self.slots.path(index), self.slots.part_path(index)] {
            if let Err(e) = remove_if_exists(&path).await {
                self.reporter
                    .warning(&format!("could not delete {}: {}", path.display(), e));
            }
        }
    }
}

pub(crate) async fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::Head,
        downloader::encryption::IvSource,
        error::TransportError,
        report::Level,
    };
    use async_trait::async_trait;

    struct NoNetwork;

    #[async_trait]
    impl Transport for NoNetwork {
        async fn fetch(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
            Err(TransportError::Other(format!("{} unreachable", url)))
        }

        async fn probe(&self, url: &Url) -> Result<Head, TransportError> {
            Err(TransportError::Other(format!("{} unreachable", url)))
        }
    }

    struct Silent;

    impl Reporter for Silent {
        fn report(&self, _level: Level, _message: &str) {}
        fn progress(&self, _current: u64, _total: u64, _title: &str) {}
    }

    fn worker(cipher: Option<CipherContext>, slots: SlotDir) -> Worker {
        Worker::new(
            Arc::new(NoNetwork),
            Arc::new(Silent),
            cipher.map(Arc::new),
            slots,
            0,
            Duration::ZERO,
        )
    }

    #[test]
    fn plain_slot_must_match_exactly() {
        let worker = worker(None, SlotDir::new("unused"));

        assert!(worker.is_complete(188, 188));
        assert!(!worker.is_complete(187, 188));
    }

    #[test]
    fn encrypted_slot_accepts_stripped_padding() {
        let worker = worker(
            Some(CipherContext::new([0; 16], IvSource::Fixed([0; 16]))),
            SlotDir::new("unused"),
        );

        assert!(worker.is_complete(5, 16));
        assert!(worker.is_complete(31, 32));
        assert!(worker.is_complete(16, 32));
        assert!(!worker.is_complete(32, 32));
        assert!(!worker.is_complete(15, 32));
        assert!(!worker.is_complete(20, 33));
    }

    #[tokio::test]
    async fn failed_segment_leaves_no_slot() {
        let dir = tempfile::tempdir().unwrap();
        let slots = SlotDir::new(dir.path());
        std::fs::write(slots.path(3), b"truncated").unwrap();
        std::fs::write(slots.part_path(3), b"trunc").unwrap();

        let worker = worker(None, slots.clone());
        worker
            .fetch_segment(&SegmentTask {
                index: 3,
                total: 4,
                url: "https://a.com/3.ts".parse().unwrap(),
                label: "video/x/001".to_owned(),
            })
            .await;

        assert!(!slots.path(3).exists());
        assert!(!slots.part_path(3).exists());
    }
}
