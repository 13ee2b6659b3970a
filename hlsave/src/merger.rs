use crate::{
    downloader::{Outcome, stream::remove_if_exists},
    error::MergeError,
    probe::MediaProbe,
    report::Reporter,
};
use std::path::{Path, PathBuf};
use tokio::{
    fs::{self, File, OpenOptions},
    io::{self, AsyncWriteExt},
};

/// Concatenates slot files into a single artifact.
///
/// Slots whose stream dimensions differ from the first slot are treated as
/// spliced-in foreign content and left out.
pub struct Merger<'a> {
    probe: &'a dyn MediaProbe,
    reporter: &'a dyn Reporter,
}

impl<'a> Merger<'a> {
    pub fn new(probe: &'a dyn MediaProbe, reporter: &'a dyn Reporter) -> Self {
        Self { probe, reporter }
    }

    /// Writes `slots` in order into `temp`, then renames it to `target`.
    ///
    /// Failures are reported and returned as [`Outcome::MergeFailed`], `target`
    /// is only created on success.
    pub async fn merge(&self, slots: &[PathBuf], temp: &Path, target: &Path) -> Outcome {
        match self.try_merge(slots, temp, target).await {
            Ok((merged, skipped)) => {
                self.reporter.success(&format!(
                    "merged: {} {:05}/{:05}",
                    target.display(),
                    merged + skipped,
                    slots.len()
                ));

                Outcome::Merged {
                    target: target.to_owned(),
                    merged,
                    skipped,
                }
            }
            Err(e) => {
                self.reporter
                    .error(&format!("failed: {} {}", target.display(), e));

                Outcome::MergeFailed {
                    target: target.to_owned(),
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_merge(
        &self,
        slots: &[PathBuf],
        temp: &Path,
        target: &Path,
    ) -> Result<(usize, usize), MergeError> {
        let first = slots.first().ok_or(MergeError::Empty)?;
        let base = self.probe.probe(first).await?;
        let total = slots.len();

        remove_if_exists(temp).await?;

        let mut output = OpenOptions::new()
            .create(true)
            .append(true)
            .open(temp)
            .await?;
        let mut merged = 0;
        let mut skipped = 0;

        for (i, slot) in slots.iter().enumerate() {
            if !base.same_profile(&self.probe.probe(slot).await?) {
                self.reporter.debug(&format!("adv: {}", slot.display()));
                skipped += 1;
                continue;
            }

            io::copy(&mut File::open(slot).await?, &mut output).await?;
            merged += 1;
            self.reporter.progress(
                (i + 1) as u64,
                total as u64,
                &format!("merging: {} {:05}/{:05}", target.display(), i + 1, total),
            );
        }

        output.flush().await?;
        output.sync_all().await?;
        drop(output);

        fs::rename(temp, target).await?;
        Ok((merged, skipped))
    }
}

/// `out/001.mp4` -> `out/001.tmp.mp4`
pub fn temp_path(target: &Path) -> PathBuf {
    match target.extension() {
        Some(ext) => target.with_extension(format!("tmp.{}", ext.to_string_lossy())),
        None => target.with_extension("tmp"),
    }
}

#[cfg(test)]
mod tests {
    use super::temp_path;
    use std::path::Path;

    #[test]
    fn temp_next_to_target() {
        assert_eq!(temp_path(Path::new("v/DB/001.mp4")), Path::new("v/DB/001.tmp.mp4"));
        assert_eq!(temp_path(Path::new("out")), Path::new("out.tmp"));
    }
}
