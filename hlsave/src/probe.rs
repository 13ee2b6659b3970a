use crate::{error::MergeError, utils};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct StreamDims {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Decoded media properties of one file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct MediaInfo {
    #[serde(default)]
    pub streams: Vec<StreamDims>,
}

impl MediaInfo {
    pub fn new(streams: Vec<StreamDims>) -> Self {
        Self { streams }
    }

    /// A single video stream of `width` x `height`.
    pub fn video(width: u32, height: u32) -> Self {
        Self::new(vec![StreamDims {
            width: Some(width),
            height: Some(height),
        }])
    }

    /// Same number of streams with the same dimensions, position by position.
    pub fn same_profile(&self, other: &MediaInfo) -> bool {
        self.streams.len() == other.streams.len()
            && self
                .streams
                .iter()
                .zip(&other.streams)
                .all(|(x, y)| x.width == y.width && x.height == y.height)
    }
}

#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, MergeError>;
}

/// Reads stream dimensions with `ffprobe`.
pub struct FfprobeProbe {
    bin: PathBuf,
}

impl FfprobeProbe {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    /// Looks for `ffprobe` in the working directory and on PATH.
    pub fn find() -> Option<Self> {
        utils::find_binary("ffprobe").map(Self::new)
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> Result<MediaInfo, MergeError> {
        let probe_error = |message: String| MergeError::Probe {
            path: path.to_string_lossy().into(),
            message,
        };

        let output = Command::new(&self.bin)
            .args([
                "-v",
                "error",
                "-show_entries",
                "stream=width,height",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(probe_error(format!(
                "ffprobe exited with code {}: {}",
                output.status.code().unwrap_or(1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        serde_json::from_slice::<MediaInfo>(&output.stdout).map_err(|x| probe_error(x.to_string()))
    }
}

/// Reports the same empty profile for every file, so nothing is filtered.
pub struct NoopProbe;

#[async_trait]
impl MediaProbe for NoopProbe {
    async fn probe(&self, _path: &Path) -> Result<MediaInfo, MergeError> {
        Ok(MediaInfo::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ffprobe_json() {
        let info = serde_json::from_str::<MediaInfo>(
            r#"{"programs": [], "streams": [{"width": 1920, "height": 1080}, {}]}"#,
        )
        .unwrap();

        assert_eq!(info.streams.len(), 2);
        assert_eq!(info.streams[0].width, Some(1920));
        assert_eq!(info.streams[1], StreamDims::default());
    }

    #[test]
    fn profiles() {
        let base = MediaInfo::video(1920, 1080);

        assert!(base.same_profile(&MediaInfo::video(1920, 1080)));
        assert!(!base.same_profile(&MediaInfo::video(1280, 720)));
        assert!(!base.same_profile(&MediaInfo::default()));

        let mut extra = MediaInfo::video(1920, 1080);
        extra.streams.push(StreamDims::default());
        assert!(!base.same_profile(&extra));
    }
}
