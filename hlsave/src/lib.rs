//! Resumable HLS downloader.
//!
//! A [`Downloader`] resolves a playlist (following master playlists to their
//! first variant), fetches every segment into its own numbered slot file with
//! bounded parallelism, decrypts AES-128 segments, and concatenates the slots
//! into one file once all of them are present. Progress lives entirely on
//! disk, so an interrupted download is continued by calling
//! [`Downloader::download`] again.

pub mod client;
pub mod crawler;
pub mod downloader;
pub mod error;
pub mod logger;
pub mod merger;
pub mod playlist;
pub mod probe;
pub mod progress;
pub mod report;
mod utils;

pub use client::{ClientConfig, Head, HttpTransport, Transport};
pub use crawler::{Crawler, DownloadItem, EpisodeLabel, EpisodeRange, crawler_for};
pub use downloader::{DownloadConfig, Downloader, Outcome};
pub use probe::{FfprobeProbe, MediaInfo, MediaProbe, NoopProbe, StreamDims};
pub use report::{Level, LogReporter, Reporter};
pub use reqwest;
pub use utils::looks_like_ts;
