use thiserror::Error;

/// Failure of a single HTTP exchange.
///
/// Timeouts, connection failures and non-2xx statuses all land here and are
/// retried the same way by callers.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{url} (HTTP {status})")]
    Status { url: String, status: u16 },

    #[error("{url} ({source})")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned an unreadable {header} header")]
    BadHeader { url: String, header: &'static str },

    #[error("{0}")]
    Other(String),
}

/// Failure while turning a manifest url into a usable segment list.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("could not parse playlist {url}: {message}")]
    Parse { url: String, message: String },

    #[error("playlist {url} has neither segments nor variant streams")]
    NoVariant { url: String },

    #[error("playlist {url} is nested more than {depth} levels deep")]
    TooDeep { url: String, depth: usize },

    #[error("{0} decryption is not supported")]
    UnsupportedKey(String),

    #[error("encryption key for {0} has no uri")]
    MissingKeyUri(String),

    #[error("invalid key size ({len} bytes, expected 16)")]
    InvalidKey { len: usize },

    #[error("invalid iv {0}")]
    InvalidIv(String),

    #[error(transparent)]
    BadUrl(#[from] url::ParseError),
}

/// Failure of one download attempt of one segment.
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("decryption failed: {0}")]
    Decrypt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure while concatenating slots into the output artifact.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("no segment files to merge")]
    Empty,

    #[error("media probe failed for {path}: {message}")]
    Probe { path: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure while turning a catalog page into download items.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("no m3u8 link found in {url}")]
    NoManifest { url: String },

    #[error(transparent)]
    BadUrl(#[from] url::ParseError),
}
