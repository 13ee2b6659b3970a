use crate::{client::Transport, error::ManifestError, playlist::Manifest};
use log::debug;
use reqwest::Url;

/// Fetches `url` and follows the first variant of every master playlist until
/// a playlist with segments is reached.
pub async fn resolve(
    transport: &dyn Transport,
    url: &Url,
    max_depth: usize,
) -> Result<Manifest, ManifestError> {
    let mut url = url.to_owned();

    for _ in 0..=max_depth {
        let bytes = transport.fetch(&url).await?;
        let manifest = Manifest::parse(&url, &bytes)?;

        if !manifest.segments.is_empty() {
            return Ok(manifest);
        }

        let variant = manifest
            .variant
            .as_ref()
            .ok_or_else(|| ManifestError::NoVariant {
                url: url.to_string(),
            })?;
        let next = manifest.join(variant)?;
        debug!("Following variant playlist {}", next);
        url = next;
    }

    Err(ManifestError::TooDeep {
        url: url.to_string(),
        depth: max_depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{client::Head, error::TransportError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves the same playlist for every url.
    struct Static {
        body: &'static str,
        fetches: AtomicUsize,
    }

    impl Static {
        fn new(body: &'static str) -> Self {
            Self {
                body,
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transport for Static {
        async fn fetch(&self, _url: &Url) -> Result<Vec<u8>, TransportError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.as_bytes().to_vec())
        }

        async fn probe(&self, _url: &Url) -> Result<Head, TransportError> {
            Ok(Head {
                content_length: Some(self.body.len() as u64),
            })
        }
    }

    #[tokio::test]
    async fn self_referencing_master_stops_at_depth() {
        let transport = Static::new(
            "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000
index.m3u8
",
        );
        let url = "https://a.com/x/index.m3u8".parse().unwrap();

        let result = resolve(&transport, &url, 3).await;

        assert!(matches!(result, Err(ManifestError::TooDeep { depth: 3, .. })));
        assert_eq!(transport.fetches.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn empty_media_playlist_has_no_variant() {
        let transport = Static::new(
            "#EXTM3U
#EXT-X-TARGETDURATION:8
#EXT-X-ENDLIST
",
        );
        let url = "https://a.com/x/index.m3u8".parse().unwrap();

        let result = resolve(&transport, &url, 10).await;

        assert!(matches!(result, Err(ManifestError::NoVariant { .. })));
        assert_eq!(transport.fetches.load(Ordering::SeqCst), 1);
    }
}
