use crate::error::ManifestError;
use reqwest::Url;

/// A parsed playlist, either a media playlist with segments or a master
/// playlist pointing at renditions.
#[derive(Clone, Debug)]
pub struct Manifest {
    pub url: Url,
    pub media_sequence: u64,
    pub segments: Vec<Segment>,
    pub key: Option<Key>,
    pub variant: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub duration: f32,
    pub uri: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyMethod {
    None,
    Aes128,
    Other(String),
}

impl std::fmt::Display for KeyMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Aes128 => write!(f, "AES-128"),
            Self::Other(x) => write!(f, "{}", x),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Key {
    pub method: KeyMethod,
    pub uri: Option<String>,
    pub iv: Option<String>,
}

impl Key {
    pub fn key(&self, bytes: &[u8]) -> Result<[u8; 16], ManifestError> {
        if bytes.len() != 16 {
            return Err(ManifestError::InvalidKey { len: bytes.len() });
        }

        let mut key = [0_u8; 16];
        key.copy_from_slice(bytes);
        Ok(key)
    }

    /// Declared iv, if the key line carries one.
    pub fn iv(&self) -> Result<Option<[u8; 16]>, ManifestError> {
        let Some(actual_iv) = self.iv.as_ref() else {
            return Ok(None);
        };

        let iv = actual_iv
            .strip_prefix("0x")
            .or_else(|| actual_iv.strip_prefix("0X"))
            .unwrap_or(actual_iv);

        if iv.is_empty() || iv.len() > 32 {
            return Err(ManifestError::InvalidIv(actual_iv.to_owned()));
        }

        u128::from_str_radix(iv, 16)
            .map(|x| Some(x.to_be_bytes()))
            .map_err(|_| ManifestError::InvalidIv(actual_iv.to_owned()))
    }
}

impl Manifest {
    pub fn parse(url: &Url, bytes: &[u8]) -> Result<Self, ManifestError> {
        let text = String::from_utf8_lossy(bytes);
        // Some servers indent every line, which m3u8-rs refuses.
        let text = text
            .lines()
            .map(str::trim)
            .filter(|x| !x.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
            + "\n";

        let playlist =
            m3u8_rs::parse_playlist_res(text.as_bytes()).map_err(|_| ManifestError::Parse {
                url: url.to_string(),
                message: "invalid m3u8 syntax".to_owned(),
            })?;

        Ok(match playlist {
            m3u8_rs::Playlist::MasterPlaylist(m3u8) => Self {
                url: url.to_owned(),
                media_sequence: 0,
                segments: vec![],
                key: None,
                // I-frame streams carry keyframes only.
                variant: m3u8
                    .variants
                    .iter()
                    .find(|x| !x.is_i_frame)
                    .map(|x| x.uri.to_owned()),
            },
            m3u8_rs::Playlist::MediaPlaylist(m3u8) => Self {
                url: url.to_owned(),
                media_sequence: m3u8.media_sequence,
                key: m3u8
                    .segments
                    .iter()
                    .find_map(|x| x.key.as_ref())
                    .map(|x| Key {
                        method: match &x.method {
                            m3u8_rs::KeyMethod::None => KeyMethod::None,
                            m3u8_rs::KeyMethod::AES128 => KeyMethod::Aes128,
                            m3u8_rs::KeyMethod::SampleAES => {
                                KeyMethod::Other("SAMPLE-AES".to_owned())
                            }
                            m3u8_rs::KeyMethod::Other(x) => KeyMethod::Other(x.to_owned()),
                        },
                        uri: x.uri.clone(),
                        iv: x.iv.clone(),
                    }),
                segments: m3u8
                    .segments
                    .iter()
                    .map(|x| Segment {
                        duration: x.duration,
                        uri: x.uri.to_owned(),
                    })
                    .collect(),
                variant: None,
            },
        })
    }

    /// Resolves a uri found inside this manifest against the manifest's own url.
    pub fn join(&self, uri: &str) -> Result<Url, ManifestError> {
        Ok(self.url.join(uri)?)
    }

    pub fn segment_urls(&self) -> Result<Vec<Url>, ManifestError> {
        self.segments.iter().map(|x| self.join(&x.uri)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        s.parse().unwrap()
    }

    #[test]
    fn media_playlist() {
        let text = b"#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:8
#EXT-X-MEDIA-SEQUENCE:4
#EXTINF:5.880867,
d5f7e4b581e000000.ts
#EXTINF:4.0,
d5f7e4b581e000001.ts
#EXT-X-ENDLIST
";
        let manifest =
            Manifest::parse(&url("https://a.com/x/index.m3u8"), text).unwrap();

        assert_eq!(manifest.segments.len(), 2);
        assert_eq!(manifest.media_sequence, 4);
        assert!(manifest.key.is_none());
        assert!(manifest.variant.is_none());
        assert_eq!(
            manifest.segment_urls().unwrap()[1].as_str(),
            "https://a.com/x/d5f7e4b581e000001.ts"
        );
    }

    #[test]
    fn master_playlist_takes_first_variant() {
        let text = b"#EXTM3U
#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=800000,RESOLUTION=1080x608
1000k/hls/mixed.m3u8
#EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=400000,RESOLUTION=720x404
500k/hls/mixed.m3u8
";
        let manifest =
            Manifest::parse(&url("https://a.com/20221231/index.m3u8"), text).unwrap();

        assert!(manifest.segments.is_empty());
        assert_eq!(manifest.variant.as_deref(), Some("1000k/hls/mixed.m3u8"));
    }

    #[test]
    fn master_playlist_skips_i_frame_streams() {
        let text = b"#EXTM3U
#EXT-X-I-FRAME-STREAM-INF:BANDWIDTH=86000,URI=\"iframe/index.m3u8\"
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=1080x608
1000k/index.m3u8
";
        let manifest = Manifest::parse(&url("https://a.com/x/index.m3u8"), text).unwrap();

        assert_eq!(manifest.variant.as_deref(), Some("1000k/index.m3u8"));
    }

    #[test]
    fn indented_playlist_with_key() {
        let text = b" #EXTM3U
            #EXT-X-VERSION:3
            #EXT-X-TARGETDURATION:7
            #EXT-X-MEDIA-SEQUENCE:0
            #EXT-X-KEY:METHOD=AES-128,URI=\"/20221207/hls/key.key\",IV=0x000102030405060708090a0b0c0d0e0f
            #EXTINF:4.128,
            /20221207/hls/1N6S6O1u.ts
            #EXTINF:3.127,
            /20221207/hls/Q0HXvpgA.ts
            ";
        let manifest =
            Manifest::parse(&url("https://new.a.vip/20221207/x/hls/index.m3u8"), text).unwrap();
        let key = manifest.key.clone().unwrap();

        assert_eq!(manifest.segments.len(), 2);
        assert_eq!(key.method, KeyMethod::Aes128);
        assert_eq!(
            manifest.join(key.uri.as_deref().unwrap()).unwrap().as_str(),
            "https://new.a.vip/20221207/hls/key.key"
        );
        assert_eq!(
            key.iv().unwrap(),
            Some([0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15])
        );
    }

    #[test]
    fn iv_and_key_validation() {
        let key = Key {
            method: KeyMethod::Aes128,
            uri: None,
            iv: Some("0xZZ".to_owned()),
        };

        assert!(key.iv().is_err());
        assert!(matches!(
            key.key(&[0; 15]),
            Err(ManifestError::InvalidKey { len: 15 })
        ));
        assert!(key.key(&[7; 16]).is_ok());
    }

    #[test]
    fn absolute_variant_is_not_rewritten() {
        let base = Manifest {
            url: url("https://a.com/p/q/index.m3u8"),
            media_sequence: 0,
            segments: vec![],
            key: None,
            variant: None,
        };

        assert_eq!(
            base.join("https://cdn.b.com/v/index.m3u8").unwrap().as_str(),
            "https://cdn.b.com/v/index.m3u8"
        );
        assert_eq!(
            base.join("/p/q/hd/index.m3u8").unwrap().as_str(),
            "https://a.com/p/q/hd/index.m3u8"
        );
    }
}
