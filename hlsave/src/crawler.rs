use crate::{client::Transport, error::CrawlError};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt::Display, sync::Arc, sync::LazyLock};

static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\s([^>]*)>(.*?)</a>").unwrap());
static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).unwrap());
static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)class\s*=\s*["']([^"']*)["']"#).unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static TAG_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)(\w+)[^>]*>").unwrap());
static CLASSED_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<(\w+)\s[^>]*?class\s*=\s*["']([^"']*)["'][^>]*>"#).unwrap()
});
static EPISODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"第([\w.]+)集").unwrap());
static M3U8_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""https:[^"]+?\.m3u8""#).unwrap());

/// One episode to download.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadItem {
    pub name: String,
    pub episode: EpisodeLabel,
    #[serde(default)]
    pub page_url: String,
    pub manifest_url: String,
}

/// Episode identifier as shown by the catalog, e.g. `12`, `HD` or `OVA02`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawLabel", into = "RawLabel")]
pub enum EpisodeLabel {
    Number(u32),
    Text(String),
}

impl EpisodeLabel {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(x) = s.parse::<u32>() {
                return Self::Number(x);
            }
        }

        Self::Text(s.to_owned())
    }

    /// Name used for the slot directory and the output file.
    pub fn key(&self) -> String {
        match self {
            Self::Number(x) => format!("{:03}", x),
            Self::Text(x) => x.to_owned(),
        }
    }

    pub fn number(&self) -> Option<u32> {
        match self {
            Self::Number(x) => Some(*x),
            Self::Text(_) => None,
        }
    }
}

impl Display for EpisodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawLabel {
    Number(u64),
    Text(String),
}

impl From<RawLabel> for EpisodeLabel {
    fn from(value: RawLabel) -> Self {
        match value {
            RawLabel::Number(x) => match u32::try_from(x) {
                Ok(x) => Self::Number(x),
                Err(_) => Self::Text(x.to_string()),
            },
            RawLabel::Text(x) => Self::parse(&x),
        }
    }
}

impl From<EpisodeLabel> for RawLabel {
    fn from(value: EpisodeLabel) -> Self {
        match value {
            EpisodeLabel::Number(x) => Self::Number(x as u64),
            EpisodeLabel::Text(x) => Self::Text(x),
        }
    }
}

/// Inclusive bounds on numeric episodes. Non-numeric episodes always pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct EpisodeRange {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

impl EpisodeRange {
    pub fn allows(&self, episode: &EpisodeLabel) -> bool {
        let Some(x) = episode.number() else {
            return true;
        };

        self.start.is_none_or(|start| start <= x) && self.end.is_none_or(|end| x <= end)
    }
}

/// Lists the episodes reachable from a catalog page.
#[async_trait]
pub trait Crawler: Send + Sync {
    async fn pages(
        &self,
        name: &str,
        url: &Url,
        range: EpisodeRange,
    ) -> Result<Vec<DownloadItem>, CrawlError>;
}

/// Picks a crawler from the page's host name.
pub fn crawler_for(url: &Url, transport: Arc<dyn Transport>) -> Box<dyn Crawler> {
    match url.host_str() {
        Some(host) if host.contains("gimy") => Box::new(PlayListCrawler::gimy(transport)),
        _ => Box::new(PlayListCrawler::bowang(transport)),
    }
}

/// Crawler for play pages listing their sibling episodes as links of the form
/// `<prefix>-<n>.html`, where `<prefix>` comes from the page's own path.
pub struct PlayListCrawler {
    transport: Arc<dyn Transport>,
    link_class: Option<&'static str>,
    /// Only links inside the `playlist` element carrying this class are used.
    active_list: Option<&'static str>,
}

impl PlayListCrawler {
    pub fn bowang(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            link_class: Some("module-play-list-link"),
            active_list: None,
        }
    }

    pub fn gimy(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            link_class: None,
            active_list: Some("activeplayer"),
        }
    }

    async fn text(&self, url: &Url) -> Result<String, CrawlError> {
        let bytes = self.transport.fetch(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait]
impl Crawler for PlayListCrawler {
    async fn pages(
        &self,
        name: &str,
        url: &Url,
        range: EpisodeRange,
    ) -> Result<Vec<DownloadItem>, CrawlError> {
        let html = self.text(url).await?;
        let prefix = path_prefix(url.path());
        let listing = match self.active_list {
            Some(marker) => playlist_block(&html, marker).unwrap_or(html.as_str()),
            None => html.as_str(),
        };
        let mut items = vec![];

        for (href, title) in episode_links(listing, prefix, self.link_class) {
            let episode = episode_label(&title);

            if !range.allows(&episode) {
                continue;
            }

            let page_url = url.join(&href)?;
            let manifest_url = find_manifest(&self.text(&page_url).await?).ok_or_else(|| {
                CrawlError::NoManifest {
                    url: page_url.to_string(),
                }
            })?;

            items.push(DownloadItem {
                name: name.to_owned(),
                episode,
                page_url: page_url.to_string(),
                manifest_url,
            });
        }

        Ok(items)
    }
}

/// `/play/103058-5-1.html` -> `/play/103058-5`
fn path_prefix(path: &str) -> &str {
    path.rfind('-').map(|x| &path[..x]).unwrap_or(path)
}

fn episode_links(html: &str, prefix: &str, link_class: Option<&str>) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    let mut links = vec![];

    for caps in ANCHOR_RE.captures_iter(html) {
        let attrs = &caps[1];
        let Some(href) = HREF_RE.captures(attrs).map(|x| x[1].to_owned()) else {
            continue;
        };

        let href_path = href
            .parse::<Url>()
            .map(|x| x.path().to_owned())
            .unwrap_or_else(|_| href.clone());

        if !href_path.starts_with(prefix) {
            continue;
        }

        if let Some(link_class) = link_class {
            let has_class = CLASS_RE
                .captures(attrs)
                .is_some_and(|x| x[1].split_whitespace().any(|c| c == link_class));

            if !has_class {
                continue;
            }
        }

        if seen.insert(href.clone()) {
            links.push((href, TAG_RE.replace_all(&caps[2], "").trim().to_owned()));
        }
    }

    links
}

/// Inner html of the first element with class `playlist` and a class
/// containing `marker`.
fn playlist_block<'a>(html: &'a str, marker: &str) -> Option<&'a str> {
    let open = CLASSED_TAG_RE.captures_iter(html).find(|caps| {
        let mut classes = caps[2].split_whitespace();
        classes.clone().any(|c| c == "playlist") && classes.any(|c| c.contains(marker))
    })?;
    let name = &open[1];
    let start = open.get(0)?.end();
    let mut depth = 1;

    for tag in TAG_NAME_RE.captures_iter(&html[start..]) {
        if !tag[2].eq_ignore_ascii_case(name) {
            continue;
        }

        if tag[1].is_empty() {
            depth += 1;
        } else {
            depth -= 1;
        }

        if depth == 0 {
            return Some(&html[start..start + tag.get(0)?.start()]);
        }
    }

    Some(&html[start..])
}

/// `第12集` -> `12`, anything else is used as is.
fn episode_label(title: &str) -> EpisodeLabel {
    match EPISODE_RE.captures(title) {
        Some(caps) => EpisodeLabel::parse(&caps[1]),
        None => EpisodeLabel::parse(title),
    }
}

/// First quoted `https:...m3u8` string of a page, JSON unescaped.
fn find_manifest(html: &str) -> Option<String> {
    M3U8_RE
        .find(html)
        .and_then(|x| serde_json::from_str::<String>(x.as_str()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAY_PAGE: &str = r#"
<div class="play-tab-list active">
  <a class="module-play-list-link" href="/play/103058-5-1.html"><span>第01集</span></a>
  <a class="module-play-list-link" href="/play/103058-5-2.html"><span>第02集</span></a>
  <a class="module-play-list-link" href="/play/103058-5-3.html">OVA</a>
  <a href="/play/103058-5-9.html">not in the list</a>
</div>
<div class="play-tab-list">
  <a class="module-play-list-link" href="/play/103058-6-1.html">第01集</a>
</div>
<script>var player_aaaa={"url":"https:\/\/vip.ffzy-online2.com\/20221231\/3982_a82a6172\/index.m3u8"}</script>
"#;

    #[test]
    fn labels() {
        assert_eq!(EpisodeLabel::parse("7").key(), "007");
        assert_eq!(EpisodeLabel::parse("0123").key(), "123");
        assert_eq!(EpisodeLabel::parse("HD").key(), "HD");
        assert_eq!(episode_label("第12集"), EpisodeLabel::Number(12));
        assert_eq!(episode_label(" OVA02 "), EpisodeLabel::Text("OVA02".to_owned()));
    }

    #[test]
    fn label_json() {
        let items = serde_json::from_str::<Vec<EpisodeLabel>>(r#"[3, "04", "HD"]"#).unwrap();
        assert_eq!(
            items,
            vec![
                EpisodeLabel::Number(3),
                EpisodeLabel::Number(4),
                EpisodeLabel::Text("HD".to_owned())
            ]
        );
        assert_eq!(serde_json::to_string(&items[0]).unwrap(), "3");
    }

    #[test]
    fn range() {
        let range = EpisodeRange {
            start: Some(2),
            end: Some(3),
        };

        assert!(!range.allows(&EpisodeLabel::Number(1)));
        assert!(range.allows(&EpisodeLabel::Number(3)));
        assert!(range.allows(&EpisodeLabel::Text("HD".to_owned())));
    }

    #[test]
    fn bowang_links() {
        let links = episode_links(PLAY_PAGE, "/play/103058-5", Some("module-play-list-link"));

        assert_eq!(
            links,
            vec![
                ("/play/103058-5-1.html".to_owned(), "第01集".to_owned()),
                ("/play/103058-5-2.html".to_owned(), "第02集".to_owned()),
                ("/play/103058-5-3.html".to_owned(), "OVA".to_owned()),
            ]
        );
    }

    #[test]
    fn gimy_links() {
        let html = r#"
<a class="next" href="/eps/248-1-2.html">下一集</a>
<div class="playlist-wrap">
  <ul class="playlist clearfix activeplayer">
    <li><a href="/eps/248-1-1.html">第01集</a></li>
    <li><a href="/eps/248-1-2.html">第02集</a></li>
  </ul>
  <ul class="playlist clearfix">
    <li><a href="/eps/248-1-9.html">第09集</a></li>
  </ul>
</div>
"#;
        let listing = playlist_block(html, "activeplayer").unwrap();
        let links = episode_links(listing, path_prefix("/eps/248-1-1.html"), None);

        assert_eq!(
            links,
            vec![
                ("/eps/248-1-1.html".to_owned(), "第01集".to_owned()),
                ("/eps/248-1-2.html".to_owned(), "第02集".to_owned()),
            ]
        );
        assert_eq!(playlist_block(PLAY_PAGE, "activeplayer"), None);
    }

    #[test]
    fn manifest_link() {
        assert_eq!(
            find_manifest(PLAY_PAGE).as_deref(),
            Some("https://vip.ffzy-online2.com/20221231/3982_a82a6172/index.m3u8")
        );
        assert_eq!(find_manifest("<html></html>"), None);
    }
}
