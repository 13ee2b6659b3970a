use crate::error::TransportError;
use async_trait::async_trait;
use reqwest::{
    Client, Proxy, Url,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/113.0.0.0 Safari/537.36";

/// Request settings shared by every call made through a [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub proxy: Option<String>,
    pub danger_accept_invalid_certs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: Vec::new(),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            proxy: None,
            danger_accept_invalid_certs: false,
        }
    }
}

/// Answer to a HEAD request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Head {
    pub content_length: Option<u64>,
}

/// The only way the engine talks to the network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and return the whole body.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, TransportError>;

    /// HEAD `url`.
    async fn probe(&self, url: &Url) -> Result<Head, TransportError>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, anyhow::Error> {
        let mut client_builder = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .danger_accept_invalid_certs(config.danger_accept_invalid_certs);

        if !config.headers.is_empty() {
            let mut headers = HeaderMap::new();

            for (key, value) in &config.headers {
                headers.insert(key.parse::<HeaderName>()?, value.parse::<HeaderValue>()?);
            }

            client_builder = client_builder.default_headers(headers);
        }

        if let Some(proxy) = &config.proxy {
            client_builder = client_builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self {
            client: client_builder.build()?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| request_error(url, e))?;
        check_status(url, response.status())?;

        let bytes = response.bytes().await.map_err(|e| request_error(url, e))?;
        Ok(bytes.to_vec())
    }

    async fn probe(&self, url: &Url) -> Result<Head, TransportError> {
        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(|e| request_error(url, e))?;
        check_status(url, response.status())?;

        // hyper reports an empty body for HEAD, so read the header itself.
        let content_length = match response.headers().get(header::CONTENT_LENGTH) {
            Some(value) => Some(
                value
                    .to_str()
                    .ok()
                    .and_then(|x| x.trim().parse::<u64>().ok())
                    .ok_or_else(|| TransportError::BadHeader {
                        url: url.to_string(),
                        header: "Content-Length",
                    })?,
            ),
            None => None,
        };

        Ok(Head { content_length })
    }
}

fn check_status(url: &Url, status: reqwest::StatusCode) -> Result<(), TransportError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(TransportError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

fn request_error(url: &Url, error: reqwest::Error) -> TransportError {
    TransportError::Request {
        url: url.to_string(),
        source: error,
    }
}
