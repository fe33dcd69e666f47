use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use reqwest::{redirect, Client, Response, Url};
use scout_logging::scout_trace;

use crate::{FailureKind, FetchError, FetchMetadata, FetchOutput};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Redirect hops followed before giving up.
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Sent with every request. Listing sites tend to refuse anonymous clients.
    pub headers: Vec<(String, String)>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 8 * 1024 * 1024,
            headers: vec![
                (
                    "User-Agent".to_string(),
                    "Mozilla/5.0 (compatible; CarScout/0.1)".to_string(),
                ),
                ("Accept".to_string(), "text/html,application/xhtml+xml".to_string()),
                ("Accept-Language".to_string(), "de-DE,de;q=0.9,en;q=0.8".to_string()),
            ],
        }
    }
}

/// Retrieves one listing page.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError>;
}

/// HTTP fetcher sharing one connection pool across all polls.
///
/// Redirects are followed by hand so every fetch knows its own hop count.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .default_headers(header_map(&settings.headers)?)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Sends GETs until a non-redirect answer arrives.
    async fn follow(&self, start: Url) -> Result<(Response, usize), FetchError> {
        let mut current = start;
        let mut hops = 0;
        loop {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(classify)?;
            let Some(next) = redirect_target(&current, &response) else {
                return Ok((response, hops));
            };
            hops += 1;
            if hops > self.settings.redirect_limit {
                return Err(FetchError::new(
                    FailureKind::RedirectLimitExceeded,
                    format!("gave up at {next} after {} redirects", self.settings.redirect_limit),
                ));
            }
            scout_trace!("{} redirects to {}", current, next);
            current = next;
        }
    }

    /// Collects the body, refusing anything above `max_bytes`.
    async fn read_capped(&self, response: Response) -> Result<Vec<u8>, FetchError> {
        let max_bytes = self.settings.max_bytes;
        let too_large = |actual: u64| {
            FetchError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: Some(actual),
                },
                format!("{actual} bytes"),
            )
        };

        let announced = response.content_length();
        if let Some(len) = announced.filter(|len| *len > max_bytes) {
            return Err(too_large(len));
        }

        // Chunked bodies carry no length, so the cap also applies while streaming.
        let mut body = Vec::with_capacity(announced.unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(classify)?;
            let len = (body.len() + chunk.len()) as u64;
            if len > max_bytes {
                return Err(too_large(len));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let start = Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let (response, redirect_count) = self.follow(start).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("{status} from {}", response.url()),
            ));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = self.read_capped(response).await?;

        Ok(FetchOutput {
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url,
                redirect_count,
                content_type,
                byte_len: bytes.len() as u64,
            },
            bytes,
        })
    }
}

fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, FetchError> {
    let invalid = |err: String| FetchError::new(FailureKind::Network, format!("bad header: {err}"));
    headers
        .iter()
        .map(|(name, value)| {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
            let value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
            Ok::<_, FetchError>((name, value))
        })
        .collect()
}

/// Where a 3xx answer points, resolved against the URL that produced it.
fn redirect_target(current: &Url, response: &Response) -> Option<Url> {
    if !response.status().is_redirection() {
        return None;
    }
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    current.join(location).ok()
}

fn classify(err: reqwest::Error) -> FetchError {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::Network
    };
    FetchError::new(kind, err.to_string())
}
