//! Image size probe

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use reqwest::Url;

use crate::error::{DiscordError, DiscordResult};

/// Looks up the byte size of a remote image
#[async_trait]
pub trait ImageProbe: Send + Sync {
    async fn content_length(&self, url: &str) -> DiscordResult<u64>;
}

/// [`ImageProbe`] that issues an HTTP HEAD request and reads `Content-Length`
#[derive(Clone)]
pub struct HttpImageProbe {
    http: reqwest::Client,
}

impl HttpImageProbe {
    /// Create a probe whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> DiscordResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ImageProbe for HttpImageProbe {
    async fn content_length(&self, url: &str) -> DiscordResult<u64> {
        let parsed = Url::parse(url).map_err(|e| DiscordError::InvalidUrl(format!("{url}: {e}")))?;
        let response = self.http.head(parsed).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiscordError::Api {
                status: status.as_u16(),
                message: format!("HEAD {url}"),
            });
        }

        // `Response::content_length` reports the (empty) body size for HEAD
        parse_content_length(response.headers().get(CONTENT_LENGTH))
            .ok_or_else(|| DiscordError::MissingContentLength(url.to_string()))
    }
}

fn parse_content_length(value: Option<&reqwest::header::HeaderValue>) -> Option<u64> {
    value?.to_str().ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_parse_content_length() {
        let value = HeaderValue::from_static("2048");
        assert_eq!(parse_content_length(Some(&value)), Some(2048));

        let value = HeaderValue::from_static("lots");
        assert_eq!(parse_content_length(Some(&value)), None);
        assert_eq!(parse_content_length(None), None);
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_sending() {
        let probe = HttpImageProbe::new(Duration::from_secs(1)).unwrap();
        let err = probe.content_length("not a url").await.unwrap_err();
        assert!(matches!(err, DiscordError::InvalidUrl(_)));
    }
}
