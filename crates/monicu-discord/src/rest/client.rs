//! HTTP implementation of [`DiscordApi`]

use std::time::Duration;

use async_trait::async_trait;
use monicu_core::{EmojiRef, Snowflake};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::DiscordApi;
use crate::error::{DiscordError, DiscordResult};
use crate::events::{ChannelInfo, Message, UserPayload};

/// How many times a rate-limited request is retried before giving up
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Upper bound for a single request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// Discord REST client authenticated with a bot token
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: Url,
}

impl RestClient {
    /// Create a client for the API rooted at `base_url`
    /// (e.g. `https://discord.com/api/v10`)
    pub fn new(base_url: &str, token: &str) -> DiscordResult<Self> {
        let base = Url::parse(base_url).map_err(|e| DiscordError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(DiscordError::InvalidUrl(base_url.to_string()));
        }

        let mut auth = HeaderValue::from_str(&format!("Bot {token}"))
            .map_err(|_| DiscordError::InvalidUrl("token is not a valid header value".to_string()))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("DiscordBot (monicu, ", env!("CARGO_PKG_VERSION"), ")"))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { http, base })
    }

    /// Build an endpoint URL from path segments, percent-encoding each one
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> DiscordResult<T> {
        let mut attempt = 0;
        loop {
            let response = self.http.get(url.clone()).send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = retry_after(response).await;
                attempt += 1;
                if attempt > MAX_RATE_LIMIT_RETRIES {
                    return Err(DiscordError::RateLimited { retry_after });
                }
                tracing::warn!(
                    path = url.path(),
                    retry_after_ms = retry_after.as_millis() as u64,
                    attempt,
                    "Rate limited by Discord"
                );
                tokio::time::sleep(retry_after).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorBody>(&body)
                    .map(|b| b.message)
                    .unwrap_or(body);
                return Err(DiscordError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let bytes = response.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }
    }
}

/// Wait time requested by a 429 response, from the body or the header
async fn retry_after(response: reqwest::Response) -> Duration {
    let from_header = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<f64>().ok());
    let from_body = response
        .json::<RateLimitBody>()
        .await
        .ok()
        .map(|b| b.retry_after);

    from_body
        .or(from_header)
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map_or(Duration::from_secs(1), Duration::from_secs_f64)
}

#[async_trait]
impl DiscordApi for RestClient {
    async fn channel(&self, channel: Snowflake) -> DiscordResult<ChannelInfo> {
        let id = channel.to_string();
        self.get(self.endpoint(["channels", id.as_str()])).await
    }

    async fn channel_messages(
        &self,
        channel: Snowflake,
        before: Option<Snowflake>,
        limit: u8,
    ) -> DiscordResult<Vec<Message>> {
        let id = channel.to_string();
        let mut url = self.endpoint(["channels", id.as_str(), "messages"]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.to_string());
            if let Some(before) = before {
                query.append_pair("before", &before.to_string());
            }
        }
        self.get(url).await
    }

    async fn message_reactions(
        &self,
        channel: Snowflake,
        message: Snowflake,
        emoji: &EmojiRef,
        after: Option<Snowflake>,
        limit: u8,
    ) -> DiscordResult<Vec<UserPayload>> {
        let channel = channel.to_string();
        let message = message.to_string();
        let emoji = emoji.api_name();
        let mut url = self.endpoint([
            "channels",
            channel.as_str(),
            "messages",
            message.as_str(),
            "reactions",
            emoji.as_str(),
        ]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.to_string());
            if let Some(after) = after {
                query.append_pair("after", &after.to_string());
            }
        }
        self.get(url).await
    }

    async fn channel_message(
        &self,
        channel: Snowflake,
        message: Snowflake,
    ) -> DiscordResult<Message> {
        let channel = channel.to_string();
        let message = message.to_string();
        self.get(self.endpoint(["channels", channel.as_str(), "messages", message.as_str()]))
            .await
    }
}
