//! HTTP fetcher shared by every request in a run.

mod origin;

use std::time::Duration;

use catsnap_core::AppConfig;
use reqwest::Client;
use serde_json::Value;

use crate::error::ScraperError;
use crate::retry::retry_with_backoff;

pub use origin::{extract_origin, resolve_url};

/// A successfully fetched response body.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    /// Final URL after redirects.
    pub url: String,
    pub body: String,
    /// Declared `Content-Length`, for logging only.
    pub content_length: Option<u64>,
}

/// HTTP client with per-request timeout and retry-with-backoff.
///
/// Maps 429 to [`ScraperError::RateLimited`], 404 to [`ScraperError::NotFound`]
/// and every other non-2xx status to [`ScraperError::UnexpectedStatus`].
/// Transient failures are retried up to `max_attempts` total attempts with
/// linear backoff; see [`retry_with_backoff`].
pub struct Fetcher {
    client: Client,
    max_attempts: u32,
    retry_delay: Duration,
}

impl Fetcher {
    /// Creates a `Fetcher` with a configured timeout, `User-Agent` and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout: Duration,
        user_agent: &str,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_attempts,
            retry_delay,
        })
    }

    /// # Errors
    ///
    /// See [`Fetcher::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, ScraperError> {
        Self::new(
            config.request_timeout(),
            &config.user_agent,
            config.max_attempts,
            config.retry_delay(),
        )
    }

    /// Fetches `url` as text (HTML, XML).
    ///
    /// # Errors
    ///
    /// - [`ScraperError::FetchExhausted`] after the attempt budget is spent on transient failures.
    /// - [`ScraperError::NotFound`] / [`ScraperError::UnexpectedStatus`] for 4xx, without retrying.
    pub async fn fetch_text(&self, url: &str) -> Result<FetchedBody, ScraperError> {
        self.fetch_decoded(url, |body| Ok(body)).await
    }

    /// Fetches `url` and parses the body as JSON. Parse failures are retried.
    ///
    /// # Errors
    ///
    /// As [`Fetcher::fetch_text`]; an unparseable body counts as a transient
    /// [`ScraperError::MalformedBody`].
    pub async fn fetch_json(&self, url: &str) -> Result<Value, ScraperError> {
        self.fetch_decoded(url, |body| parse_json(&body)).await
    }

    /// Fetches `url` and returns the record array it carries, either under
    /// the `collection` envelope key or as the top-level array.
    ///
    /// A body with an unexpected envelope is retried like a malformed one.
    ///
    /// # Errors
    ///
    /// As [`Fetcher::fetch_json`].
    pub async fn fetch_collection(
        &self,
        url: &str,
        collection: Option<&str>,
    ) -> Result<Vec<Value>, ScraperError> {
        self.fetch_decoded(url, |body| {
            let value = parse_json(&body)?;
            take_collection(value, collection).map_err(|reason| ScraperError::MalformedBody {
                url: body.url.clone(),
                reason,
            })
        })
        .await
    }

    async fn fetch_decoded<T, D>(&self, url: &str, decode: D) -> Result<T, ScraperError>
    where
        D: Fn(FetchedBody) -> Result<T, ScraperError>,
    {
        let decode = &decode;
        retry_with_backoff(url, self.max_attempts, self.retry_delay, || async move {
            let body = self.get_once(url).await?;
            decode(body)
        })
        .await
    }

    /// One GET with status classification. No retries.
    async fn get_once(&self, url: &str) -> Result<FetchedBody, ScraperError> {
        let referer = extract_origin(url);
        let response = self
            .client
            .get(url)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(reqwest::header::REFERER, &referer)
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            return Err(ScraperError::RateLimited {
                url: url.to_owned(),
                retry_after,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ScraperError::NotFound {
                url: url.to_owned(),
            });
        }

        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let final_url = response.url().to_string();
        let content_length = response.content_length();
        let body = response.text().await?;
        tracing::debug!(
            url = %final_url,
            content_length = content_length.unwrap_or(body.len() as u64),
            "fetched"
        );

        Ok(FetchedBody {
            url: final_url,
            body,
            content_length,
        })
    }
}

fn parse_json(fetched: &FetchedBody) -> Result<Value, ScraperError> {
    serde_json::from_str(&fetched.body).map_err(|e| ScraperError::MalformedBody {
        url: fetched.url.clone(),
        reason: e.to_string(),
    })
}

/// Pulls the record array out of a decoded body.
pub(crate) fn take_collection(value: Value, collection: Option<&str>) -> Result<Vec<Value>, String> {
    let array = match collection {
        Some(key) => match value {
            Value::Object(mut map) => map
                .remove(key)
                .ok_or_else(|| format!("missing \"{key}\" collection"))?,
            _ => return Err(format!("expected an object with a \"{key}\" collection")),
        },
        None => value,
    };

    match array {
        Value::Array(items) => Ok(items),
        other => Err(format!("expected an array of records, got {}", json_kind(&other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
