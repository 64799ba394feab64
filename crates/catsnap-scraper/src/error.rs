use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {url} (retry after {})", retry_after.as_deref().unwrap_or("unspecified"))]
    RateLimited {
        url: String,
        retry_after: Option<String>,
    },

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("malformed response body from {url}: {reason}")]
    MalformedBody { url: String, reason: String },

    #[error("giving up on {url} after {attempts} attempts: {source}")]
    FetchExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<ScraperError>,
    },

    #[error("pagination limit reached for {url}: exceeded {max_pages} pages")]
    PaginationLimit { url: String, max_pages: u32 },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid extraction rule \"{rule}\": {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("normalization error for record {record}: {reason}")]
    Normalization { record: String, reason: String },
}

impl ScraperError {
    /// Whether retrying the same request could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ScraperError::Http(_)
            | ScraperError::RateLimited { .. }
            | ScraperError::MalformedBody { .. } => true,
            ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Client errors (4xx other than 429). Retrying will not change the outcome.
    #[must_use]
    pub fn is_permanent_fetch_failure(&self) -> bool {
        match self {
            ScraperError::NotFound { .. } => true,
            ScraperError::UnexpectedStatus { status, .. } => (400..500).contains(status),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> ScraperError {
        ScraperError::UnexpectedStatus {
            status,
            url: "https://shop.example/p".to_owned(),
        }
    }

    #[test]
    fn server_errors_are_transient() {
        assert!(status(500).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(503).is_permanent_fetch_failure());
    }

    #[test]
    fn client_errors_are_permanent() {
        assert!(!status(403).is_transient());
        assert!(status(403).is_permanent_fetch_failure());
        let not_found = ScraperError::NotFound {
            url: "https://shop.example/p".to_owned(),
        };
        assert!(!not_found.is_transient());
        assert!(not_found.is_permanent_fetch_failure());
    }

    #[test]
    fn rate_limit_and_malformed_body_are_transient() {
        let limited = ScraperError::RateLimited {
            url: "https://shop.example".to_owned(),
            retry_after: Some("30".to_owned()),
        };
        let malformed = ScraperError::MalformedBody {
            url: "https://shop.example".to_owned(),
            reason: "expected value".to_owned(),
        };
        assert!(limited.is_transient());
        assert!(malformed.is_transient());
        assert!(limited.to_string().contains("retry after 30"));
    }

    #[test]
    fn exhausted_carries_last_cause() {
        let err = ScraperError::FetchExhausted {
            url: "https://shop.example".to_owned(),
            attempts: 3,
            source: Box::new(status(502)),
        };
        let cause = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(
            cause.as_deref(),
            Some("unexpected HTTP status 502 from https://shop.example/p")
        );
        assert!(!err.is_transient());
    }
}
