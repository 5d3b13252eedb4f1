use std::time::Duration;

use alloy::primitives::TxHash;

use crate::{
    report::ReportStatus,
    types::{CurrencyPair, JobId},
};

pub type Result<T> = std::result::Result<T, Error>;

/// Error produced by the ingestion pipeline, its providers and stores.
///
/// Configuration errors are fatal and surface immediately, transport errors
/// are retried a bounded number of times (see [`crate::retry`]) before they
/// propagate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("unsupported pool {pool} for {provider} provider")]
    UnsupportedPool { pool: String, provider: &'static str },

    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("invalid time range: start {0} is after end {1}")]
    InvalidRange(u64, u64),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected http status: {0}")]
    Http(u16),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("api error: {0}")]
    Api(String),

    #[error("transactions out of timestamp order at {0}")]
    Unordered(TxHash),

    #[error("no {pair} rate available at or after {timestamp}")]
    RateUnavailable { pair: CurrencyPair, timestamp: u64 },

    #[error("report queue is closed")]
    QueueClosed,

    #[error("report job not found: {0}")]
    JobNotFound(JobId),

    #[error("invalid report transition: {from} -> {to}")]
    InvalidTransition { from: ReportStatus, to: ReportStatus },

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Whether the failure is worth another attempt of the same request.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Http(status) => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        if let Some(status) = value.status() {
            Self::Http(status.as_u16())
        } else if value.is_decode() {
            Self::Decode(value.to_string())
        } else if value.is_builder() {
            Self::Config(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(value: url::ParseError) -> Self {
        Self::Config(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::Transport("connection reset".to_string()).is_transient());
        assert!(Error::Timeout(Duration::from_secs(1)).is_transient());
        assert!(Error::Http(502).is_transient());
        assert!(Error::Http(429).is_transient());

        assert!(!Error::Http(404).is_transient());
        assert!(!Error::Decode("bad json".to_string()).is_transient());
        assert!(!Error::UnsupportedProtocol("sushiswap".to_string()).is_transient());
        assert!(
            !Error::UnsupportedPool {
                pool: "wbtc_eth".to_string(),
                provider: "explorer"
            }
            .is_transient()
        );
        assert!(!Error::Cancelled.is_transient());
    }
}
