//! HTTP fetcher for the remote `/_stats` endpoint.
//!
//! [`HttpStatsSource`] issues a plain `GET` with [`reqwest`] and parses the
//! body into a [`StatsSample`]. The monitor loop only sees the
//! [`StatsSource`] trait, so tests can substitute a scripted source.

use std::time::Duration;

use async_trait::async_trait;
use statprobe_core::{FieldParsing, StatsParseError, StatsSample};

/// Errors from a single fetch attempt. None of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection, timeout or body read failure.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with something other than `200 OK`.
    #[error("unexpected status code: {status}")]
    UnexpectedStatus { status: u16 },

    /// The body was not a six-field numeric CSV record.
    #[error("invalid stats record: {0}")]
    Parse(#[from] StatsParseError),
}

/// Something that can produce one [`StatsSample`] per call.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn fetch(&self) -> Result<StatsSample, FetchError>;
}

/// Fetches samples over HTTP.
pub struct HttpStatsSource {
    client: reqwest::Client,
    url: String,
    field_parsing: FieldParsing,
}

impl HttpStatsSource {
    /// Build a source with its own client.
    ///
    /// `timeout` bounds each request end to end; `None` leaves requests
    /// unbounded.
    pub fn new(
        url: String,
        timeout: Option<Duration>,
        field_parsing: FieldParsing,
    ) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, url, field_parsing))
    }

    /// Build a source reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, url: String, field_parsing: FieldParsing) -> Self {
        Self {
            client,
            url,
            field_parsing,
        }
    }
}

#[async_trait]
impl StatsSource for HttpStatsSource {
    async fn fetch(&self) -> Result<StatsSample, FetchError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        tracing::trace!(bytes = body.len(), "Received stats body");

        Ok(StatsSample::parse(&body, self.field_parsing)?)
    }
}
