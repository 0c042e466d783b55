// src/fetch/mod.rs

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::KioskConfig;
use crate::csv::{parse_table, Table};

pub mod transport;

pub use transport::{Response, Transport};

/// Relays answer failures with a full HTML page; CSV never contains this.
const HTML_ERROR_MARKER: &str = "<!DOCTYPE";

/// Why a single proxy (or the direct request) was not accepted.
#[derive(Debug, Error, PartialEq)]
pub enum AttemptError {
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("empty response body")]
    EmptyBody,
    #[error("response looks like an HTML error page")]
    HtmlErrorPage,
    #[error("response contained no rows")]
    NoRows,
}

#[derive(Debug, Error, PartialEq)]
pub enum FetchError {
    #[error("all {attempts} attempts failed (every proxy and the direct request)")]
    Exhausted { attempts: usize },
}

/// Which route produced the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Proxy(usize),
    Direct,
}

#[derive(Debug, Clone)]
pub struct Fetched {
    pub table: Table,
    pub source: Source,
    pub fetched_at: DateTime<Utc>,
}

/// Remembers the last proxy that worked so later loads skip known-dead ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxySession {
    last_good: usize,
}

impl ProxySession {
    pub fn last_good(&self) -> usize {
        self.last_good
    }
}

/// Fetch `target` through each proxy prefix in turn, then directly.
pub struct FetchChain<T> {
    transport: T,
    target: String,
    proxies: Vec<String>,
    session: ProxySession,
}

impl<T: Transport> FetchChain<T> {
    pub fn new(transport: T, target: impl Into<String>, proxies: Vec<String>) -> Self {
        Self {
            transport,
            target: target.into(),
            proxies,
            session: ProxySession::default(),
        }
    }

    pub fn from_config(transport: T, config: &KioskConfig) -> Self {
        Self::new(
            transport,
            config.source.csv_url.clone(),
            config.source.proxies.clone(),
        )
    }

    pub fn session(&self) -> ProxySession {
        self.session
    }

    /// URL for proxy `index`: the prefix followed by the percent-encoded target.
    pub fn proxied_url(&self, index: usize) -> Option<String> {
        self.proxies
            .get(index)
            .map(|prefix| format!("{}{}", prefix, urlencoding::encode(&self.target)))
    }

    /// One pass over the proxies starting at the last good one, then the direct URL.
    #[instrument(level = "info", skip(self), fields(start = self.session.last_good))]
    pub async fn load(&mut self) -> Result<Fetched, FetchError> {
        let mut attempts = 0;

        for index in self.session.last_good..self.proxies.len() {
            attempts += 1;
            let Some(url) = self.proxied_url(index) else {
                break;
            };
            match self.try_proxy(&url).await {
                Ok(table) => {
                    info!(proxy = index, rows = table.body().len(), "loaded via proxy");
                    self.session.last_good = index;
                    return Ok(Fetched {
                        table,
                        source: Source::Proxy(index),
                        fetched_at: Utc::now(),
                    });
                }
                Err(e) => warn!(proxy = index, error = %e, "proxy failed"),
            }
        }

        attempts += 1;
        match self.try_direct().await {
            Ok(table) => {
                info!(rows = table.body().len(), "loaded directly");
                Ok(Fetched {
                    table,
                    source: Source::Direct,
                    fetched_at: Utc::now(),
                })
            }
            Err(e) => {
                warn!(error = %e, "direct access also failed");
                // Start from the first relay again next time.
                self.session = ProxySession::default();
                Err(FetchError::Exhausted { attempts })
            }
        }
    }

    async fn try_proxy(&self, url: &str) -> Result<Table, AttemptError> {
        let body = self.get_success(url).await?;
        if body.is_empty() {
            return Err(AttemptError::EmptyBody);
        }
        if body.contains(HTML_ERROR_MARKER) {
            return Err(AttemptError::HtmlErrorPage);
        }
        parse_table(&body).ok_or(AttemptError::NoRows)
    }

    async fn try_direct(&self) -> Result<Table, AttemptError> {
        let body = self.get_success(&self.target).await?;
        parse_table(&body).ok_or(AttemptError::NoRows)
    }

    async fn get_success(&self, url: &str) -> Result<String, AttemptError> {
        let resp = self
            .transport
            .get(url)
            .await
            .map_err(|e| AttemptError::Transport(format!("{:#}", e)))?;
        debug!(status = resp.status, bytes = resp.body.len(), "response");
        if !resp.is_success() {
            return Err(AttemptError::Status(resp.status));
        }
        Ok(resp.body)
    }
}
