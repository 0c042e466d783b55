// src/fetch/transport.rs

use anyhow::{Context, Result};
use reqwest::Client;
use std::future::Future;
use tracing::debug;

/// Status and body of one GET, whatever the status was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The one network operation the fetch chain needs.
///
/// `Err` means no response arrived at all; HTTP error statuses come back as `Ok`.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> impl Future<Output = Result<Response>> + Send;
}

impl Transport for Client {
    async fn get(&self, url: &str) -> Result<Response> {
        debug!("GET {}", url);
        let resp = Client::get(self, url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .with_context(|| format!("reading body from {}", url))?;
        Ok(Response { status, body })
    }
}
