//! HTTP client for WebInspect scan engines.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use tracing::debug;
use webbreaker_scheduler::{
    Credentials, QueryError, ScanStatusSnapshot, ScanStatusSource, ScanSummary,
};

use crate::config::WebInspectConfig;

/// Scan list path on a WebInspect engine.
const SCANS_PATH: &str = "/webinspect/scanner/scans";

/// Client for the WebInspect REST API, shared across engines.
#[derive(Debug, Clone)]
pub struct WebInspectClient {
    client: reqwest::Client,
}

impl WebInspectClient {
    /// Create a client using the configured timeout and TLS policy.
    pub fn new(config: &WebInspectConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Build a URL for a path on an engine.
    fn url(address: &str, path: &str) -> String {
        format!("{}{}", address.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl ScanStatusSource for WebInspectClient {
    async fn list_scans(
        &self,
        address: &str,
        credentials: Option<&Credentials>,
    ) -> Result<ScanStatusSnapshot, QueryError> {
        let url = Self::url(address, SCANS_PATH);
        debug!(url = %url, "Listing WebInspect scans");

        let mut request = self.client.get(&url);
        if let Some(creds) = credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = request.send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %url, status = %status, "WebInspect rejected scan list request");
            return Ok(ScanStatusSnapshot::unsuccessful());
        }

        let scans: Vec<ScanSummary> = response.json().await.map_err(|e| {
            if e.is_timeout() {
                QueryError::Timeout
            } else {
                QueryError::Decode(e.to_string())
            }
        })?;

        Ok(ScanStatusSnapshot::ok(scans))
    }
}

fn transport_error(e: reqwest::Error) -> QueryError {
    if e.is_timeout() {
        QueryError::Timeout
    } else {
        QueryError::Transport(e.to_string())
    }
}
