//! Scan status reads against a single endpoint.
//!
//! The scheduler never talks HTTP itself. It reads scan lists through a
//! [`ScanStatusSource`], which the caller supplies (a WebInspect REST client
//! in production, an in-memory table in tests).

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scan status that counts toward an endpoint's load. Matched exactly.
pub const RUNNING_STATUS: &str = "Running";

/// One entry of an endpoint's scan list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "Status")]
    pub status: String,
}

impl ScanSummary {
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            id: None,
            name: None,
            status: status.into(),
        }
    }
}

/// Result of listing an endpoint's scans. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatusSnapshot {
    pub success: bool,
    pub scans: Vec<ScanSummary>,
}

impl ScanStatusSnapshot {
    /// A successful read of the given scans.
    pub fn ok(scans: Vec<ScanSummary>) -> Self {
        Self {
            success: true,
            scans,
        }
    }

    /// The endpoint answered but reported failure.
    pub fn unsuccessful() -> Self {
        Self {
            success: false,
            scans: Vec::new(),
        }
    }

    /// Number of scans whose status is exactly [`RUNNING_STATUS`].
    pub fn running_count(&self) -> usize {
        self.scans
            .iter()
            .filter(|scan| scan.status == RUNNING_STATUS)
            .count()
    }
}

/// Credentials forwarded to the status source on every read.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A single endpoint's status read failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("invalid scan list: {0}")]
    Decode(String),
}

/// Capability to list the scans of one endpoint.
#[async_trait]
pub trait ScanStatusSource: Send + Sync {
    async fn list_scans(
        &self,
        address: &str,
        credentials: Option<&Credentials>,
    ) -> Result<ScanStatusSnapshot, QueryError>;
}

#[async_trait]
impl<T: ScanStatusSource + ?Sized> ScanStatusSource for std::sync::Arc<T> {
    async fn list_scans(
        &self,
        address: &str,
        credentials: Option<&Credentials>,
    ) -> Result<ScanStatusSnapshot, QueryError> {
        (**self).list_scans(address, credentials).await
    }
}

/// Outcome of one liveness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Fewer than the limit are running.
    Available { running: usize },

    /// At or over the limit.
    Saturated { running: usize },

    /// The endpoint answered with a non-success response.
    Unsuccessful,

    /// The read failed.
    Unreachable(QueryError),

    /// The probe exceeded the scheduler's probe timeout.
    TimedOut,
}

impl ProbeOutcome {
    /// Classify a snapshot against a concurrency limit.
    pub fn from_snapshot(snapshot: &ScanStatusSnapshot, limit: u32) -> Self {
        if !snapshot.success {
            return Self::Unsuccessful;
        }
        let running = snapshot.running_count();
        if running < limit as usize {
            Self::Available { running }
        } else {
            Self::Saturated { running }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    /// Running scan count, when the endpoint reported one.
    pub fn running(&self) -> Option<usize> {
        match self {
            Self::Available { running } | Self::Saturated { running } => Some(*running),
            _ => None,
        }
    }

    /// Short lowercase label for tables and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Available { .. } => "available",
            Self::Saturated { .. } => "full",
            Self::Unsuccessful => "unsuccessful",
            Self::Unreachable(_) => "unreachable",
            Self::TimedOut => "timed out",
        }
    }
}
