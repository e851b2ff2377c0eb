//! Test doubles for the endpoint scheduler.
//!
//! - [`StaticStatusSource`]: scan lists served from memory, with a call log
//! - [`RecordingObserver`]: captures every scheduler event in order

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use webbreaker_scheduler::{
    Credentials, Endpoint, ProbeOutcome, QueryError, ScanStatusSnapshot, ScanStatusSource,
    ScanSummary, SelectError, SelectionObserver,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Serves canned scan lists keyed by endpoint address.
///
/// Addresses without a canned response fail with a transport error.
#[derive(Debug, Default)]
pub struct StaticStatusSource {
    responses: Mutex<HashMap<String, Result<ScanStatusSnapshot, QueryError>>>,
    calls: Mutex<Vec<String>>,
    usernames: Mutex<Vec<Option<String>>>,
}

impl StaticStatusSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `running` scans with status `Running`, plus one completed scan.
    pub fn running(self, address: &str, running: usize) -> Self {
        let mut scans: Vec<_> = (0..running)
            .map(|_| ScanSummary::with_status("Running"))
            .collect();
        scans.push(ScanSummary::with_status("Complete"));
        self.respond(address, Ok(ScanStatusSnapshot::ok(scans)))
    }

    /// Report scans with the given statuses.
    pub fn statuses(self, address: &str, statuses: &[&str]) -> Self {
        let scans = statuses
            .iter()
            .map(|s| ScanSummary::with_status(*s))
            .collect();
        self.respond(address, Ok(ScanStatusSnapshot::ok(scans)))
    }

    /// Answer with a non-success response.
    pub fn unsuccessful(self, address: &str) -> Self {
        self.respond(address, Ok(ScanStatusSnapshot::unsuccessful()))
    }

    pub fn failing(self, address: &str, error: QueryError) -> Self {
        self.respond(address, Err(error))
    }

    pub fn respond(self, address: &str, response: Result<ScanStatusSnapshot, QueryError>) -> Self {
        self.set(address, response);
        self
    }

    /// Replace the response for an address after construction.
    pub fn set(&self, address: &str, response: Result<ScanStatusSnapshot, QueryError>) {
        lock(&self.responses).insert(address.to_string(), response);
    }

    /// Addresses queried so far, in order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Username presented with each query, in order.
    pub fn usernames(&self) -> Vec<Option<String>> {
        lock(&self.usernames).clone()
    }
}

#[async_trait]
impl ScanStatusSource for StaticStatusSource {
    async fn list_scans(
        &self,
        address: &str,
        credentials: Option<&Credentials>,
    ) -> Result<ScanStatusSnapshot, QueryError> {
        lock(&self.calls).push(address.to_string());
        lock(&self.usernames).push(credentials.map(|c| c.username.clone()));

        lock(&self.responses)
            .get(address)
            .cloned()
            .unwrap_or_else(|| Err(QueryError::Transport(format!("no route to {address}"))))
    }
}

/// A scheduler event as seen by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedEvent {
    Configured {
        tier: String,
        max_scans: Option<u32>,
        endpoint_count: usize,
    },
    Candidates(Vec<String>),
    Probed {
        address: String,
        outcome: ProbeOutcome,
    },
    Selected(String),
    NoneAvailable(String),
    Failed(String),
}

impl ObservedEvent {
    /// Whether this event reports the outcome of a selection.
    pub fn is_outcome(&self) -> bool {
        matches!(
            self,
            Self::Selected(_) | Self::NoneAvailable(_) | Self::Failed(_)
        )
    }
}

#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObservedEvent> {
        lock(&self.events).clone()
    }

    pub fn outcomes(&self) -> Vec<ObservedEvent> {
        self.events().into_iter().filter(ObservedEvent::is_outcome).collect()
    }

    /// Addresses in the order they were probed.
    pub fn probe_order(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::Probed { address, .. } => Some(address),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ObservedEvent) {
        lock(&self.events).push(event);
    }
}

impl SelectionObserver for RecordingObserver {
    fn configured(&self, tier: &str, max_scans: Option<u32>, endpoint_count: usize) {
        self.push(ObservedEvent::Configured {
            tier: tier.to_string(),
            max_scans,
            endpoint_count,
        });
    }

    fn candidates(&self, _tier: &str, candidates: &[Endpoint]) {
        self.push(ObservedEvent::Candidates(
            candidates.iter().map(|e| e.address.clone()).collect(),
        ));
    }

    fn probed(&self, endpoint: &Endpoint, outcome: &ProbeOutcome) {
        self.push(ObservedEvent::Probed {
            address: endpoint.address.clone(),
            outcome: outcome.clone(),
        });
    }

    fn selected(&self, endpoint: &Endpoint) {
        self.push(ObservedEvent::Selected(endpoint.address.clone()));
    }

    fn none_available(&self, tier: &str) {
        self.push(ObservedEvent::NoneAvailable(tier.to_string()));
    }

    fn failed(&self, error: &SelectError) {
        self.push(ObservedEvent::Failed(error.to_string()));
    }
}
