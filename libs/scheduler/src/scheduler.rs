//! First-fit endpoint selection over a shuffled candidate set.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

use crate::endpoint::{Endpoint, TierTable};
use crate::observer::{SelectionObserver, TracingObserver};
use crate::status::{Credentials, ProbeOutcome, ScanStatusSource};

/// Result type for structural checks made during selection.
pub type SelectResult<T> = Result<T, SelectError>;

/// A structural problem with the scheduler's inputs.
///
/// Per-endpoint query failures are not represented here; they only skip
/// the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("tier '{tier}' allows zero concurrent scans")]
    ZeroCapacity { tier: String },

    #[error("an endpoint sized for {max_scans} concurrent scans has an empty address")]
    EmptyAddress { max_scans: u32 },
}

/// Outcome of [`EndpointScheduler::select_endpoint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// An endpoint had headroom when probed.
    Selected(Endpoint),

    /// No candidate had headroom, or there were no candidates.
    NoneAvailable,

    /// Selection could not run; carries a description of the cause.
    Failed(String),
}

impl Selection {
    pub fn endpoint(&self) -> Option<&Endpoint> {
        match self {
            Self::Selected(endpoint) => Some(endpoint),
            _ => None,
        }
    }

    pub fn into_endpoint(self) -> Option<Endpoint> {
        match self {
            Self::Selected(endpoint) => Some(endpoint),
            _ => None,
        }
    }
}

/// Inputs the scheduler is constructed from.
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Every configured endpoint, across all tiers.
    pub endpoints: Vec<Endpoint>,

    pub tiers: TierTable,

    /// Tier to select for. `None` uses the tier table's default.
    pub requested_tier: Option<String>,

    pub credentials: Option<Credentials>,
}

/// Picks an endpoint with spare capacity for the requested tier.
pub struct EndpointScheduler<S> {
    endpoints: Vec<Endpoint>,
    tier: String,
    max_scans: Option<u32>,
    credentials: Option<Credentials>,
    source: S,
    observer: Arc<dyn SelectionObserver>,
    rng: Mutex<StdRng>,
    probe_timeout: Option<Duration>,
}

impl<S: ScanStatusSource> EndpointScheduler<S> {
    /// Create a scheduler that logs through `tracing` and shuffles with OS entropy.
    pub fn new(config: SchedulerConfig, source: S) -> Self {
        Self::builder(config, source).build()
    }

    pub fn builder(config: SchedulerConfig, source: S) -> SchedulerBuilder<S> {
        SchedulerBuilder {
            config,
            source,
            observer: None,
            seed: None,
            probe_timeout: None,
        }
    }

    /// Name of the requested tier.
    pub fn tier(&self) -> &str {
        &self.tier
    }

    /// Concurrency limit of the requested tier, if the tier is configured.
    pub fn max_scans(&self) -> Option<u32> {
        self.max_scans
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Endpoints whose limit exactly equals the requested tier's limit, in
    /// configuration order.
    pub fn candidates(&self) -> Vec<Endpoint> {
        let Some(limit) = self.max_scans else {
            return Vec::new();
        };
        self.endpoints
            .iter()
            .filter(|endpoint| endpoint.max_scans == limit)
            .cloned()
            .collect()
    }

    /// Pick an endpoint with headroom.
    ///
    /// Candidates are probed sequentially in random order and the first one
    /// running fewer scans than the limit is returned. Nothing is reserved:
    /// another process may pick the same endpoint before a scan starts.
    pub async fn select_endpoint(&self) -> Selection {
        match self.try_select().await {
            Ok(Some(endpoint)) => {
                self.observer.selected(&endpoint);
                Selection::Selected(endpoint)
            }
            Ok(None) => {
                self.observer.none_available(&self.tier);
                Selection::NoneAvailable
            }
            Err(e) => {
                self.observer.failed(&e);
                Selection::Failed(e.to_string())
            }
        }
    }

    async fn try_select(&self) -> SelectResult<Option<Endpoint>> {
        let Some(limit) = self.max_scans else {
            self.observer.candidates(&self.tier, &[]);
            return Ok(None);
        };
        if limit == 0 {
            return Err(SelectError::ZeroCapacity {
                tier: self.tier.clone(),
            });
        }

        let mut candidates = self.candidates();
        if let Some(endpoint) = candidates.iter().find(|e| e.address.trim().is_empty()) {
            return Err(SelectError::EmptyAddress {
                max_scans: endpoint.max_scans,
            });
        }

        self.shuffle(&mut candidates);
        self.observer.candidates(&self.tier, &candidates);

        for endpoint in candidates {
            let outcome = self.probe(&endpoint, limit).await;
            self.observer.probed(&endpoint, &outcome);
            if outcome.is_available() {
                return Ok(Some(endpoint));
            }
        }

        Ok(None)
    }

    fn shuffle(&self, candidates: &mut [Endpoint]) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        candidates.shuffle(&mut *rng);
    }

    /// Read an endpoint's scan list and compare its running count to `limit`.
    pub async fn probe(&self, endpoint: &Endpoint, limit: u32) -> ProbeOutcome {
        let query = self
            .source
            .list_scans(&endpoint.address, self.credentials.as_ref());

        let result = match self.probe_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, query).await {
                Ok(result) => result,
                Err(_) => return ProbeOutcome::TimedOut,
            },
            None => query.await,
        };

        match result {
            Ok(snapshot) => ProbeOutcome::from_snapshot(&snapshot, limit),
            Err(e) => ProbeOutcome::Unreachable(e),
        }
    }
}

/// Builder for [`EndpointScheduler`].
pub struct SchedulerBuilder<S> {
    config: SchedulerConfig,
    source: S,
    observer: Option<Arc<dyn SelectionObserver>>,
    seed: Option<u64>,
    probe_timeout: Option<Duration>,
}

impl<S: ScanStatusSource> SchedulerBuilder<S> {
    pub fn observer(mut self, observer: Arc<dyn SelectionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Use a deterministic shuffle.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Bound each probe; a probe that runs longer counts as unavailable.
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> EndpointScheduler<S> {
        let SchedulerConfig {
            endpoints,
            tiers,
            requested_tier,
            credentials,
        } = self.config;

        let tier = requested_tier.unwrap_or_else(|| tiers.default_tier().to_string());
        let max_scans = tiers.limit(&tier);
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(TracingObserver) as Arc<dyn SelectionObserver>);
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        observer.configured(&tier, max_scans, endpoints.len());

        EndpointScheduler {
            endpoints,
            tier,
            max_scans,
            credentials,
            source: self.source,
            observer,
            rng: Mutex::new(rng),
            probe_timeout: self.probe_timeout,
        }
    }
}
