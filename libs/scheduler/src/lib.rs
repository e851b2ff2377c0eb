//! Capacity-aware endpoint selection for WebInspect scan engines.
//!
//! Given a static pool of scan-engine endpoints, each declaring how many
//! concurrent scans it accepts, the scheduler picks one endpoint that
//! currently has headroom for a scan of the requested size. Key concepts:
//!
//! - **Tier**: a named size (`large`, `medium`) mapped to a concurrency limit.
//! - **Candidate set**: endpoints whose declared limit equals the tier's limit.
//! - **Probe**: a fresh read of an endpoint's scan list, counting `Running` scans.
//!
//! # Invariants
//!
//! - Only endpoints whose limit exactly equals the requested tier's limit are
//!   ever selected
//! - Candidates are probed one at a time in a random order; the first with
//!   headroom wins
//! - A failed probe never fails the selection, it only skips the candidate
//! - Selection holds no state across calls beyond its construction inputs
//!
//! Multiple processes may select from the same pool at the same time. There
//! is no lock between them; the shuffle only makes collisions less likely.

mod endpoint;
mod observer;
mod scheduler;
mod status;

pub use endpoint::{Endpoint, TierTable, DEFAULT_TIER};
pub use observer::{NoopObserver, SelectionObserver, TracingObserver};
pub use scheduler::{
    EndpointScheduler, SchedulerBuilder, SchedulerConfig, SelectError, SelectResult, Selection,
};
pub use status::{
    Credentials, ProbeOutcome, QueryError, ScanStatusSnapshot, ScanStatusSource, ScanSummary,
    RUNNING_STATUS,
};
