//! Observability seam for the scheduler.
//!
//! The scheduler reports what it does through a [`SelectionObserver`]
//! passed in at construction, so tests can inspect events without
//! installing a global subscriber.

use tracing::{debug, error, info};

use crate::endpoint::Endpoint;
use crate::scheduler::SelectError;
use crate::status::ProbeOutcome;

/// Receives scheduler events.
///
/// Exactly one of `selected`, `none_available` or `failed` is called per
/// selection.
pub trait SelectionObserver: Send + Sync {
    /// The scheduler resolved its requested tier.
    fn configured(&self, _tier: &str, _max_scans: Option<u32>, _endpoint_count: usize) {}

    /// Candidates were resolved, in probe order.
    fn candidates(&self, _tier: &str, _candidates: &[Endpoint]) {}

    /// One candidate was probed.
    fn probed(&self, _endpoint: &Endpoint, _outcome: &ProbeOutcome) {}

    fn selected(&self, endpoint: &Endpoint);

    fn none_available(&self, tier: &str);

    fn failed(&self, error: &SelectError);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SelectionObserver for TracingObserver {
    fn configured(&self, tier: &str, max_scans: Option<u32>, endpoint_count: usize) {
        debug!(
            tier = %tier,
            max_scans = ?max_scans,
            endpoint_count,
            "Endpoint scheduler configured"
        );
    }

    fn candidates(&self, tier: &str, candidates: &[Endpoint]) {
        let addresses: Vec<&str> = candidates.iter().map(|e| e.address.as_str()).collect();
        debug!(tier = %tier, candidates = ?addresses, "Resolved candidate endpoints");
    }

    fn probed(&self, endpoint: &Endpoint, outcome: &ProbeOutcome) {
        match outcome {
            ProbeOutcome::Unreachable(e) => {
                debug!(endpoint = %endpoint, error = %e, "WebInspect scanner status query failed")
            }
            other => debug!(
                endpoint = %endpoint,
                running = ?other.running(),
                outcome = other.label(),
                "WebInspect scanner probed"
            ),
        }
    }

    fn selected(&self, endpoint: &Endpoint) {
        info!(
            endpoint = %endpoint,
            "WebBreaker has selected: {} for your WebInspect scan.",
            endpoint
        );
    }

    fn none_available(&self, tier: &str) {
        error!(
            tier = %tier,
            "No available WebInspect servers are available, due to misconfiguration or all scan engines are fully utilized!"
        );
    }

    fn failed(&self, error: &SelectError) {
        error!(
            error = %error,
            "Error has occurred with identifying an appropriate WebInspect scan engine. {}",
            error
        );
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SelectionObserver for NoopObserver {
    fn selected(&self, _endpoint: &Endpoint) {}

    fn none_available(&self, _tier: &str) {}

    fn failed(&self, _error: &SelectError) {}
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Log sink shared between the subscriber and the test.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        logs.contents()
    }

    #[test]
    fn test_selected_is_logged_at_info() {
        let endpoint = Endpoint::new("https://webinspect-a.example.com:8083", 2);
        let out = capture(|| TracingObserver.selected(&endpoint));

        assert!(out.contains("INFO"));
        assert!(out.contains(
            "WebBreaker has selected: https://webinspect-a.example.com:8083 for your WebInspect scan."
        ));
    }

    #[test]
    fn test_none_available_is_logged_at_error() {
        let out = capture(|| TracingObserver.none_available("medium"));

        assert!(out.contains("ERROR"));
        assert!(out.contains(
            "No available WebInspect servers are available, due to misconfiguration or all scan engines are fully utilized!"
        ));
        assert!(out.contains("tier=medium"));
    }

    #[test]
    fn test_failed_is_logged_at_error_with_cause() {
        let error = SelectError::ZeroCapacity {
            tier: "off".to_string(),
        };
        let out = capture(|| TracingObserver.failed(&error));

        assert!(out.contains("ERROR"));
        assert!(out.contains(
            "Error has occurred with identifying an appropriate WebInspect scan engine. tier 'off' allows zero concurrent scans"
        ));
    }

    #[test]
    fn test_candidate_outcomes_are_debug_events() {
        let endpoint = Endpoint::new("https://webinspect-b.example.com:8083", 1);
        let out = capture(|| {
            TracingObserver.probed(&endpoint, &ProbeOutcome::Saturated { running: 1 });
            TracingObserver.probed(&endpoint, &ProbeOutcome::TimedOut);
        });

        assert_eq!(out.matches("DEBUG").count(), 2);
        assert!(out.contains("outcome=\"full\""));
        assert!(out.contains("outcome=\"timed out\""));
    }

    #[test]
    fn test_noop_observer_logs_nothing() {
        let endpoint = Endpoint::new("https://webinspect-a.example.com:8083", 2);
        let out = capture(|| {
            NoopObserver.selected(&endpoint);
            NoopObserver.none_available("large");
        });

        assert!(out.is_empty());
    }
}
