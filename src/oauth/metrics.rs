//! Enablement metrics
//!
//! - `factpod_enable_total`: counter of enable attempts
//! - `factpod_enable_outcomes_total`: counter by outcome
//!   (`enabled`, `already_enabled`, `config_missing`)
//! - `factpod_enable_errors_total`: counter by error kind
//! - `factpod_enable_duration_seconds`: histogram by outcome
//!
//! No exporter is installed by this crate; without a recorder the macros
//! are no-ops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use metrics::{histogram, increment_counter};

use crate::error::ServiceErrorKind;

/// Metrics for one enable attempt. Records at most once.
///
/// # Examples
///
/// ```
/// use factpod_gateway::oauth::EnablementMetrics;
///
/// let metrics = EnablementMetrics::start();
/// metrics.record_outcome("enabled");
/// assert!(metrics.is_recorded());
/// ```
#[derive(Debug)]
pub struct EnablementMetrics {
    start: Instant,
    recorded: AtomicBool,
}

impl EnablementMetrics {
    /// Counts the attempt and starts the timer.
    pub fn start() -> Self {
        increment_counter!("factpod_enable_total");
        Self {
            start: Instant::now(),
            recorded: AtomicBool::new(false),
        }
    }

    /// Records a successful outcome label.
    pub fn record_outcome(&self, outcome: &'static str) {
        if self.recorded.swap(true, Ordering::SeqCst) {
            return;
        }
        histogram!(
            "factpod_enable_duration_seconds",
            self.start.elapsed().as_secs_f64(),
            "outcome" => outcome
        );
        increment_counter!("factpod_enable_outcomes_total", "outcome" => outcome);
    }

    /// Records a failed attempt by error kind.
    pub fn record_error(&self, kind: ServiceErrorKind) {
        if self.recorded.swap(true, Ordering::SeqCst) {
            return;
        }
        histogram!(
            "factpod_enable_duration_seconds",
            self.start.elapsed().as_secs_f64(),
            "outcome" => "error"
        );
        increment_counter!("factpod_enable_errors_total", "kind" => kind.to_string());
    }

    pub fn is_recorded(&self) -> bool {
        self.recorded.load(Ordering::SeqCst)
    }
}
