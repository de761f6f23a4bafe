//! Aggregate results of one workload run

use serde::{Deserialize, Serialize};

/// Totals returned by [`WorkloadEngine::run`](crate::engine::WorkloadEngine::run)
///
/// `total_allocated`, `total_freed`, `rounds` and `replacements` are
/// deterministic for a given configuration and generator; `elapsed_secs` and
/// `peak_rss_kb` depend on the machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadStats {
    /// Wall-clock time of the churn loop only (warm-up and drain excluded)
    pub elapsed_secs: f64,
    /// Bytes allocated over the run, warm-up included
    pub total_allocated: u64,
    /// Bytes released over the run, drain included
    pub total_freed: u64,
    /// Highest resident memory sample, in KB
    pub peak_rss_kb: u64,
    /// Churn rounds executed
    pub rounds: u64,
    /// Replacement operations executed
    pub replacements: u64,
    /// Resident memory samples taken, final sample included
    pub samples: u64,
}

impl WorkloadStats {
    /// True when every allocated byte has been accounted as freed
    pub fn is_balanced(&self) -> bool {
        self.total_allocated == self.total_freed
    }

    /// Replacement throughput of the timed loop (0 when nothing was timed)
    pub fn replacements_per_sec(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.replacements as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    /// Peak resident memory in megabytes
    pub fn peak_rss_mb(&self) -> f64 {
        self.peak_rss_kb as f64 / 1024.0
    }
}
