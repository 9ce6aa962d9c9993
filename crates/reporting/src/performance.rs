//! Performance aggregation over leaf results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use webprobe_network::{NetworkCallRecord, NetworkStats};

use crate::record::{Leaf, RunRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub completed_count: usize,
    pub failed_count: usize,
    /// Mean leaf duration in ms; 0 when there are no leaves.
    pub average_duration: f64,
}

impl PerformanceMetrics {
    pub fn from_leaves<'a>(leaves: impl IntoIterator<Item = &'a Leaf>) -> Self {
        let mut metrics = Self::default();
        let mut count = 0usize;
        let mut total = 0u64;
        for leaf in leaves {
            count += 1;
            total += leaf.timing.duration_ms;
            if leaf.is_completed() {
                metrics.completed_count += 1;
            } else if leaf.is_failed() {
                metrics.failed_count += 1;
            }
        }
        if count > 0 {
            metrics.average_duration = total as f64 / count as f64;
        }
        metrics
    }
}

/// Metrics over the leaves of one run.
pub fn compute_performance(record: &RunRecord) -> PerformanceMetrics {
    PerformanceMetrics::from_leaves(&record.leaves())
}

/// Everything an export renders: results, network activity and summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub generated_at: DateTime<Utc>,
    /// Wall-clock time of offset 0 for every `startMs`/`endMs` in the report.
    pub clock_origin: DateTime<Utc>,
    pub summary: PerformanceMetrics,
    pub network_stats: NetworkStats,
    pub network_calls: Vec<NetworkCallRecord>,
    pub test_results: Vec<RunRecord>,
}

impl PerformanceReport {
    pub fn build(
        clock_origin: DateTime<Utc>,
        test_results: Vec<RunRecord>,
        network_stats: NetworkStats,
        network_calls: Vec<NetworkCallRecord>,
    ) -> Self {
        let leaves: Vec<Leaf> = test_results.iter().flat_map(RunRecord::leaves).collect();
        Self {
            generated_at: Utc::now(),
            clock_origin,
            summary: PerformanceMetrics::from_leaves(&leaves),
            network_stats,
            network_calls,
            test_results,
        }
    }

    /// Wall-clock time of a clock offset.
    pub fn wall_time(&self, offset_ms: u64) -> DateTime<Utc> {
        self.clock_origin + chrono::Duration::milliseconds(offset_ms as i64)
    }
}
