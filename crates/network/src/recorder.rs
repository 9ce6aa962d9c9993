//! Append-only log of outbound calls with timing and outcome.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use webprobe_core::EngineClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallKind {
    /// Future-returning executor.
    Simple,
    /// Executor that reports completion through a callback.
    CallbackBased,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkCallRecord {
    pub method: String,
    pub url: String,
    pub kind: CallKind,
    pub start_ms: u64,
    pub end_ms: u64,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Transport-level success: a 2xx response was received.
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub average_duration: f64,
}

/// A call that has been issued but not yet settled.
#[derive(Debug, Clone)]
pub struct InFlightCall {
    method: String,
    url: String,
    kind: CallKind,
    start_ms: u64,
}

/// How a call settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Response { status: u16 },
    Error(String),
}

#[derive(Debug)]
pub struct NetworkCallRecorder {
    clock: EngineClock,
    calls: Mutex<Vec<NetworkCallRecord>>,
}

impl NetworkCallRecorder {
    pub fn new(clock: EngineClock) -> Self {
        Self {
            clock,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Note the start of a call. Nothing is logged until it settles.
    pub fn begin(&self, method: &str, url: &str, kind: CallKind) -> InFlightCall {
        InFlightCall {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            kind,
            start_ms: self.clock.now_ms(),
        }
    }

    /// Settle an in-flight call and append its record.
    pub fn finish(&self, call: InFlightCall, outcome: CallOutcome) -> NetworkCallRecord {
        let end_ms = self.clock.now_ms().max(call.start_ms);
        let (status_code, success, error) = match outcome {
            CallOutcome::Response { status } => (Some(status), (200..300).contains(&status), None),
            CallOutcome::Error(message) => (None, false, Some(message)),
        };
        let record = NetworkCallRecord {
            method: call.method,
            url: call.url,
            kind: call.kind,
            start_ms: call.start_ms,
            end_ms,
            duration_ms: end_ms - call.start_ms,
            status_code,
            success,
            error,
        };
        debug!(
            method = %record.method,
            url = %record.url,
            status = ?record.status_code,
            duration_ms = record.duration_ms,
            "Network call recorded"
        );
        self.calls.lock().push(record.clone());
        record
    }

    pub fn calls(&self) -> Vec<NetworkCallRecord> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn stats(&self) -> NetworkStats {
        let calls = self.calls.lock();
        let total = calls.len();
        let successful = calls.iter().filter(|c| c.success).count();
        let average_duration = if total == 0 {
            0.0
        } else {
            calls.iter().map(|c| c.duration_ms as f64).sum::<f64>() / total as f64
        };
        NetworkStats {
            total,
            successful,
            failed: total - successful,
            average_duration,
        }
    }
}
