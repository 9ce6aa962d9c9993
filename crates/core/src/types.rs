use std::error::Error as StdError;

use serde::{Deserialize, Serialize};

use crate::clock::EngineClock;
use crate::error::EngineError;

/// Lifecycle of an executed step, sequence, suite or test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Transitions only move forward: pending → running → terminal.
    pub fn can_transition_to(self, next: ExecutionStatus) -> bool {
        match (self, next) {
            (Self::Pending, Self::Running) => true,
            (Self::Pending | Self::Running, Self::Completed | Self::Failed) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start/end offsets from the engine clock. `duration_ms` is always
/// `end_ms - start_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub start_ms: u64,
    pub end_ms: u64,
    pub duration_ms: u64,
}

impl Timing {
    pub fn between(start_ms: u64, end_ms: u64) -> Self {
        let end_ms = end_ms.max(start_ms);
        Self {
            start_ms,
            end_ms,
            duration_ms: end_ms - start_ms,
        }
    }

    pub fn since(clock: &EngineClock, start_ms: u64) -> Self {
        Self::between(start_ms, clock.now_ms())
    }
}

/// A captured failure: message plus a trace of its cause chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

impl ErrorRecord {
    pub fn from_error(err: &EngineError) -> Self {
        Self {
            message: err.to_string(),
            kind: err.kind().to_string(),
            trace: cause_chain(err),
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Self {
            message: err.to_string(),
            kind: "case".to_string(),
            trace: err.chain().skip(1).map(|c| c.to_string()).collect(),
        }
    }

    pub fn message(kind: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: kind.to_string(),
            trace: Vec::new(),
        }
    }
}

fn cause_chain(err: &(dyn StdError + 'static)) -> Vec<String> {
    let mut trace = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        trace.push(cause.to_string());
        source = cause.source();
    }
    trace
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_are_monotonic() {
        use ExecutionStatus::*;
        assert!(Pending.can_transition_to(Running));
        assert!(Running.can_transition_to(Completed));
        assert!(Running.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Running));
        assert!(!Running.can_transition_to(Pending));
    }

    #[test]
    fn test_timing_never_negative() {
        let t = Timing::between(120, 100);
        assert_eq!(t.duration_ms, 0);
        assert_eq!(t.end_ms - t.start_ms, t.duration_ms);

        let t = Timing::between(100, 175);
        assert_eq!(t.duration_ms, 75);
    }

    #[test]
    fn test_error_record_trace() {
        let inner = anyhow::anyhow!("socket reset");
        let err = EngineError::Internal(inner.context("fetch failed"));
        let record = ErrorRecord::from_error(&err);
        assert_eq!(record.kind, "internal");
        assert!(record.message.contains("fetch failed"));
    }
}
