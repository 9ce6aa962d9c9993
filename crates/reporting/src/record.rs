//! Run records — the heterogeneous entries of the results log, and their
//! flattening into leaf rows.

use serde::{Deserialize, Serialize};
use webprobe_core::{ExecutionStatus, Timing};
use webprobe_interaction::{FormInteractionResult, SequenceResult};
use webprobe_suite::SuiteResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RunRecord {
    Sequence(SequenceResult),
    Suite(SuiteResult),
    FormInteraction(FormInteractionResult),
}

impl From<SequenceResult> for RunRecord {
    fn from(result: SequenceResult) -> Self {
        Self::Sequence(result)
    }
}

impl From<SuiteResult> for RunRecord {
    fn from(result: SuiteResult) -> Self {
        Self::Suite(result)
    }
}

impl From<FormInteractionResult> for RunRecord {
    fn from(result: FormInteractionResult) -> Self {
        Self::FormInteraction(result)
    }
}

/// One step or test case, normalized for tabular output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub name: String,
    pub status: &'static str,
    pub timing: Timing,
    /// Error messages, `; `-joined.
    pub errors: String,
}

impl Leaf {
    pub fn is_completed(&self) -> bool {
        self.status == ExecutionStatus::Completed.as_str()
    }

    pub fn is_failed(&self) -> bool {
        self.status == ExecutionStatus::Failed.as_str()
    }
}

impl RunRecord {
    /// Display title: suite name, sequence name or form selector.
    pub fn title(&self) -> &str {
        match self {
            Self::Sequence(r) => &r.sequence_name,
            Self::Suite(r) => &r.suite_name,
            Self::FormInteraction(r) => &r.form_selector,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sequence(_) => "sequence",
            Self::Suite(_) => "suite",
            Self::FormInteraction(_) => "formInteraction",
        }
    }

    pub fn status(&self) -> ExecutionStatus {
        match self {
            Self::Sequence(r) => r.status,
            Self::Suite(r) => r.status,
            Self::FormInteraction(r) => r.status,
        }
    }

    pub fn timing(&self) -> Timing {
        match self {
            Self::Sequence(r) => r.timing,
            Self::Suite(r) => r.timing,
            Self::FormInteraction(r) => r.timing,
        }
    }

    /// Record-level error messages (not those of individual leaves).
    pub fn errors(&self) -> Vec<String> {
        match self {
            Self::Sequence(r) => r.errors.iter().map(|e| e.message.clone()).collect(),
            Self::Suite(_) => Vec::new(),
            Self::FormInteraction(r) => r.errors.iter().map(|e| e.message.clone()).collect(),
        }
    }

    pub fn leaves(&self) -> Vec<Leaf> {
        match self {
            Self::Sequence(r) => r
                .steps
                .iter()
                .map(|s| Leaf {
                    name: s.name.clone(),
                    status: s.status.as_str(),
                    timing: s.timing,
                    errors: s.error.as_ref().map(|e| e.message.clone()).unwrap_or_default(),
                })
                .collect(),
            Self::Suite(r) => r
                .cases
                .iter()
                .map(|c| Leaf {
                    name: c.name.clone(),
                    status: c.status.as_str(),
                    timing: c.timing,
                    errors: c.error.clone().unwrap_or_default(),
                })
                .collect(),
            Self::FormInteraction(r) => r
                .steps
                .iter()
                .map(|s| Leaf {
                    name: s.name.clone(),
                    status: s.status.as_str(),
                    timing: s.timing,
                    errors: s.errors.join("; "),
                })
                .collect(),
        }
    }
}
