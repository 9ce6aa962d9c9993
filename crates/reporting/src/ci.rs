//! CI session summary and trigger policy. Delivering the summary to a chat
//! or webhook channel is left to the caller.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use webprobe_core::config::CiConfig;
use webprobe_core::{ExecutionStatus, Timing};
use webprobe_suite::SuiteResult;

/// All suites run against one page in one environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CiSession {
    pub session_id: Uuid,
    pub url: String,
    pub environment: String,
    pub status: ExecutionStatus,
    #[serde(flatten)]
    pub timing: Timing,
    pub suites: Vec<SuiteResult>,
}

impl CiSession {
    pub fn total_tests(&self) -> usize {
        self.suites.iter().map(|s| s.cases.len()).sum()
    }

    pub fn failed_tests(&self) -> usize {
        self.suites.iter().map(SuiteResult::failed).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Success,
    Failure,
}

/// Pass/fail summary handed to notification channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSummary {
    pub status: NotificationStatus,
    pub environment: String,
    pub url: String,
    pub duration_ms: u64,
    pub total_tests: usize,
    pub failed_tests: usize,
}

impl NotificationSummary {
    pub fn from_session(session: &CiSession) -> Self {
        let failed_tests = session.failed_tests();
        let status = if session.status == ExecutionStatus::Completed && failed_tests == 0 {
            NotificationStatus::Success
        } else {
            NotificationStatus::Failure
        };
        Self {
            status,
            environment: session.environment.clone(),
            url: session.url.clone(),
            duration_ms: session.timing.duration_ms,
            total_tests: session.total_tests(),
            failed_tests,
        }
    }
}

/// Whether an automatic CI run should start for `url`.
pub fn should_trigger(url: &str, ci: &CiConfig) -> bool {
    if url.is_empty() || url.starts_with("chrome://") || url.starts_with("edge://") {
        return false;
    }
    ci.environment == "production" || ci.trigger_patterns.iter().any(|p| url.contains(p.as_str()))
}
