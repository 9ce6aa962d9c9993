use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    #[error("Unknown step type: {0}")]
    UnknownStepType(String),

    #[error("Unknown validation type: {0}")]
    UnknownValidationType(String),

    #[error("Element not found within {timeout_ms}ms: {selector}")]
    ElementNotFound { selector: String, timeout_ms: u64 },

    #[error("{message}")]
    ValidationMismatch {
        message: String,
        expected: String,
        actual: String,
    },

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Custom action failed: {0}")]
    Action(String),

    #[error("Element tree error: {0}")]
    Adapter(String),

    #[error("Target detached: {0}")]
    TargetDetached(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            name: name.into(),
        }
    }

    pub fn element(selector: impl Into<String>) -> Self {
        Self::not_found("Element", selector)
    }

    pub fn mismatch(
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ValidationMismatch {
            message: message.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Orchestration faults abort a sequence regardless of its failure policy.
    pub fn is_orchestration_fault(&self) -> bool {
        matches!(self, Self::TargetDetached(_) | Self::Internal(_))
    }

    /// Stable machine-readable kind, used in result error records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::UnknownStepType(_) => "unknown_step_type",
            Self::UnknownValidationType(_) => "unknown_validation_type",
            Self::ElementNotFound { .. } => "element_not_found",
            Self::ValidationMismatch { .. } => "validation_mismatch",
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::Action(_) => "action",
            Self::Adapter(_) => "adapter",
            Self::TargetDetached(_) => "target_detached",
            Self::Config(_) => "config",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
            Self::Internal(_) => "internal",
        }
    }
}
