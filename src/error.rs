//! Error types for Toolgate.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    #[error("Tool error: {0}")]
    Tool(#[from] crate::tools::ToolError),

    #[error("Approval error: {0}")]
    Approval(#[from] ApprovalError),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("Hook error: {0}")]
    Hook(#[from] crate::hooks::HookError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Failed to load policy from {path}: {source}")]
    PolicyFile {
        path: String,
        #[source]
        source: PolicyError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or validating a policy table.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("Rule #{index} ({name}) is invalid: {reason}")]
    InvalidRule {
        index: usize,
        name: String,
        reason: String,
    },

    #[error("Duplicate rule name: {0}")]
    DuplicateRule(String),

    #[error("Invalid policy document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while a rule predicate is evaluated.
///
/// What these mean for the decision depends on the table's
/// [`PredicateFailureMode`](crate::policy::PredicateFailureMode).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredicateError {
    #[error("missing parameter '{param}'")]
    MissingParameter { param: String },

    #[error("parameter '{param}' should be a {expected}, got {found}")]
    TypeMismatch {
        param: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("predicate failed: {0}")]
    Failed(String),
}

/// Errors raised while building [`Parameters`](crate::policy::Parameters) from JSON.
#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("tool arguments must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("parameter '{name}' has unsupported type {kind} (expected string, number or boolean)")]
    UnsupportedValue { name: String, kind: &'static str },

    #[error("invalid parameter '{0}': expected key=value")]
    Malformed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Human-approval channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error("Approval channel closed before a response was received")]
    ChannelClosed,

    #[error("Failed to read approval response: {0}")]
    Io(#[from] std::io::Error),
}

/// Audit sink errors.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Failed to write audit record: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize audit record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{failed} of {total} audit sinks failed")]
    Partial { failed: usize, total: usize },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
