//! Aggregation Engine Error Hierarchy
//!
//! Errors are split by the boundary they cross. Configuration and construction
//! failures (including unknown actions and bad action settings) stop the
//! processor from being built at all; action failures at runtime are
//! contained by the synchronizer and only surface as metrics and log lines;
//! gate evaluation failures are handed back to the pipeline untouched.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

/// Result type returned by [`crate::AggregateAction`] callbacks.
pub type ActionResult<T> = std::result::Result<T, ActionError>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Gating predicate evaluation failures reported by the external evaluator
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    /// Reading input or writing output failed
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Metric registration failures
    #[error(transparent)]
    Metrics(#[from] prometheus::Error),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Failures raised by an aggregate action, either while it is being built
/// from settings or while it runs against a group.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// No constructor is registered under the requested name
    #[error("Unknown aggregate action: {0}")]
    UnknownAction(String),

    /// Action settings could not be bound to the action's config type
    #[error("Invalid settings for action {action}: {reason}")]
    InvalidSettings { action: String, reason: String },

    /// Generic processing failure inside an action callback
    #[error("Action processing failed: {0}")]
    Processing(String),
}

/// Failures reported by the gating predicate evaluator.
#[derive(Debug, thiserror::Error)]
pub enum ExpressionError {
    /// Expression text could not be parsed
    #[error("Invalid expression: {0}")]
    Invalid(String),

    /// Expression parsed but could not be evaluated against the event
    #[error("Failed to evaluate expression {expression}: {reason}")]
    Evaluation { expression: String, reason: String },
}

/// Building an action is part of validating the configuration, so
/// construction failures surface as configuration errors with the
/// [`ActionError`] kept as their source.
impl From<ActionError> for Error {
    fn from(error: ActionError) -> Self {
        Error::Config(ConfigError::Foreign(Box::new(error)))
    }
}

impl Error {
    /// Shorthand for a configuration validation failure with a message.
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError::Message(message.into()))
    }
}
