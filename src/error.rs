//! Typed errors for conditions callers match on.

use thiserror::Error;

/// Failure modes with meaning beyond their message. Everything else
/// travels as `anyhow::Error` with context attached.
#[derive(Error, Debug)]
pub enum HostsmithError {
    /// No known release file matched, so the host cannot be classified.
    #[error("unsupported platform on {0}")]
    UnsupportedPlatform(String),

    /// Recipe name without a registered constructor.
    #[error("unknown recipe '{name}' (known recipes: {known})")]
    UnknownRecipe { name: String, known: String },

    /// A rule field value that cannot be rendered into option tokens.
    #[error("invalid value for rule field '{field}': {reason}")]
    InvalidRuleValue { field: String, reason: String },

    /// An ip-version entry other than 4 or 6.
    #[error("invalid ip-version {0} (expected 4 or 6)")]
    InvalidIpVersion(String),

    /// Structurally malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
