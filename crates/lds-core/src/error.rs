//! Error types for lds-core
//!
//! Centralized error handling using `thiserror` for ergonomic error definitions.

use thiserror::Error;

/// Main error type for lds-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Network failure or timeout talking to a remote endpoint
    #[error("Request to {url} failed: {source}")]
    Transport {
        /// URL of the failed request
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// Remote endpoint answered with a non-2xx status
    #[error("Request to {url} returned HTTP {status}")]
    Status {
        /// URL of the failed request
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Response payload did not have the expected shape
    #[error("Malformed response from {url}: {message}")]
    Format {
        /// URL the payload came from
        url: String,
        /// Decoder message
        message: String,
    },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file
        path: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// Duration string could not be parsed
    #[error("Invalid duration '{input}': {message}")]
    InvalidInterval {
        /// The rejected input
        input: String,
        /// Why it was rejected
        message: String,
    },

    /// A synchronization stage failed
    #[error("{step}: {source}")]
    Step {
        /// Name of the stage that failed
        step: &'static str,
        /// The stage's error
        #[source]
        source: Box<Error>,
    },

    /// The pass was cancelled before it completed
    #[error("Synchronization cancelled")]
    Cancelled,

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a transport error for `url`
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    /// Create a format error for `url`
    pub fn format(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a config value error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Wrap an error with the name of the stage it came from
    pub fn step(step: &'static str, source: Error) -> Self {
        Self::Step {
            step,
            source: Box::new(source),
        }
    }

    /// Innermost error, looking through stage wrappers
    pub fn root(&self) -> &Error {
        match self {
            Self::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this is a network or HTTP status failure
    pub fn is_transport(&self) -> bool {
        matches!(self.root(), Self::Transport { .. } | Self::Status { .. })
    }

    /// Whether the pass was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled)
    }
}
