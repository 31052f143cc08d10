//! Error types for the CLI

use async_patterns::ConfigError;
use core_types::AsyncError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The event loop failed while driving a run
    #[error("{run} failed: {source}")]
    Runtime {
        /// Name of the run
        run: String,
        /// Error returned by the loop
        #[source]
        source: AsyncError,
    },

    /// Reports could not be rendered as JSON
    #[error("failed to render reports: {0}")]
    Render(#[from] serde_json::Error),

    /// Reports could not be rendered as text
    #[error("failed to render reports: {0}")]
    Text(#[from] std::fmt::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
