//! CLI error types.

use tikz_config::ConfigError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("{count} block(s) failed to render")]
    BlocksFailed { count: usize },
}
