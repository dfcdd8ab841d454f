//! CLI error types.

use lr_config::ConfigError;
use lr_server::StartError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Server(#[from] StartError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}
