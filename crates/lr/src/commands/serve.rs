//! `lr serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use lr_config::{CliSettings, Config};
use lr_server::{Server, server_config_from_lr_config, shutdown_signal};

use crate::browser;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover lr.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to serve and watch (overrides config).
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long, env = "LR_HOST")]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long, env = "LR_PORT")]
    port: Option<u16>,

    /// Per-path debounce window in milliseconds, 0 disables (overrides config).
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Disable live reload.
    #[arg(long)]
    no_live_reload: bool,

    /// Do not open a browser on startup.
    #[arg(long)]
    no_open: bool,

    /// Enable verbose output (request and reload logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = self.cli_settings();
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let server = Server::bind(server_config_from_lr_config(&config)).await?;
        let url = server.url();

        output.serving(
            &url,
            &config.serve_resolved.root_dir,
            config.live_reload.enabled,
        );

        if config.server.open_browser {
            let opener = browser::system_opener();
            browser::open_best_effort(opener.as_deref(), &url);
        }

        server.run(shutdown_signal()).await?;
        Ok(())
    }

    /// Build config overrides from the command line flags.
    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            host: self.host.clone(),
            port: self.port,
            root_dir: self.root.clone(),
            live_reload_enabled: self.no_live_reload.then_some(false),
            open_browser: self.no_open.then_some(false),
            debounce_ms: self.debounce_ms,
        }
    }
}
