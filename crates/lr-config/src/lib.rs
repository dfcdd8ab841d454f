//! Configuration management for lr.
//!
//! Parses `lr.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `serve.root_dir`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override served root directory.
    pub root_dir: Option<PathBuf>,
    /// Override live reload enabled flag.
    pub live_reload_enabled: Option<bool>,
    /// Override browser launch on startup.
    pub open_browser: Option<bool>,
    /// Override per-path debounce window.
    pub debounce_ms: Option<u64>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "lr.toml";

/// Default served root, relative to the config directory.
const DEFAULT_ROOT_DIR: &str = "public";

/// Default index document for directory requests.
const DEFAULT_INDEX: &str = "index.html";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Served root configuration (paths are relative strings from TOML).
    serve: ServeConfigRaw,
    /// Live reload configuration.
    pub live_reload: LiveReloadConfig,

    /// Resolved served root configuration (set after loading).
    #[serde(skip)]
    pub serve_resolved: ServeConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Open the served URL in the default browser once listening.
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            open_browser: true,
        }
    }
}

/// Raw serve configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ServeConfigRaw {
    root_dir: Option<String>,
    index: Option<String>,
}

/// Resolved serve configuration with an absolute root.
#[derive(Debug, Default)]
pub struct ServeConfig {
    /// Directory whose contents are served and watched.
    pub root_dir: PathBuf,
    /// File served for `/` and for directory requests.
    pub index: String,
}

/// Filesystem change kinds that may trigger a reload.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReloadOn {
    /// A file or directory was created.
    Create,
    /// A file's content or metadata changed.
    Modify,
    /// A file or directory was removed.
    Remove,
}

/// Live reload configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LiveReloadConfig {
    /// Whether live reload is enabled.
    pub enabled: bool,
    /// Glob patterns (relative to the served root) to watch. Empty watches everything.
    pub watch_patterns: Vec<String>,
    /// Change kinds that trigger a reload.
    pub reload_on: Vec<ReloadOn>,
    /// Per-path debounce window in milliseconds. `0` disables debouncing.
    pub debounce_ms: u64,
    /// Capacity of the watcher-to-coordinator event queue.
    pub queue_capacity: usize,
}

impl Default for LiveReloadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            watch_patterns: Vec::new(),
            reload_on: vec![ReloadOn::Modify],
            debounce_ms: 0,
            queue_capacity: 256,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`LR_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `lr.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values. The result is
    /// validated again afterwards so overrides cannot bypass validation.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails, or
    /// the final configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(root_dir) = &settings.root_dir {
            // Relative CLI paths are relative to where the command was run
            self.serve_resolved.root_dir =
                std::path::absolute(root_dir).unwrap_or_else(|_| root_dir.clone());
        }
        if let Some(enabled) = settings.live_reload_enabled {
            self.live_reload.enabled = enabled;
        }
        if let Some(open_browser) = settings.open_browser {
            self.server.open_browser = open_browser;
        }
        if let Some(debounce_ms) = settings.debounce_ms {
            self.live_reload.debounce_ms = debounce_ms;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            serve: ServeConfigRaw::default(),
            live_reload: LiveReloadConfig::default(),
            serve_resolved: ServeConfig {
                root_dir: base.join(DEFAULT_ROOT_DIR),
                index: DEFAULT_INDEX.to_owned(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let config_dir = std::path::absolute(&config_dir).unwrap_or(config_dir);
        config.resolve_paths(&config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_serve()?;
        self.validate_live_reload()?;
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 is technically valid (OS assigns a random port), but the
        // browser URL and startup banner need a known port
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Validate serve configuration.
    fn validate_serve(&self) -> Result<(), ConfigError> {
        let index = &self.serve_resolved.index;
        require_non_empty(index, "serve.index")?;
        if index.contains(['/', '\\']) || index == ".." || index == "." {
            return Err(ConfigError::Validation(
                "serve.index must be a plain file name".to_owned(),
            ));
        }
        Ok(())
    }

    /// Validate live reload configuration.
    fn validate_live_reload(&self) -> Result<(), ConfigError> {
        if self.live_reload.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "live_reload.queue_capacity must be greater than 0".to_owned(),
            ));
        }
        if self.live_reload.enabled && self.live_reload.reload_on.is_empty() {
            return Err(ConfigError::Validation(
                "live_reload.reload_on cannot be empty when live reload is enabled".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        if let Some(ref root_dir) = self.serve.root_dir {
            self.serve.root_dir = Some(expand::expand_env(root_dir, "serve.root_dir")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.serve_resolved = ServeConfig {
            root_dir: config_dir.join(self.serve.root_dir.as_deref().unwrap_or(DEFAULT_ROOT_DIR)),
            index: self
                .serve
                .index
                .clone()
                .unwrap_or_else(|| DEFAULT_INDEX.to_owned()),
        };
    }
}
