//! Configuration file management for terrareview.
//!
//! Provides a TOML-based config file at `~/.config/terrareview/config.toml`
//! and a resolution chain: CLI flag > env var > config file > default.

use std::num::NonZeroU64;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use terrareview_core::session::{DEFAULT_IDLE_TTL, SessionKey};
use terrareview_core::{MarkerSet, SummarizerConfig};

pub const BIND_ENV: &str = "TERRAREVIEW_BIND";
pub const PORT_ENV: &str = "TERRAREVIEW_PORT";
pub const UPLOAD_DIR_ENV: &str = "TERRAREVIEW_UPLOAD_DIR";
pub const SESSION_SECRET_ENV: &str = "TERRAREVIEW_SESSION_SECRET";
pub const BASE_URL_ENV: &str = "TERRAREVIEW_BASE_URL";
pub const MODEL_ENV: &str = "TERRAREVIEW_MODEL";

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub summarizer: SummarizerSection,
    /// Replaces the embedded marker set when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markers: Option<MarkerSet>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SessionSection {
    /// Hex-encoded cookie signing secret (64 hex chars = 32 bytes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SummarizerSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the terrareview config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/terrareview` or
/// `~/.config/terrareview`, also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("terrareview");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("terrareview")
}

/// Return the path to the terrareview config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file if it exists.
///
/// A missing file is `Ok(None)`; an unreadable or malformed one is an error.
pub fn load_config_if_present() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(path)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct ServeOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub upload_dir: Option<PathBuf>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct TerrareviewConfig {
    pub bind: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    /// `None` when no secret is configured; the server then signs cookies
    /// with an ephemeral key.
    pub session_key: Option<SessionKey>,
    pub idle_ttl: Duration,
    pub summarizer: SummarizerConfig,
    pub markers: MarkerSet,
}

impl TerrareviewConfig {
    /// Resolve against the config file on disk, if any.
    pub fn resolve(cli: &ServeOverrides) -> Result<Self> {
        Self::resolve_with(cli, load_config_if_present()?)
    }

    /// Resolve using the chain: CLI flag > env var > config file > default.
    ///
    /// The session secret and summarizer settings have no CLI flag and
    /// start at the env var.
    pub fn resolve_with(cli: &ServeOverrides, file: Option<ConfigFile>) -> Result<Self> {
        let file = file.unwrap_or_default();

        let bind = cli
            .bind
            .clone()
            .or_else(|| env_var(BIND_ENV))
            .or(file.server.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let port = match (cli.port, env_var(PORT_ENV)) {
            (Some(port), _) => port,
            (None, Some(raw)) => raw
                .parse()
                .with_context(|| format!("{PORT_ENV} is not a valid port: {raw:?}"))?,
            (None, None) => file.server.port.unwrap_or(DEFAULT_PORT),
        };

        let upload_dir = cli
            .upload_dir
            .clone()
            .or_else(|| env_var(UPLOAD_DIR_ENV).map(PathBuf::from))
            .or(file.server.upload_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR));

        let session_key = if let Some(secret_hex) = env_var(SESSION_SECRET_ENV) {
            let key = SessionKey::from_hex(&secret_hex)
                .with_context(|| format!("{SESSION_SECRET_ENV} is not a valid session secret"))?;
            Some(key)
        } else if let Some(secret_hex) = file.session.secret.as_deref() {
            let key = SessionKey::from_hex(secret_hex)
                .context("invalid session.secret in config file")?;
            Some(key)
        } else {
            None
        };

        let idle_ttl = file
            .session
            .idle_ttl_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_IDLE_TTL);

        let defaults = SummarizerConfig::default();
        let request_timeout = match file.summarizer.timeout_secs {
            Some(secs) => {
                let secs = NonZeroU64::new(secs)
                    .context("summarizer.timeout_secs must be greater than zero")?;
                Duration::from_secs(secs.get())
            }
            None => defaults.request_timeout,
        };
        let summarizer = SummarizerConfig {
            base_url: env_var(BASE_URL_ENV)
                .or(file.summarizer.base_url)
                .unwrap_or(defaults.base_url),
            model: env_var(MODEL_ENV)
                .or(file.summarizer.model)
                .unwrap_or(defaults.model),
            request_timeout,
        };

        let markers = match file.markers {
            Some(markers) => {
                markers
                    .validate()
                    .context("invalid [markers] section in config file")?;
                markers
            }
            None => MarkerSet::default(),
        };

        Ok(Self {
            bind,
            port,
            upload_dir,
            session_key,
            idle_ttl,
            summarizer,
            markers,
        })
    }
}

/// A set, non-blank environment variable.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
