//! Shared configuration for tracklink tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `tracklink_core::TrackerConfig`. The CLI layers its
//! flag overrides on top of what this crate resolves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tracklink_core::{PasswordEncoding, RetrySettings, TlsVerification, TrackerConfig};

/// Keyring service name for stored secrets.
pub const KEYRING_SERVICE: &str = "tracklink";

/// Environment prefix for config overrides (`TRACKLINK_DEFAULTS__TIMEOUT=5`).
pub const ENV_PREFIX: &str = "TRACKLINK_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("cannot write config as TOML: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("cannot read config: {0}")]
    Figment(Box<figment::Error>),

    #[error("config file I/O: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is absent.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named vendor profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Per-attempt request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named vendor account profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Vendor action endpoint (e.g., "https://api.tracker.example/open/api").
    pub vendor_url: String,

    /// Vendor account name.
    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or `password_env`).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Application user that owns the session. Defaults to the profile name.
    pub user_id: Option<String>,

    /// Command channel secret (plaintext -- prefer keyring).
    pub command_secret: Option<String>,

    /// Environment variable name containing the command secret.
    pub command_secret_env: Option<String>,

    /// `md5-hex` (default) or `plain`.
    pub password_encoding: Option<PasswordEncoding>,

    /// Extra PEM CA to trust for the vendor endpoint.
    pub ca_cert: Option<PathBuf>,

    /// Skip certificate verification for this vendor.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    pub max_attempts: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
    pub retry_jitter_ms: Option<u64>,

    /// Session lifetime when the vendor reports none.
    pub session_ttl_hours: Option<u64>,
    pub health_ttl_secs: Option<u64>,
    pub online_window_secs: Option<u64>,

    /// Record store file. Defaults to `<data dir>/<profile>.json`.
    pub store_path: Option<PathBuf>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "tracklink", "tracklink")
}

/// Environment variable that points at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "TRACKLINK_CONFIG";

/// Resolve the config file path: `TRACKLINK_CONFIG`, then XDG / platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory for record store files.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

fn home_fallback(sub: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(sub);
    p.push("tracklink");
    p
}

/// Where a profile's record store lives.
pub fn store_path(profile: &Profile, profile_name: &str) -> PathBuf {
    profile
        .store_path
        .clone()
        .unwrap_or_else(|| data_dir().join(format!("{profile_name}.json")))
}

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing file is fine) layered under `TRACKLINK_*`
/// environment overrides. Nested keys use `__`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::prefixed(ENV_PREFIX)
                .ignore(&["USERNAME", "PASSWORD", "PROFILE", "LOG", "CONFIG"])
                .split("__"),
        );

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Write `cfg` to [`config_path`], creating parent directories.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

impl Config {
    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

// ── Secrets ─────────────────────────────────────────────────────────

fn keyring_entry(profile_name: &str, what: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/{what}"),
    )?)
}

/// Resolve the vendor username: profile, then `TRACKLINK_USERNAME`.
pub fn resolve_username(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .username
        .clone()
        .or_else(|| std::env::var("TRACKLINK_USERNAME").ok())
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Resolve the vendor password from the credential chain.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Well-known env var
    if let Ok(pw) = std::env::var("TRACKLINK_PASSWORD") {
        return Ok(SecretString::from(pw));
    }

    // 3. System keyring
    if let Ok(entry) = keyring_entry(profile_name, "password") {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 4. profile.password
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Resolve the command channel secret; empty when none is configured.
pub fn resolve_command_secret(profile: &Profile, profile_name: &str) -> SecretString {
    if let Some(ref env_name) = profile.command_secret_env {
        if let Ok(val) = std::env::var(env_name) {
            return SecretString::from(val);
        }
    }

    if let Ok(entry) = keyring_entry(profile_name, "command-secret") {
        if let Ok(secret) = entry.get_password() {
            return SecretString::from(secret);
        }
    }

    SecretString::from(profile.command_secret.clone().unwrap_or_default())
}

/// Store the vendor password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name, "password")?.set_password(password)?;
    Ok(())
}

// ── Profile → TrackerConfig ─────────────────────────────────────────

/// Build a `TrackerConfig` from a profile -- no CLI flag overrides.
pub fn profile_to_tracker_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<TrackerConfig, ConfigError> {
    let vendor_url: url::Url = profile
        .vendor_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "vendor_url".into(),
            reason: format!("invalid URL: {}", profile.vendor_url),
        })?;

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let max_attempts = profile.max_attempts.unwrap_or(3);
    if max_attempts == 0 {
        return Err(ConfigError::Validation {
            field: "max_attempts".into(),
            reason: "must be at least 1".into(),
        });
    }

    let defaults = TrackerConfig::default();
    Ok(TrackerConfig {
        vendor_url,
        user_id: profile
            .user_id
            .clone()
            .unwrap_or_else(|| profile_name.to_owned()),
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(30)),
        retry: RetrySettings {
            max_attempts,
            base_delay: Duration::from_millis(profile.retry_base_delay_ms.unwrap_or(1_000)),
            max_jitter: Duration::from_millis(profile.retry_jitter_ms.unwrap_or(0)),
        },
        password_encoding: profile.password_encoding.unwrap_or_default(),
        command_secret: resolve_command_secret(profile, profile_name),
        session_ttl: profile
            .session_ttl_hours
            .map_or(defaults.session_ttl, |h| Duration::from_secs(h * 3600)),
        health_ttl: profile
            .health_ttl_secs
            .map_or(defaults.health_ttl, Duration::from_secs),
        online_window: profile
            .online_window_secs
            .map_or(defaults.online_window, Duration::from_secs),
    })
}
