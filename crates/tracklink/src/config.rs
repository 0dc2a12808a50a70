//! CLI configuration -- thin wrapper around `tracklink_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--vendor-url, --insecure, --timeout).

use std::path::PathBuf;
use std::time::Duration;

use tracklink_core::{TlsVerification, TrackerConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use tracklink_config::{
    Config, Defaults, Profile, config_path, load_config_or_default, save_config,
};

/// Everything a vendor-bound command needs to build a tracker.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub profile: Profile,
    pub tracker: TrackerConfig,
    pub store_path: PathBuf,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names for help text.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort_unstable();
    names.join(", ")
}

/// Load the active profile and translate it into a `TrackerConfig`.
///
/// Without a profile, `--vendor-url` alone is enough to build an
/// ephemeral one. CLI flag overrides take priority over profile values.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None => {
            let Some(url) = global.vendor_url.clone() else {
                if cfg.profiles.is_empty() {
                    return Err(CliError::NoConfig {
                        path: config_path().display().to_string(),
                    });
                }
                return Err(CliError::ProfileNotFound {
                    name: profile_name,
                    available: available_profiles(&cfg),
                });
            };
            Profile {
                vendor_url: url,
                ..Profile::default()
            }
        }
    };

    let mut tracker = tracklink_config::profile_to_tracker_config(&profile, &profile_name)?;

    // 1. Vendor URL (flag > env > profile)
    if let Some(ref url_str) = global.vendor_url {
        tracker.vendor_url = url_str.parse().map_err(|_| CliError::Validation {
            field: "vendor_url".into(),
            reason: format!("invalid URL: {url_str}"),
        })?;
    }

    // 2. TLS verification
    if global.insecure || (profile.insecure.is_none() && cfg.defaults.insecure) {
        tracker.tls = TlsVerification::DangerAcceptInvalid;
    }

    // 3. Timeout (flag > profile > defaults)
    let timeout = global
        .timeout
        .or(profile.timeout)
        .unwrap_or(cfg.defaults.timeout);
    tracker.timeout = Duration::from_secs(timeout);

    let store_path = tracklink_config::store_path(&profile, &profile_name);
    Ok(Resolved {
        profile_name,
        profile,
        tracker,
        store_path,
    })
}
