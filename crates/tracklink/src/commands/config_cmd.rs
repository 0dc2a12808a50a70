//! Config subcommand handlers.

use std::collections::HashMap;

use dialoguer::{Input, Select};
use tracklink_core::PasswordEncoding;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Defaults, Profile};
use crate::error::CliError;
use crate::output;

const MASK: &str = "\"****\"";

/// TOML-ish view of the config with passwords and command secrets masked.
fn format_config_redacted(cfg: &Config) -> String {
    let mut lines = Vec::new();
    if let Some(default) = &cfg.default_profile {
        lines.push(format!("default_profile = {default:?}"));
        lines.push(String::new());
    }
    let d = &cfg.defaults;
    lines.extend([
        "[defaults]".to_owned(),
        format!("output = {:?}", d.output),
        format!("color = {:?}", d.color),
        format!("insecure = {}", d.insecure),
        format!("timeout = {}", d.timeout),
    ]);

    let mut names: Vec<&String> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let quoted = |key: &str, value: &str| format!("{key} = {value:?}");
        let fields = [
            Some(quoted("vendor_url", &p.vendor_url)),
            p.username.as_deref().map(|v| quoted("username", v)),
            p.password.as_ref().map(|_| format!("password = {MASK}")),
            p.password_env.as_deref().map(|v| quoted("password_env", v)),
            p.user_id.as_deref().map(|v| quoted("user_id", v)),
            p.command_secret.as_ref().map(|_| format!("command_secret = {MASK}")),
            p.command_secret_env.as_deref().map(|v| quoted("command_secret_env", v)),
            p.password_encoding
                .map(|e| quoted("password_encoding", encoding_name(e))),
            p.ca_cert
                .as_ref()
                .map(|v| quoted("ca_cert", &v.display().to_string())),
            p.insecure.map(|v| format!("insecure = {v}")),
            p.timeout.map(|v| format!("timeout = {v}")),
            p.store_path
                .as_ref()
                .map(|v| quoted("store_path", &v.display().to_string())),
        ];
        lines.push(String::new());
        lines.push(format!("[profiles.{name}]"));
        lines.extend(fields.into_iter().flatten());
    }

    lines.join("\n")
}

fn encoding_name(encoding: PasswordEncoding) -> &'static str {
    match encoding {
        PasswordEncoding::Md5Hex => "md5-hex",
        PasswordEncoding::Plain => "plain",
    }
}

fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_value<T: std::str::FromStr>(field: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("must be {expected}"),
    })
}

/// Apply `key = value` to a profile.
fn set_profile_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key.replace('-', "_").as_str() {
        "vendor_url" => {
            url::Url::parse(&value).map_err(|_| CliError::Validation {
                field: "vendor_url".into(),
                reason: format!("invalid URL: {value}"),
            })?;
            profile.vendor_url = value;
        }
        "username" => profile.username = Some(value),
        "password_env" => profile.password_env = Some(value),
        "user_id" => profile.user_id = Some(value),
        "command_secret_env" => profile.command_secret_env = Some(value),
        "password_encoding" => {
            profile.password_encoding = Some(match value.as_str() {
                "md5-hex" | "md5_hex" | "md5" => PasswordEncoding::Md5Hex,
                "plain" => PasswordEncoding::Plain,
                _ => {
                    return Err(CliError::Validation {
                        field: "password_encoding".into(),
                        reason: "must be 'md5-hex' or 'plain'".into(),
                    });
                }
            });
        }
        "ca_cert" => profile.ca_cert = Some(value.into()),
        "store_path" => profile.store_path = Some(value.into()),
        "insecure" => profile.insecure = Some(parse_value(key, &value, "'true' or 'false'")?),
        "timeout" => profile.timeout = Some(parse_value(key, &value, "a number (seconds)")?),
        "max_attempts" => {
            profile.max_attempts = Some(parse_value(key, &value, "a positive number")?);
        }
        "retry_base_delay_ms" => {
            profile.retry_base_delay_ms = Some(parse_value(key, &value, "a number (ms)")?);
        }
        "retry_jitter_ms" => {
            profile.retry_jitter_ms = Some(parse_value(key, &value, "a number (ms)")?);
        }
        "session_ttl_hours" => {
            profile.session_ttl_hours = Some(parse_value(key, &value, "a number (hours)")?);
        }
        "health_ttl_secs" => {
            profile.health_ttl_secs = Some(parse_value(key, &value, "a number (seconds)")?);
        }
        "online_window_secs" => {
            profile.online_window_secs = Some(parse_value(key, &value, "a number (seconds)")?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: vendor_url, username, \
                     password_env, user_id, command_secret_env, password_encoding, ca_cert, \
                     store_path, insecure, timeout, max_attempts, retry_base_delay_ms, \
                     retry_jitter_ms, session_ttl_hours, health_ttl_secs, online_window_secs"
                ),
            });
        }
    }
    Ok(())
}

/// Keyring or config file. Yields the password only when it must be
/// written into the profile.
fn prompt_password_storage(profile_name: &str, password: String) -> Result<Option<String>, CliError> {
    let keyring = Select::new()
        .with_prompt("Keep the vendor password in")
        .items(&["the OS keyring", "this config file, unencrypted"])
        .default(0)
        .interact()
        .map_err(prompt_err)?
        == 0;

    if !keyring {
        return Ok(Some(password));
    }
    tracklink_config::store_password(profile_name, &password)?;
    eprintln!("   keyring entry saved for '{profile_name}'");
    Ok(None)
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let out = output::render_single(&global.output, &cfg, format_config_redacted, |_| {
                "config".into()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_profile_key(profile, &key, value)?;
            config::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: tracklink config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        ConfigCommand::SetPassword { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }
            tracklink_config::store_password(&profile_name, &password)?;
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

/// Interactive wizard writing a fresh single-profile config.
fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("✨ tracklink configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let vendor_url: String = Input::new()
        .with_prompt("Vendor API URL")
        .default(tracklink_core::config::DEFAULT_VENDOR_URL.into())
        .validate_with(|input: &String| {
            url::Url::parse(input)
                .map(|_| ())
                .map_err(|e| format!("invalid URL: {e}"))
        })
        .interact_text()
        .map_err(prompt_err)?;

    let username: String = Input::new()
        .with_prompt("Vendor account name")
        .interact_text()
        .map_err(prompt_err)?;

    let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
    if username.trim().is_empty() || password.is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "account name and password cannot be empty".into(),
        });
    }
    let password_field = prompt_password_storage(&profile_name, password)?;

    let encodings = &["MD5 hex digest (most vendors)", "Plain text"];
    let encoding = Select::new()
        .with_prompt("How does the vendor expect the password?")
        .items(encodings)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let profile = Profile {
        vendor_url,
        username: Some(username),
        password: password_field,
        password_encoding: Some(if encoding == 0 {
            PasswordEncoding::Md5Hex
        } else {
            PasswordEncoding::Plain
        }),
        ..Profile::default()
    };

    let mut profiles = HashMap::new();
    profiles.insert(profile_name.clone(), profile);
    let cfg = Config {
        default_profile: Some(profile_name.clone()),
        defaults: Defaults::default(),
        profiles,
    };
    config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Next: tracklink login && tracklink devices list");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_accepts_dashed_keys() {
        let mut profile = Profile::default();
        set_profile_key(&mut profile, "password-encoding", "plain".into()).ok();
        set_profile_key(&mut profile, "session-ttl-hours", "12".into()).ok();
        assert_eq!(profile.password_encoding, Some(PasswordEncoding::Plain));
        assert_eq!(profile.session_ttl_hours, Some(12));
    }

    #[test]
    fn set_rejects_bad_values() {
        let mut profile = Profile::default();
        assert!(set_profile_key(&mut profile, "timeout", "soon".into()).is_err());
        assert!(set_profile_key(&mut profile, "vendor_url", "not a url".into()).is_err());
        assert!(set_profile_key(&mut profile, "token", "x".into()).is_err());
        assert_eq!(profile.timeout, None);
    }

    #[test]
    fn show_masks_secrets() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "fleet".into(),
            Profile {
                vendor_url: "https://api.tracker.example/open/api".into(),
                password: Some("hunter2".into()),
                command_secret: Some("s3cret".into()),
                ..Profile::default()
            },
        );
        let shown = format_config_redacted(&cfg);
        assert!(shown.contains("password = \"****\""));
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("s3cret"));
    }
}
