//! Login, logout, and session display.

use std::io::BufRead;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;

use tracklink_config::ConfigError;
use tracklink_core::Session;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::error::CliError;
use crate::output;

use super::Context;

/// Session as shown to the user. Never carries the token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView {
    profile: String,
    state: String,
    user_id: Option<String>,
    vendor_username: Option<String>,
    created_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    remaining: Option<String>,
}

impl SessionView {
    fn new(ctx: &Context, session: Option<&Session>) -> Self {
        let now = Utc::now();
        Self {
            profile: ctx.profile_name.clone(),
            state: ctx.tracker.session_state().to_string(),
            user_id: session.map(|s| s.user_id.clone()),
            vendor_username: session.map(|s| s.vendor_username.clone()),
            created_at: session.map(|s| s.created_at),
            expires_at: session.map(|s| s.expires_at),
            remaining: session
                .filter(|s| s.is_valid_at(now))
                .map(|s| format_remaining(s.remaining_at(now))),
        }
    }
}

/// Whole-second remaining lifetime, e.g. "23h 59m 58s".
fn format_remaining(remaining: chrono::Duration) -> String {
    let secs = u64::try_from(remaining.num_seconds()).unwrap_or(0);
    humantime::format_duration(std::time::Duration::from_secs(secs)).to_string()
}

fn detail(v: &SessionView) -> String {
    let dash = || "-".to_owned();
    [
        format!("Profile:  {}", v.profile),
        format!("State:    {}", v.state),
        format!("User:     {}", v.user_id.clone().unwrap_or_else(dash)),
        format!("Account:  {}", v.vendor_username.clone().unwrap_or_else(dash)),
        format!(
            "Created:  {}",
            v.created_at.map_or_else(dash, |t| t.to_rfc3339())
        ),
        format!(
            "Expires:  {}",
            v.expires_at.map_or_else(dash, |t| t.to_rfc3339())
        ),
        format!("Remaining: {}", v.remaining.clone().unwrap_or_else(dash)),
    ]
    .join("\n")
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn login(ctx: &Context, args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let username = match args.username {
        Some(username) => username,
        None => tracklink_config::resolve_username(&ctx.profile, &ctx.profile_name)?,
    };

    let password = if args.password_stdin {
        read_password_stdin()?
    } else {
        match tracklink_config::resolve_password(&ctx.profile, &ctx.profile_name) {
            Ok(password) => password,
            Err(ConfigError::NoCredentials { .. }) => prompt_password(&username)?,
            Err(e) => return Err(e.into()),
        }
    };

    let session = ctx.tracker.authenticate(&username, &password).await?;

    if !global.quiet {
        eprintln!(
            "✓ Logged in as '{}' (profile '{}'), session valid for {}",
            session.vendor_username,
            ctx.profile_name,
            format_remaining(session.remaining_at(Utc::now()))
        );
    }
    Ok(())
}

pub async fn logout(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let had_session = ctx.tracker.session().is_some();
    ctx.tracker.logout().await;

    if !global.quiet {
        if had_session {
            eprintln!("✓ Logged out of profile '{}'", ctx.profile_name);
        } else {
            eprintln!("No active session for profile '{}'", ctx.profile_name);
        }
    }
    Ok(())
}

pub fn show(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let session = ctx.tracker.session();
    let view = SessionView::new(ctx, session.as_ref());
    let out = output::render_single(&global.output, &view, detail, |v| v.state.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Password input ──────────────────────────────────────────────────

fn read_password_stdin() -> Result<SecretString, CliError> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "no password on stdin".into(),
        });
    }
    Ok(SecretString::from(password.to_owned()))
}

fn prompt_password(username: &str) -> Result<SecretString, CliError> {
    let password = rpassword::prompt_password(format!("Password for {username}: ")).map_err(|e| {
        CliError::Validation {
            field: "password".into(),
            reason: format!("prompt failed: {e}"),
        }
    })?;
    Ok(SecretString::from(password))
}
