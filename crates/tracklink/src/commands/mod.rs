//! Command dispatch: bridges CLI args -> tracker operations -> output formatting.

pub mod command;
pub mod config_cmd;
pub mod devices;
pub mod health;
pub mod log;
pub mod positions;
pub mod session;

use std::sync::Arc;

use tracing::debug;
use tracklink_config::Profile;
use tracklink_core::{JsonFileStore, Tracker};

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// A tracker bound to the active profile and its record store.
#[derive(Debug)]
pub struct Context {
    pub tracker: Tracker,
    pub profile_name: String,
    pub profile: Profile,
}

/// Resolve the active profile, open its store, and restore any
/// persisted session.
pub async fn connect(global: &GlobalOpts) -> Result<Context, CliError> {
    let resolved = config::resolve(global)?;
    let store = JsonFileStore::open(&resolved.store_path)?;
    debug!(path = %resolved.store_path.display(), "opened record store");

    let tracker = Tracker::new(resolved.tracker, Arc::new(store))?;
    if let Some(session) = tracker.load_existing_session().await? {
        debug!(expires_at = %session.expires_at, "restored vendor session");
    }

    Ok(Context {
        tracker,
        profile_name: resolved.profile_name,
        profile: resolved.profile,
    })
}

/// Dispatch a vendor-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let result = match cmd {
        Command::Login(args) => session::login(ctx, args, global).await,
        Command::Logout => session::logout(ctx, global).await,
        Command::Session => session::show(ctx, global),
        Command::Devices(args) => devices::handle(ctx, args, global).await,
        Command::Positions(args) => positions::handle(ctx, args, global).await,
        Command::Health(args) => health::handle(ctx, &args, global).await,
        Command::Command(args) => command::handle(ctx, args, global).await,
        Command::Log(args) => log::handle(ctx, &args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    };
    result.map_err(|e| e.for_profile(&ctx.profile_name))
}
