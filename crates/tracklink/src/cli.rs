//! Command-line surface of `tracklink`.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// tracklink -- talk to a GPS fleet tracking vendor from the command line
#[derive(Debug, Parser)]
#[command(
    name = "tracklink",
    version,
    about = "Sync GPS fleet tracking devices and positions from the command line",
    long_about = "Authenticates against a GPS tracking vendor, mirrors its device list and\n\
        last known positions into a local record store, reports connection health,\n\
        and sends device commands with an audit trail.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Flags shared by every command ────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Vendor account profile to use
    #[arg(long, short = 'p', env = "TRACKLINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Vendor action endpoint (overrides profile)
    #[arg(long, env = "TRACKLINK_VENDOR_URL", global = true)]
    pub vendor_url: Option<String>,

    /// How results are printed
    #[arg(
        long,
        short = 'o',
        env = "TRACKLINK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Color mode
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Log more to stderr (repeat for debug and trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print nothing but errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip vendor certificate verification
    #[arg(long, short = 'k', env = "TRACKLINK_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-attempt request timeout in seconds (overrides profile)
    #[arg(long, env = "TRACKLINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Value enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Bordered table
    Table,
    /// Indented JSON
    Json,
    /// JSON on one line
    JsonCompact,
    /// YAML
    Yaml,
    /// Bare ids, one per line
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Color only when stdout is a terminal
    Auto,
    /// Force ANSI colors
    Always,
    /// Disable ANSI colors
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authenticate against the vendor and store the session
    Login(LoginArgs),

    /// End the vendor session
    Logout,

    /// Show the stored vendor session
    #[command(alias = "s")]
    Session,

    /// Sync and list tracked devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Sync and read device positions
    #[command(alias = "pos")]
    Positions(PositionsArgs),

    /// Evaluate vendor connection health
    Health(HealthArgs),

    /// Send a command to a device
    #[command(alias = "cmd")]
    Command(CommandArgs),

    /// Show the vendor call audit log
    Log(LogArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SESSION
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Vendor account name (overrides profile)
    #[arg(long, short = 'u')]
    pub username: Option<String>,

    /// Read the password from stdin instead of prompting
    #[arg(long)]
    pub password_stdin: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES / POSITIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices (synced from the vendor unless --cached)
    #[command(alias = "ls")]
    List {
        /// Read from the local store without contacting the vendor
        #[arg(long)]
        cached: bool,

        /// Only show online devices
        #[arg(long)]
        online: bool,
    },
}

#[derive(Debug, Args)]
pub struct PositionsArgs {
    #[command(subcommand)]
    pub command: PositionsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PositionsCommand {
    /// Fetch positions from the vendor and store the accepted ones
    Sync {
        /// Device ids (all devices when omitted)
        device_ids: Vec<String>,

        /// Only ask for positions newer than the last sync of this device set
        #[arg(long)]
        incremental: bool,
    },

    /// Last known position per device, from the store when the vendor is unreachable
    Latest {
        /// Device ids
        #[arg(required = true, num_args = 1..)]
        device_ids: Vec<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  HEALTH / COMMANDS / LOG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct HealthArgs {
    /// Exit non-zero when the integration is not healthy
    #[arg(long)]
    pub check: bool,
}

#[derive(Debug, Args)]
pub struct CommandArgs {
    /// Target device id
    pub device_id: String,

    /// Vendor command name (e.g., REBOOT)
    pub command: String,

    /// Command parameters, passed through in order
    #[arg(trailing_var_arg = true)]
    pub params: Vec<String>,
}

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Show at most this many of the newest entries
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Only show failed calls
    #[arg(long)]
    pub failures: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file interactively
    Init,

    /// Print the config file with secrets masked
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key (e.g., vendor_url, username, timeout)
        key: String,

        /// New value
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile to make the default
        name: String,
    },

    /// Store the vendor password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
