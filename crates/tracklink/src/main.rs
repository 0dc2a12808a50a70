mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Overrides the `-v` derived filter when set.
const LOG_ENV: &str = "TRACKLINK_LOG";

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.global.verbose);

    let Err(err) = run(cli).await else {
        return;
    };
    let code = err.exit_code();
    eprintln!("{:?}", miette::Report::new(err));
    std::process::exit(code);
}

fn setup_logging(verbose: u8) {
    let level = ["warn", "info", "debug"]
        .get(usize::from(verbose))
        .copied()
        .unwrap_or("trace");
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli { global, command } = cli;
    match command {
        Command::Config(args) => commands::config_cmd::handle(args, &global),
        Command::Completions(args) => {
            clap_complete::generate(
                args.shell,
                &mut Cli::command(),
                "tracklink",
                &mut std::io::stdout(),
            );
            Ok(())
        }
        command => {
            let ctx = commands::connect(&global).await?;
            tracing::debug!(?command, profile = %ctx.profile_name, "running against vendor");
            commands::dispatch(command, &ctx, &global).await
        }
    }
}
