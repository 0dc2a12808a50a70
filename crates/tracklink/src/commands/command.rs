//! Device command dispatch.

use tracklink_core::CommandOutcome;

use crate::cli::{CommandArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::Context;

fn detail(o: &CommandOutcome) -> String {
    let mut lines = vec![
        format!("Device:     {}", o.device_id),
        format!("Command:    {}", o.command),
        format!(
            "Command ID: {}",
            o.command_id.as_deref().unwrap_or("-")
        ),
        format!("Sent at:    {}", o.sent_at.to_rfc3339()),
        format!("Audit ID:   {}", o.log_id),
    ];
    if let Some(ref result) = o.result {
        lines.push(format!("Result:     {result}"));
    }
    lines.join("\n")
}

pub async fn handle(ctx: &Context, args: CommandArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let outcome = ctx
        .tracker
        .send_command(&args.device_id, &args.command, &args.params)
        .await?;

    let out = output::render_single(&global.output, &outcome, detail, |o| {
        o.command_id.clone().unwrap_or_else(|| o.log_id.to_string())
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
