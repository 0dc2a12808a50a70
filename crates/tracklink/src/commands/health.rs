//! Connection health report.

use tracklink_core::HealthStatus;

use crate::cli::{GlobalOpts, HealthArgs};
use crate::error::CliError;
use crate::output;

use super::Context;

fn detail(h: &HealthStatus, color: bool) -> String {
    let mut lines = vec![
        format!("Healthy:        {}", output::flag(h.is_healthy, color)),
        format!("Connected:      {}", output::flag(h.is_connected, color)),
        format!("Token valid:    {}", output::flag(h.token_valid, color)),
        format!("Session valid:  {}", output::flag(h.session_valid, color)),
        format!("Active devices: {}", h.active_device_count),
        format!(
            "Response time:  {}",
            h.response_time_ms
                .map_or_else(|| "-".into(), |ms| format!("{ms}ms"))
        ),
        format!("Checked at:     {}", h.computed_at.to_rfc3339()),
    ];
    if let Some(ref message) = h.error_message {
        lines.push(format!("Problems:       {message}"));
    }
    lines.join("\n")
}

pub async fn handle(ctx: &Context, args: &HealthArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let health = ctx.tracker.get_connection_health().await;

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &health,
        |h| detail(h, color),
        |h| if h.is_healthy { "healthy" } else { "unhealthy" }.to_owned(),
    );
    output::print_output(&out, global.quiet);

    if args.check && !health.is_healthy {
        return Err(CliError::Unhealthy {
            reason: health
                .error_message
                .unwrap_or_else(|| "vendor not connected".into()),
        });
    }
    Ok(())
}
