//! Device command handlers.

use tabled::Tabled;
use tracklink_core::Device;

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::Context;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Type")]
    dtype: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Last Active")]
    last_active: String,
    #[tabled(rename = "SIM")]
    sim: String,
}

fn row(d: &Device, color: bool) -> DeviceRow {
    DeviceRow {
        id: d.device_id.clone(),
        name: d.display_name().to_owned(),
        group: d.group_name.clone().unwrap_or_default(),
        dtype: d.device_type.clone().unwrap_or_default(),
        online: output::flag(d.is_online, color),
        last_active: d.last_active_at.map_or_else(
            || output::muted("never", color),
            |t| t.format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
        sim: d.sim_number.clone().unwrap_or_default(),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List { cached, online } => {
            let mut devices = if cached {
                ctx.tracker.stored_devices().await?
            } else {
                ctx.tracker.fetch_devices().await?
            };
            if online {
                devices.retain(|d| d.is_online);
            }

            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &devices,
                |d| row(d, color),
                |d| d.device_id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
