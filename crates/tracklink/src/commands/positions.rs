//! Position command handlers.

use tabled::Tabled;
use tracklink_core::{Position, PositionQuery};

use crate::cli::{GlobalOpts, PositionsArgs, PositionsCommand};
use crate::error::CliError;
use crate::output;

use super::Context;

#[derive(Tabled)]
struct PositionRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Latitude")]
    latitude: String,
    #[tabled(rename = "Longitude")]
    longitude: String,
    #[tabled(rename = "Speed")]
    speed: String,
    #[tabled(rename = "Course")]
    course: String,
    #[tabled(rename = "Moving")]
    moving: String,
    #[tabled(rename = "Reported")]
    reported: String,
}

fn row(p: &Position, color: bool) -> PositionRow {
    PositionRow {
        device: p.device_id.clone(),
        latitude: format!("{:.6}", p.latitude),
        longitude: format!("{:.6}", p.longitude),
        speed: format!("{:.1}", p.speed),
        course: format!("{:.0}", p.course),
        moving: output::flag(p.is_moving, color),
        reported: p.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

fn plain(p: &Position) -> String {
    format!("{}\t{:.6}\t{:.6}", p.device_id, p.latitude, p.longitude)
}

pub async fn handle(
    ctx: &Context,
    args: PositionsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let positions: Vec<Position> = match args.command {
        PositionsCommand::Sync {
            device_ids,
            incremental,
        } => {
            let mut query = if device_ids.is_empty() {
                PositionQuery::all()
            } else {
                PositionQuery::devices(device_ids)
            };
            if incremental {
                query = query.incremental();
            }
            ctx.tracker.fetch_positions(&query).await?
        }
        PositionsCommand::Latest { device_ids } => ctx
            .tracker
            .get_multiple_devices_last_positions(&device_ids)
            .await?
            .into_values()
            .collect(),
    };

    let color = output::should_color(&global.color);
    let out = output::render_list(&global.output, &positions, |p| row(p, color), plain);
    output::print_output(&out, global.quiet);
    Ok(())
}
