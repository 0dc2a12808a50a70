//! Audit log listing.

use tabled::Tabled;
use tracklink_core::{LogStatus, SyncLogEntry};

use crate::cli::{GlobalOpts, LogArgs};
use crate::error::CliError;
use crate::output;

use super::Context;

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Operation")]
    operation: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Vendor Code")]
    vendor_code: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&SyncLogEntry> for LogRow {
    fn from(e: &SyncLogEntry) -> Self {
        Self {
            time: e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            operation: e.operation_type.to_string(),
            status: e.status.to_string(),
            vendor_code: e
                .vendor_status_code
                .map(|c| c.to_string())
                .unwrap_or_default(),
            id: e.id.to_string(),
        }
    }
}

/// Newest-last slice of the log, optionally failures only.
fn select(mut entries: Vec<SyncLogEntry>, args: &LogArgs) -> Vec<SyncLogEntry> {
    if args.failures {
        entries.retain(|e| e.status != LogStatus::Success);
    }
    if let Some(limit) = args.limit {
        let skip = entries.len().saturating_sub(limit);
        entries.drain(..skip);
    }
    entries
}

pub async fn handle(ctx: &Context, args: &LogArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let entries = select(ctx.tracker.sync_log().await?, args);
    let out = output::render_list(&global.output, &entries, |e| LogRow::from(e), |e| e.id.to_string());
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tracklink_core::OperationType;

    use super::*;

    fn entry(status: LogStatus, minute: u32) -> SyncLogEntry {
        SyncLogEntry::new(
            OperationType::FetchDevices,
            json!({}),
            json!({}),
            status,
            None,
            Utc.with_ymd_and_hms(2024, 12, 31, 0, minute, 0).unwrap(),
        )
    }

    #[test]
    fn limit_keeps_newest_failures() {
        let entries = vec![
            entry(LogStatus::TransportError, 0),
            entry(LogStatus::Success, 1),
            entry(LogStatus::VendorError, 2),
            entry(LogStatus::TransportError, 3),
        ];
        let args = LogArgs {
            limit: Some(2),
            failures: true,
        };
        let picked = select(entries, &args);
        let minutes: Vec<_> = picked
            .iter()
            .map(|e| e.timestamp.format("%M").to_string())
            .collect();
        assert_eq!(minutes, ["02", "03"]);
    }
}
