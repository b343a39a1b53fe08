//! `rallysync status <sheet>`: per-row sync state and baseline age.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use rallysync_core::{sheet, SheetDocument, SyncState};
use rallysync_sync::{pipeline, FileSnapshotStore, SnapshotStore};

use super::{home, matchup, state_label};

/// Arguments for `rallysync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Path to the sheet document (YAML).
    pub sheet: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RowReport {
    row: usize,
    event: String,
    remote_id: Option<String>,
    status: String,
    message: String,
    #[serde(skip)]
    state: SyncState,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    rows: usize,
    bound: usize,
    errors: usize,
    baseline_records: usize,
    last_sync_at: Option<String>,
    last_sync_age: String,
}

#[derive(Serialize)]
struct StatusJson {
    summary: Summary,
    rows: Vec<RowReport>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "row")]
    row: usize,
    #[tabled(rename = "event")]
    event: String,
    #[tabled(rename = "remote id")]
    remote_id: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "message")]
    message: String,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = home()?;
        let document = sheet::load_at(&self.sheet)
            .with_context(|| format!("failed to load sheet '{}'", self.sheet.display()))?;
        let store = FileSnapshotStore::new(&home, pipeline::baseline_key(&self.sheet));
        let synced_at = store
            .synced_at()
            .context("failed to read the saved baseline")?;
        let baseline_records = store.load().map(|s| s.len()).unwrap_or(0);

        let rows = row_reports(&document);
        let summary = Summary {
            rows: rows.len(),
            bound: rows.iter().filter(|r| r.remote_id.is_some()).count(),
            errors: rows.iter().filter(|r| r.state == SyncState::Error).count(),
            baseline_records,
            last_sync_at: synced_at.map(|at| at.to_rfc3339()),
            last_sync_age: synced_at.map_or_else(|| "never".to_string(), format_age),
        };

        if self.json {
            let payload = StatusJson { summary, rows };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_table(&self.sheet, summary, rows);
        Ok(())
    }
}

fn row_reports(document: &SheetDocument) -> Vec<RowReport> {
    document
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let status = row.status();
            RowReport {
                row: i + 1,
                event: if row.fields.is_blank() {
                    "(empty)".to_string()
                } else {
                    matchup(&row.fields)
                },
                remote_id: row.bound_remote_id().map(|id| id.0),
                status: status.state.token().to_string(),
                message: status.message,
                state: status.state,
            }
        })
        .collect()
}

fn print_table(sheet: &std::path::Path, summary: Summary, rows: Vec<RowReport>) {
    println!(
        "rallysync v{} | {} | {} rows | {} bound | {} errors | last sync {}",
        env!("CARGO_PKG_VERSION"),
        sheet.display(),
        summary.rows,
        summary.bound,
        summary.errors,
        summary.last_sync_age,
    );

    if rows.is_empty() {
        println!("Sheet has no rows.");
        return;
    }

    let table_rows: Vec<StatusTableRow> = rows
        .into_iter()
        .map(|row| StatusTableRow {
            row: row.row,
            event: row.event,
            remote_id: row.remote_id.unwrap_or_else(|| "-".to_string()),
            status: state_label(row.state).to_string(),
            message: row.message,
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    if summary.errors > 0 {
        println!(
            "{}",
            format!("Run 'rallysync sync {}' to retry failed rows.", sheet.display()).yellow()
        );
    }
}

fn format_age(at: DateTime<Utc>) -> String {
    let secs = (Utc::now() - at).num_seconds().max(0);
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn format_age_picks_the_largest_unit() {
        assert_eq!(format_age(Utc::now() - Duration::seconds(5)), "5s ago");
        assert_eq!(format_age(Utc::now() - Duration::minutes(3)), "3m ago");
        assert_eq!(format_age(Utc::now() - Duration::hours(2)), "2h ago");
        assert_eq!(format_age(Utc::now() - Duration::days(4)), "4d ago");
        assert_eq!(format_age(Utc::now() + Duration::hours(1)), "0s ago");
    }
}
