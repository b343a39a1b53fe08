//! `rallysync sync <sheet>`: run one reconciliation cycle.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use rallysync_sync::{pipeline, CycleReport, Preview, RunOutcome};

use super::{change_line, home, state_label};

/// Arguments for `rallysync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Path to the sheet document (YAML).
    pub sheet: PathBuf,

    /// Show what would be sent without calling the remote or writing files.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Tabled)]
struct RowOutcome {
    #[tabled(rename = "row")]
    row: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "message")]
    message: String,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let home = home()?;
        let outcome = pipeline::run(&home, &self.sheet, self.dry_run)
            .with_context(|| format!("sync failed for '{}'", self.sheet.display()))?;

        match outcome {
            RunOutcome::DryRun(preview) => print_preview(&preview),
            RunOutcome::Synced(report) => print_report(&self.sheet, &report),
        }
        Ok(())
    }
}

fn print_preview(preview: &Preview) {
    if preview.changes.is_empty() && preview.orphans.is_empty() {
        println!("[dry-run] ✓ nothing to do");
        return;
    }
    println!(
        "[dry-run] {} change(s), {} to provision, {} orphan(s)",
        preview.changes.len(),
        preview.to_provision.len(),
        preview.orphans.len()
    );
    for change in &preview.changes {
        println!("  {}", change_line(change));
    }
    for orphan in &preview.orphans {
        println!("  ✗ {} would delete remote row {}", orphan.position, orphan.remote_id);
    }
}

fn print_report(sheet: &std::path::Path, report: &CycleReport) {
    if report.is_noop() {
        println!("✓ '{}': nothing to do", sheet.display());
        return;
    }

    println!(
        "✓ '{}' synced ({} new, {} updated, {} deleted; {} provisioned, {} sent)",
        sheet.display(),
        report.changes.new,
        report.changes.updated,
        report.changes.deleted,
        report.provision.provisioned.len(),
        report.dispatch.sent.len(),
    );
    if report.row_errors > 0 {
        println!("  {} row(s) ended in error; run sync again to retry", report.row_errors);
    }
    if report.dispatch.batch_fallback {
        println!("  batch delete failed; deletions were sent individually");
    }
    if !report.baseline_saved {
        println!("  warning: baseline was not saved; the same changes will be sent again");
    }

    if report.rows.is_empty() {
        return;
    }
    let rows: Vec<RowOutcome> = report
        .rows
        .iter()
        .map(|(position, status)| RowOutcome {
            row: position.0.to_string(),
            status: state_label(status.state).to_string(),
            message: status.message.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
