//! `rallysync diff <sheet>`: pending changes against the saved baseline.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use rallysync_core::{Change, UniqueId};
use rallysync_sync::{pipeline, Preview};

use super::{change_line, home};

/// Arguments for `rallysync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Path to the sheet document (YAML).
    pub sheet: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DiffJson<'a> {
    baseline_records: usize,
    current_records: usize,
    changes: &'a [Change],
    to_provision: &'a [UniqueId],
    orphans: Vec<OrphanJson>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OrphanJson {
    row: usize,
    remote_id: String,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let home = home()?;
        let preview = pipeline::preview(&home, &self.sheet)
            .with_context(|| format!("diff failed for '{}'", self.sheet.display()))?;

        if self.json {
            return print_json(&preview);
        }

        if preview.changes.is_empty() && preview.orphans.is_empty() {
            println!("No differences for '{}'.", self.sheet.display());
            return Ok(());
        }

        for change in &preview.changes {
            println!("{}", change_line(change));
        }
        for orphan in &preview.orphans {
            println!(
                "✗ ORPHAN   {:<10} {:<7} emptied row still bound",
                orphan.remote_id.to_string(),
                orphan.position.to_string()
            );
        }
        Ok(())
    }
}

fn print_json(preview: &Preview) -> Result<()> {
    let payload = DiffJson {
        baseline_records: preview.baseline_records,
        current_records: preview.current_records,
        changes: &preview.changes,
        to_provision: &preview.to_provision,
        orphans: preview
            .orphans
            .iter()
            .map(|orphan| OrphanJson {
                row: orphan.position.0,
                remote_id: orphan.remote_id.0.clone(),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize diff JSON")?
    );
    Ok(())
}
