pub mod diff;
pub mod init;
pub mod status;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};

use rallysync_core::{config, Change, EventFields, Field, SyncState};

pub(crate) fn home() -> Result<PathBuf> {
    config::home().context("could not determine home directory")
}

/// Short human label for a record, e.g. `Tan vs Lee (Men's Singles)`.
pub(crate) fn matchup(fields: &EventFields) -> String {
    let players = match (fields.get(Field::Player1), fields.get(Field::Player2)) {
        ("", "") => "?".to_string(),
        (one, "") | ("", one) => one.to_string(),
        (one, two) => format!("{one} vs {two}"),
    };
    match fields.get(Field::Category) {
        "" => players,
        category => format!("{players} ({category})"),
    }
}

/// One line per change, prefixed `+`, `~` or `-`.
pub(crate) fn change_line(change: &Change) -> String {
    let (marker, detail) = match change {
        Change::New { record, .. } => ("+".green().bold(), matchup(&record.fields)),
        Change::Updated {
            record,
            changed_fields,
            ..
        } => {
            let fields: Vec<String> = changed_fields
                .iter()
                .map(|d| format!("{}: {:?} → {:?}", d.field, d.old_value, d.new_value))
                .collect();
            (
                "~".yellow().bold(),
                format!("{}  [{}]", matchup(&record.fields), fields.join(", ")),
            )
        }
        Change::Deleted { previous, .. } => ("-".red().bold(), matchup(&previous.fields)),
    };
    format!(
        "{marker} {:<8} {:<10} {:<7} {detail}",
        change.kind().to_string(),
        change.unique_id().to_string(),
        change.subject().position.to_string(),
    )
}

pub(crate) fn state_label(state: SyncState) -> ColoredString {
    match state {
        SyncState::Idle => "·".bright_black(),
        SyncState::Syncing => "syncing".yellow(),
        SyncState::Success => "sync success".green(),
        SyncState::Error => "error".red().bold(),
        SyncState::Deleted => "deleted".magenta(),
    }
}
