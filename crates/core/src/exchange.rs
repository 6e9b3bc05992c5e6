//! Backup file codec
//!
//! Exports render the replica into a self-describing JSON document; imports
//! parse one back and merge it without disturbing entities already held.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::errors::{CompanionError, Result};
use crate::model::Snapshot;

/// Document version stamped into every export
pub const EXPORT_VERSION: &str = "1.0";

/// Backup document written by the export action
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: &'static str,
    pub exported_at: DateTime<Utc>,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

impl ExportDocument {
    pub fn new(snapshot: Snapshot) -> ExportDocument {
        ExportDocument {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            snapshot,
        }
    }

    /// Pretty-printed JSON, ready to hand to a save dialog
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Suggested download name, dated by the export day
    pub fn filename(&self) -> String {
        format!(
            "prompt-master-export-{}.json",
            self.exported_at.format("%Y-%m-%d")
        )
    }
}

/// What an import merge added
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub new_prompts: usize,
    pub new_categories: usize,
    pub new_tags: usize,
}

/// Parse an import file into a snapshot fragment
///
/// Documents whose `prompts` field is missing or not an array are rejected
/// before any entity parses; malformed JSON surfaces as a serialization
/// error so callers can tell the two apart.
pub fn parse_import(raw: &str) -> Result<Snapshot> {
    let value: Value = serde_json::from_str(raw)?;
    if !value.get("prompts").map_or(false, Value::is_array) {
        return Err(CompanionError::InvalidFormat(
            "import document has no prompts array".to_string(),
        ));
    }
    Ok(serde_json::from_value(value)?)
}

/// Merge an imported snapshot into the replica contents
///
/// Entities whose id already exists are skipped and the held copy wins.
/// New entities append after the existing ones.
pub fn merge(target: &mut Snapshot, incoming: Snapshot) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();

    for prompt in incoming.prompts {
        if !target.prompts.iter().any(|p| p.id == prompt.id) {
            target.prompts.push(prompt);
            outcome.new_prompts += 1;
        }
    }
    for category in incoming.categories {
        if !target.categories.iter().any(|c| c.id == category.id) {
            target.categories.push(category);
            outcome.new_categories += 1;
        }
    }
    for tag in incoming.tags {
        if !target.tags.iter().any(|t| t.id == tag.id) {
            target.tags.push(tag);
            outcome.new_tags += 1;
        }
    }

    outcome
}
