//! Codec between the internal record set and the persisted discovery file.
//!
//! The file on disk is always a JSON array of discovery entries in the
//! Prometheus `file_sd` shape: `{"targets": ["<addr>"], "labels": {...}}`.
//! The external probing agent's file watcher depends on exactly this shape,
//! so it is the only format ever written. Loading additionally understands a
//! legacy object shape carrying the record list verbatim under `hosts`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{utc_now_string, TargetRecord, DEFAULT_GROUP};

/// One element of the persisted file: a one-address target list plus the
/// label set the probing agent attaches to its metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryEntry {
    // A missing key decodes as an empty list, so the entry is dropped on
    // its own instead of failing the whole document parse.
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub labels: EntryLabels,
}

/// Label values are always strings; absent labels are filled in on decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryLabels {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
}

/// The two persisted shapes the loader understands. Serde tries them in
/// order: the discovery-entry array first, then the legacy object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Document {
    FileSd(Vec<DiscoveryEntry>),
    Legacy {
        #[serde(default)]
        hosts: Vec<TargetRecord>,
    },
}

/// Convert a parsed document into the record set.
///
/// Discovery entries lacking `targets[0]` are silently dropped; absent labels
/// fall back to tolerant defaults so hand-edited files still load.
pub fn decode(doc: Document) -> Vec<TargetRecord> {
    match doc {
        Document::FileSd(entries) => entries.into_iter().filter_map(record_from_entry).collect(),
        Document::Legacy { hosts } => hosts,
    }
}

/// Encode the full record set as discovery entries, one per record, in order.
pub fn encode(records: &[TargetRecord]) -> Vec<DiscoveryEntry> {
    records
        .iter()
        .map(|r| DiscoveryEntry {
            targets: vec![r.target.clone()],
            labels: EntryLabels {
                id: Some(r.id.clone()),
                name: Some(r.name.clone()),
                group: Some(r.group.clone()),
                created: Some(r.created.clone()),
            },
        })
        .collect()
}

fn record_from_entry(entry: DiscoveryEntry) -> Option<TargetRecord> {
    let target = entry.targets.into_iter().next()?;
    let labels = entry.labels;
    Some(TargetRecord {
        id: labels.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: labels.name.unwrap_or_else(|| target.clone()),
        group: labels.group.unwrap_or_else(|| DEFAULT_GROUP.to_string()),
        created: labels.created.unwrap_or_else(utc_now_string),
        target,
    })
}
