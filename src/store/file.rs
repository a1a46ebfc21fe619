use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{self, Document};
use super::error::StoreError;
use super::{utc_now_string, TargetRecord, DEFAULT_GROUP};

/// Skip reasons reported by bulk import.
pub const SKIP_EMPTY_TARGET: &str = "Empty target";
pub const SKIP_ALREADY_EXISTS: &str = "Already exists";

/// A candidate target, as submitted by a client. Only the address is
/// required; name and group fall back to their defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTarget {
    pub target: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

/// Fields an update may overwrite. `id` and `created` are not patchable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

/// One candidate rejected by bulk import, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedTarget {
    pub target: String,
    pub reason: String,
}

/// Result of a bulk import: every candidate lands in exactly one list.
#[derive(Debug)]
pub struct BulkOutcome {
    pub added: Vec<TargetRecord>,
    pub skipped: Vec<SkippedTarget>,
}

/// File-backed target store.
///
/// Holds no state between operations: every operation loads the record set
/// fresh from the targets file, mutates it, and rewrites the whole file, so
/// the file is the single source of truth. Callers must serialize mutating
/// operations (the store thread in `store_manager` does this).
pub struct TargetStore {
    path: PathBuf,
}

impl TargetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record set from the targets file.
    ///
    /// A missing file is an empty set. Read and parse failures also degrade
    /// to an empty set and are logged rather than surfaced, since the file
    /// may be absent or hand-edited.
    pub fn load(&self) -> Vec<TargetRecord> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read targets file");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Document>(&raw) {
            Ok(doc) => document::decode(doc),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to parse targets file");
                Vec::new()
            }
        }
    }

    /// Rewrite the whole targets file from the given record set.
    ///
    /// An empty set is a valid document (an empty array), not a deleted file.
    /// Write failures are surfaced: a failed save means the caller's mutation
    /// did not take effect.
    pub fn save(&self, records: &[TargetRecord]) -> Result<(), StoreError> {
        let entries = document::encode(records);
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| StoreError::Persistence(e.to_string()))?;

        tracing::debug!(count = records.len(), path = %self.path.display(), "Saved targets file");
        Ok(())
    }

    /// Get the full record set.
    pub fn list(&self) -> Vec<TargetRecord> {
        self.load()
    }

    /// Add a single target. Rejects an empty address and an address already
    /// present in the set.
    pub fn add(&self, candidate: NewTarget) -> Result<TargetRecord, StoreError> {
        let target = candidate.target.trim().to_string();
        if target.is_empty() {
            return Err(StoreError::Validation("target cannot be empty".to_string()));
        }

        let mut records = self.load();
        if records.iter().any(|r| r.target == target) {
            return Err(StoreError::Conflict(target));
        }

        let record = build_record(target, candidate.name, candidate.group);
        records.push(record.clone());
        self.save(&records)?;
        Ok(record)
    }

    /// Remove the record with the given id.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.load();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(StoreError::NotFound);
        }
        self.save(&records)
    }

    /// Overwrite the patchable fields of the record with the given id.
    /// `id` and `created` always survive unchanged.
    pub fn update(&self, id: &str, patch: TargetPatch) -> Result<TargetRecord, StoreError> {
        let mut records = self.load();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound)?;

        if let Some(name) = patch.name {
            record.name = name.trim().to_string();
        }
        if let Some(group) = patch.group {
            record.group = group.trim().to_string();
        }
        // Unlike add, target uniqueness is not re-checked here.
        if let Some(target) = patch.target {
            record.target = target.trim().to_string();
        }

        let updated = record.clone();
        self.save(&records)?;
        Ok(updated)
    }

    /// Import a batch of candidates in order, skipping empty and duplicate
    /// addresses (against the existing set or earlier items in the batch).
    /// The resulting set is saved exactly once, after the whole batch.
    pub fn bulk_add(&self, items: Vec<NewTarget>) -> Result<BulkOutcome, StoreError> {
        let mut records = self.load();
        let mut seen: HashSet<String> = records.iter().map(|r| r.target.clone()).collect();

        let mut added = Vec::new();
        let mut skipped = Vec::new();

        for item in items {
            let target = item.target.trim().to_string();
            if target.is_empty() {
                skipped.push(SkippedTarget {
                    target,
                    reason: SKIP_EMPTY_TARGET.to_string(),
                });
                continue;
            }
            if seen.contains(&target) {
                skipped.push(SkippedTarget {
                    target,
                    reason: SKIP_ALREADY_EXISTS.to_string(),
                });
                continue;
            }

            let record = build_record(target.clone(), item.name, item.group);
            seen.insert(target);
            records.push(record.clone());
            added.push(record);
        }

        self.save(&records)?;
        Ok(BulkOutcome { added, skipped })
    }

    /// Distinct group labels across the record set, sorted.
    pub fn list_groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self.load().into_iter().map(|r| r.group).collect();
        groups.sort();
        groups.dedup();
        groups
    }
}

fn build_record(target: String, name: Option<String>, group: Option<String>) -> TargetRecord {
    TargetRecord {
        id: Uuid::new_v4().to_string(),
        name: name.unwrap_or_else(|| target.clone()).trim().to_string(),
        group: group
            .unwrap_or_else(|| DEFAULT_GROUP.to_string())
            .trim()
            .to_string(),
        created: utc_now_string(),
        target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store(tmp: &TempDir) -> TargetStore {
        TargetStore::new(tmp.path().join("hosts.json"))
    }

    fn candidate(target: &str) -> NewTarget {
        NewTarget {
            target: target.to_string(),
            name: None,
            group: None,
        }
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_garbage_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);
        std::fs::write(store.path(), "not json at all").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_add_defaults_and_persists() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        let record = store.add(candidate("10.0.0.1:9115")).unwrap();
        assert_eq!(record.name, "10.0.0.1:9115");
        assert_eq!(record.group, "default");
        assert!(!record.id.is_empty());

        // The persisted file has exactly one entry with the returned id.
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["labels"]["id"], record.id);
    }

    #[test]
    fn test_add_trims_fields() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        let record = store
            .add(NewTarget {
                target: "  h1:9115  ".to_string(),
                name: Some("  edge  ".to_string()),
                group: Some("  dc1  ".to_string()),
            })
            .unwrap();

        assert_eq!(record.target, "h1:9115");
        assert_eq!(record.name, "edge");
        assert_eq!(record.group, "dc1");
    }

    #[test]
    fn test_add_empty_target_is_validation_error() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        let err = store.add(candidate("   ")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_add_duplicate_target_is_conflict() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        store.add(candidate("h1")).unwrap();
        let err = store.add(candidate("h1")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Set unchanged: still exactly one record.
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn test_delete_removes_record() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        let record = store.add(candidate("h1")).unwrap();
        store.add(candidate("h2")).unwrap();

        store.delete(&record.id).unwrap();
        let remaining = store.load();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].target, "h2");
    }

    #[test]
    fn test_delete_last_record_leaves_empty_document() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        let record = store.add(candidate("h1")).unwrap();
        store.delete(&record.id).unwrap();

        // The file still exists and holds an empty array.
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!([]));
    }

    #[test]
    fn test_delete_unknown_id_is_not_found_and_keeps_document() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        store.add(candidate("h1")).unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        let err = store.delete("no-such-id").unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_update_overwrites_only_given_fields() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        let record = store
            .add(NewTarget {
                target: "h1".to_string(),
                name: Some("edge".to_string()),
                group: Some("dc1".to_string()),
            })
            .unwrap();

        let updated = store
            .update(
                &record.id,
                TargetPatch {
                    group: Some(" dc2 ".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.group, "dc2");
        assert_eq!(updated.name, "edge");
        assert_eq!(updated.target, "h1");
    }

    #[test]
    fn test_update_never_changes_id_or_created() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        let record = store.add(candidate("h1")).unwrap();
        let updated = store
            .update(
                &record.id,
                TargetPatch {
                    name: Some("renamed".to_string()),
                    group: Some("other".to_string()),
                    target: Some("h2".to_string()),
                },
            )
            .unwrap();

        assert_eq!(updated.id, record.id);
        assert_eq!(updated.created, record.created);
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        let err = store
            .update("missing", TargetPatch::default())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn test_bulk_add_accounting() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        let outcome = store
            .bulk_add(vec![
                candidate("h1"),
                candidate("h1"),
                candidate(""),
                candidate("h2"),
            ])
            .unwrap();

        assert_eq!(outcome.added.len(), 2);
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(outcome.added[0].target, "h1");
        assert_eq!(outcome.added[1].target, "h2");
        assert_eq!(outcome.skipped[0].reason, SKIP_ALREADY_EXISTS);
        assert_eq!(outcome.skipped[1].reason, SKIP_EMPTY_TARGET);

        assert_eq!(store.load().len(), 2);
    }

    #[test]
    fn test_bulk_add_skips_targets_already_in_store() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        store.add(candidate("h1")).unwrap();
        let outcome = store
            .bulk_add(vec![candidate("h1"), candidate("h3")])
            .unwrap();

        assert_eq!(outcome.added.len(), 1);
        assert_eq!(outcome.added[0].target, "h3");
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].target, "h1");
    }

    #[test]
    fn test_list_groups_sorted_and_deduplicated() {
        let tmp = TempDir::new().unwrap();
        let store = test_store(&tmp);

        for (target, group) in [("t1", "b"), ("t2", "a"), ("t3", "a"), ("t4", "default")] {
            store
                .add(NewTarget {
                    target: target.to_string(),
                    name: None,
                    group: Some(group.to_string()),
                })
                .unwrap();
        }

        assert_eq!(store.list_groups(), vec!["a", "b", "default"]);
    }

    #[test]
    fn test_save_failure_is_surfaced() {
        let tmp = TempDir::new().unwrap();
        // Point the store at a path whose parent does not exist.
        let store = TargetStore::new(tmp.path().join("missing-dir").join("hosts.json"));

        let err = store.add(candidate("h1")).unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));
    }
}
