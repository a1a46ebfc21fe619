pub mod document;
pub mod error;
pub mod file;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub use error::StoreError;
pub use file::{BulkOutcome, NewTarget, SkippedTarget, TargetPatch, TargetStore};

/// A monitored target as managed by the store.
/// This is the canonical data model used by the store, API, and persisted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    /// Opaque unique identifier, generated at creation and never reused.
    pub id: String,

    /// Probing endpoint, e.g. "10.0.0.1:9115". Unique across the record set.
    pub target: String,

    /// Display label. Defaults to the target address.
    pub name: String,

    /// Free-text category label. Defaults to "default".
    pub group: String,

    /// Creation timestamp, RFC 3339 UTC. Set once, never modified.
    pub created: String,
}

/// Default group label for records created without one.
pub const DEFAULT_GROUP: &str = "default";

/// Current UTC time as the RFC 3339 string stored in the `created` label.
pub(crate) fn utc_now_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
