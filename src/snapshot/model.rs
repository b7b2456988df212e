//! Snapshot records and their canonical encoding

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::error::SnapshotError;

/// Schema version written into every new snapshot
pub const SCHEMA_VERSION: &str = "1.0";

/// Store-assigned identifier of an uploaded blob
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Immutable point-in-time image of a workspace.
///
/// `files` and `folders` are ordered collections so the encoded form is
/// stable for identical inputs. Paths are relative to the scan root and use
/// `/` as separator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    pub schema_version: String,
    pub created_at: DateTime<Utc>,
    pub workspace_id: String,
    #[serde(default)]
    pub app_state: Value,
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    #[serde(default)]
    pub folders: BTreeSet<String>,
}

impl WorkspaceSnapshot {
    /// Empty snapshot stamped with the current schema version and time
    pub fn new(workspace_id: impl Into<String>, app_state: Value) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            created_at: Utc::now(),
            workspace_id: workspace_id.into(),
            app_state,
            files: BTreeMap::new(),
            folders: BTreeSet::new(),
        }
    }

    /// Canonical byte encoding uploaded to the blob store
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        serde_json::to_vec(self).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Decode a fetched blob, checking the required header fields first.
    ///
    /// `workspaceId` and `schemaVersion` must be present and strings; any
    /// other structural mismatch is also reported as `InvalidFormat`.
    pub fn from_blob(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| SnapshotError::InvalidFormat(format!("not JSON: {}", e)))?;

        let obj = value
            .as_object()
            .ok_or_else(|| SnapshotError::InvalidFormat("top level is not an object".into()))?;

        for field in ["workspaceId", "schemaVersion"] {
            match obj.get(field) {
                Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(SnapshotError::InvalidFormat(format!(
                        "field '{}' is not a string",
                        field
                    )))
                }
                None => {
                    return Err(SnapshotError::InvalidFormat(format!(
                        "missing field '{}'",
                        field
                    )))
                }
            }
        }

        serde_json::from_value(value).map_err(|e| SnapshotError::InvalidFormat(e.to_string()))
    }
}

/// Current-snapshot pointer of one workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerRecord {
    pub workspace_id: String,
    pub current_content_id: ContentId,
    pub updated_at: DateTime<Utc>,
}

impl PointerRecord {
    pub fn new(workspace_id: impl Into<String>, content_id: ContentId) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            current_content_id: content_id,
            updated_at: Utc::now(),
        }
    }
}
