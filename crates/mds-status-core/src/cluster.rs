//! Narrow interfaces to the cluster manager.
//!
//! The registry core does not depend on these; the status layer consumes
//! cluster maps, counters and daemon metadata through them.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Kind of cluster map exposed by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapKind {
    OsdMap,
    FsMap,
    MonMap,
    PgSummary,
    Health,
    MonStatus,
    Config,
    Df,
}

impl MapKind {
    /// Raw key under which the manager publishes this map.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::OsdMap => "osd_map",
            Self::FsMap => "fs_map",
            Self::MonMap => "mon_map",
            Self::PgSummary => "pg_summary",
            Self::Health => "health",
            Self::MonStatus => "mon_status",
            Self::Config => "config",
            Self::Df => "df",
        }
    }
}

impl std::fmt::Display for MapKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A fetched cluster map: epoch plus raw JSON payload.
///
/// Maps stay untyped; callers traverse them with [`MapSnapshot::lookup`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSnapshot {
    /// Which map this is.
    pub kind: MapKind,
    /// Map epoch, 0 for maps without one.
    pub epoch: u64,
    /// Raw map payload.
    pub data: Value,
}

impl MapSnapshot {
    /// Traverse `path` through nested objects and arrays.
    ///
    /// # Errors
    /// Returns [`ClusterError::NotFound`] when any path element is absent,
    /// rather than a generic fault, so callers can distinguish a missing
    /// field from a failed fetch.
    pub fn lookup(&self, path: &[&str]) -> Result<&Value, ClusterError> {
        let mut cur = &self.data;
        for part in path {
            let next = match cur {
                Value::Object(map) => map.get(*part),
                Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            cur = next.ok_or_else(|| ClusterError::NotFound {
                kind: self.kind,
                path: path.join("/"),
            })?;
        }
        Ok(cur)
    }
}

/// One performance-counter observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSample {
    /// Sample timestamp (seconds).
    pub timestamp: u64,
    /// Counter value at that time.
    pub value: u64,
}

impl CounterSample {
    #[must_use]
    pub const fn new(timestamp: u64, value: u64) -> Self {
        Self { timestamp, value }
    }
}

/// Cluster access error.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("no such field in {kind}: {path}")]
    NotFound { kind: MapKind, path: String },
    #[error("map not published: {0}")]
    MapUnavailable(MapKind),
    #[error("malformed {kind} payload: {reason}")]
    BadPayload { kind: MapKind, reason: String },
    #[error("cluster source error: {0}")]
    Internal(String),
}

/// Source of cluster maps, performance counters and daemon metadata.
///
/// Implementations are injected into whatever constructs the status views;
/// there is no process-wide instance.
#[async_trait]
pub trait ClusterStateSource: Send + Sync {
    /// Fetch the raw payload published under `key`, if any.
    async fn get_raw(&self, key: &str) -> Result<Option<Value>, ClusterError>;

    /// Time-ordered samples for one counter of one daemon.
    async fn get_counter(
        &self,
        daemon_type: &str,
        daemon_name: &str,
        metric: &str,
    ) -> Result<Vec<CounterSample>, ClusterError>;

    /// Metadata key/value pairs for one daemon.
    async fn get_metadata(
        &self,
        daemon_type: &str,
        daemon_name: &str,
    ) -> Result<HashMap<String, String>, ClusterError>;
}

/// Command channel error.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("invalid command arguments: {0}")]
    InvalidArguments(String),
    #[error("command failed: {0}")]
    Failed(String),
}

/// Channel for administrative commands against a remote daemon.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Run the command named by `prefix` with JSON `args`, returning the
    /// decoded JSON reply.
    async fn run(&self, prefix: &str, args: Value) -> Result<Value, CommandError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_traverses_objects_and_arrays() {
        let snap = MapSnapshot {
            kind: MapKind::FsMap,
            epoch: 7,
            data: json!({
                "filesystems": [
                    {"mdsmap": {"fs_name": "cephfs"}}
                ]
            }),
        };

        let name = snap
            .lookup(&["filesystems", "0", "mdsmap", "fs_name"])
            .unwrap();
        assert_eq!(name, &json!("cephfs"));
    }

    #[test]
    fn lookup_absent_field_is_not_found() {
        let snap = MapSnapshot {
            kind: MapKind::MonMap,
            epoch: 1,
            data: json!({"mons": []}),
        };

        let err = snap.lookup(&["quorum", "0"]).unwrap_err();
        assert!(matches!(err, ClusterError::NotFound { kind: MapKind::MonMap, .. }));
    }

    #[test]
    fn map_kind_keys_are_stable() {
        assert_eq!(MapKind::OsdMap.key(), "osd_map");
        assert_eq!(MapKind::MonStatus.key(), "mon_status");
        assert_eq!(MapKind::Df.to_string(), "df");
    }
}
