//! Cluster map fetching and an in-memory state source.

use std::{collections::HashMap, sync::RwLock};

use async_trait::async_trait;
use mds_status_core::{ClusterError, ClusterStateSource, CounterSample, MapKind, MapSnapshot};
use serde_json::Value;

/// Fetch and construct the map identified by `kind`.
///
/// Each kind has its own assembly rules: the OSD map is composed from the
/// tree/crush/metadata sub-keys published alongside it, and health and
/// monitor status arrive as JSON embedded in a string field.
///
/// # Errors
/// Returns [`ClusterError::MapUnavailable`] when the source has not
/// published the map, or [`ClusterError::BadPayload`] when the payload does
/// not have the expected shape.
pub async fn fetch_map(
    source: &dyn ClusterStateSource,
    kind: MapKind,
) -> Result<MapSnapshot, ClusterError> {
    let raw = source
        .get_raw(kind.key())
        .await?
        .ok_or(ClusterError::MapUnavailable(kind))?;

    match kind {
        MapKind::OsdMap => compose_osd_map(source, raw).await,
        MapKind::FsMap | MapKind::MonMap => {
            let epoch = epoch_of(kind, &raw)?;
            Ok(MapSnapshot { kind, epoch, data: raw })
        }
        MapKind::Health | MapKind::MonStatus => embedded_json(kind, &raw),
        MapKind::PgSummary | MapKind::Config | MapKind::Df => Ok(MapSnapshot {
            kind,
            epoch: 0,
            data: raw,
        }),
    }
}

fn epoch_of(kind: MapKind, raw: &Value) -> Result<u64, ClusterError> {
    raw.get("epoch")
        .and_then(Value::as_u64)
        .ok_or_else(|| ClusterError::BadPayload {
            kind,
            reason: "missing epoch".to_owned(),
        })
}

/// Merge the OSD map's companion payloads under their conventional keys.
async fn compose_osd_map(
    source: &dyn ClusterStateSource,
    mut raw: Value,
) -> Result<MapSnapshot, ClusterError> {
    let kind = MapKind::OsdMap;
    let epoch = epoch_of(kind, &raw)?;

    let Some(map) = raw.as_object_mut() else {
        return Err(ClusterError::BadPayload {
            kind,
            reason: "not an object".to_owned(),
        });
    };
    for (field, key) in [
        ("tree", "osd_map_tree"),
        ("crush", "osd_map_crush"),
        ("crush_map_text", "osd_map_crush_map_text"),
        ("osd_metadata", "osd_metadata"),
    ] {
        if let Some(value) = source.get_raw(key).await? {
            map.insert(field.to_owned(), value);
        }
    }

    Ok(MapSnapshot { kind, epoch, data: raw })
}

/// Health and mon-status payloads carry their real content as a JSON string
/// under a `json` field.
fn embedded_json(kind: MapKind, raw: &Value) -> Result<MapSnapshot, ClusterError> {
    let text = raw
        .get("json")
        .and_then(Value::as_str)
        .ok_or_else(|| ClusterError::BadPayload {
            kind,
            reason: "missing json field".to_owned(),
        })?;
    let data: Value = serde_json::from_str(text).map_err(|e| ClusterError::BadPayload {
        kind,
        reason: e.to_string(),
    })?;

    Ok(MapSnapshot { kind, epoch: 0, data })
}

type CounterKey = (String, String, String);
type DaemonKey = (String, String);

/// In-memory cluster state for tests and the demo.
///
/// Holds raw map payloads, counter series, and daemon metadata exactly as a
/// live manager would publish them.
#[derive(Default)]
pub struct MemoryClusterSource {
    raw: RwLock<HashMap<String, Value>>,
    counters: RwLock<HashMap<CounterKey, Vec<CounterSample>>>,
    metadata: RwLock<HashMap<DaemonKey, HashMap<String, String>>>,
}

impl MemoryClusterSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a raw payload under `key`.
    pub fn set_raw(&self, key: impl Into<String>, value: Value) {
        self.raw.write().unwrap().insert(key.into(), value);
    }

    /// Append a counter sample for one daemon metric.
    pub fn push_counter(
        &self,
        daemon_type: &str,
        daemon_name: &str,
        metric: &str,
        sample: CounterSample,
    ) {
        self.counters
            .write()
            .unwrap()
            .entry((
                daemon_type.to_owned(),
                daemon_name.to_owned(),
                metric.to_owned(),
            ))
            .or_default()
            .push(sample);
    }

    /// Set metadata for one daemon.
    pub fn set_metadata(
        &self,
        daemon_type: &str,
        daemon_name: &str,
        metadata: HashMap<String, String>,
    ) {
        self.metadata
            .write()
            .unwrap()
            .insert((daemon_type.to_owned(), daemon_name.to_owned()), metadata);
    }
}

#[async_trait]
impl ClusterStateSource for MemoryClusterSource {
    async fn get_raw(&self, key: &str) -> Result<Option<Value>, ClusterError> {
        Ok(self.raw.read().unwrap().get(key).cloned())
    }

    async fn get_counter(
        &self,
        daemon_type: &str,
        daemon_name: &str,
        metric: &str,
    ) -> Result<Vec<CounterSample>, ClusterError> {
        Ok(self
            .counters
            .read()
            .unwrap()
            .get(&(
                daemon_type.to_owned(),
                daemon_name.to_owned(),
                metric.to_owned(),
            ))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_metadata(
        &self,
        daemon_type: &str,
        daemon_name: &str,
    ) -> Result<HashMap<String, String>, ClusterError> {
        Ok(self
            .metadata
            .read()
            .unwrap()
            .get(&(daemon_type.to_owned(), daemon_name.to_owned()))
            .cloned()
            .unwrap_or_default())
    }
}
