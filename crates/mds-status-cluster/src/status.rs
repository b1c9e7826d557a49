//! Small status summaries derived from counters and daemon metadata.

use std::collections::BTreeMap;

use mds_status_core::{ClusterError, ClusterStateSource};

use crate::counters::latest_counter;

/// Connected-client count for a filesystem, read from its ranks'
/// session-count counter.
///
/// Rank 0 owns the authoritative session map; when rank 0 reports nothing
/// (down or mid-replay), later ranks are consulted for an indication.
///
/// # Errors
/// Propagates source failures.
pub async fn client_count(
    source: &dyn ClusterStateSource,
    rank_names: &[&str],
) -> Result<u64, ClusterError> {
    let mut count = 0;
    for (rank, name) in rank_names.iter().enumerate() {
        if rank == 0 || count == 0 {
            count = latest_counter(source, "mds", name, "mds_sessions.session_count").await?;
        }
    }
    Ok(count)
}

/// Group daemons by reported version string.
///
/// Daemons without a `version` metadata key land under `"unknown"`.
///
/// # Errors
/// Propagates source failures.
pub async fn daemon_versions(
    source: &dyn ClusterStateSource,
    daemon_type: &str,
    names: &[&str],
) -> Result<BTreeMap<String, Vec<String>>, ClusterError> {
    let mut versions: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in names {
        let metadata = source.get_metadata(daemon_type, name).await?;
        let version = metadata
            .get("version")
            .cloned()
            .unwrap_or_else(|| "unknown".to_owned());
        versions.entry(version).or_default().push((*name).to_owned());
    }
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryClusterSource;
    use mds_status_core::CounterSample;
    use std::collections::HashMap;

    #[tokio::test]
    async fn client_count_prefers_rank_zero() {
        let source = MemoryClusterSource::new();
        source.push_counter(
            "mds",
            "mds.a",
            "mds_sessions.session_count",
            CounterSample::new(10, 4),
        );
        source.push_counter(
            "mds",
            "mds.b",
            "mds_sessions.session_count",
            CounterSample::new(10, 9),
        );

        let count = client_count(&source, &["mds.a", "mds.b"]).await.unwrap();
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn client_count_falls_back_when_rank_zero_is_silent() {
        let source = MemoryClusterSource::new();
        source.push_counter(
            "mds",
            "mds.b",
            "mds_sessions.session_count",
            CounterSample::new(10, 9),
        );

        let count = client_count(&source, &["mds.a", "mds.b"]).await.unwrap();
        assert_eq!(count, 9);
    }

    #[tokio::test]
    async fn versions_group_daemon_names() {
        let source = MemoryClusterSource::new();
        source.set_metadata(
            "mds",
            "mds.a",
            HashMap::from([("version".to_owned(), "17.2.6".to_owned())]),
        );
        source.set_metadata(
            "mds",
            "mds.b",
            HashMap::from([("version".to_owned(), "17.2.6".to_owned())]),
        );
        source.set_metadata("mds", "mds.c", HashMap::new());

        let versions = daemon_versions(&source, "mds", &["mds.a", "mds.b", "mds.c"])
            .await
            .unwrap();
        assert_eq!(
            versions.get("17.2.6"),
            Some(&vec!["mds.a".to_owned(), "mds.b".to_owned()])
        );
        assert_eq!(versions.get("unknown"), Some(&vec!["mds.c".to_owned()]));
    }
}
