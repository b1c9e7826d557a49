//! Helpers over performance-counter sample series.

use mds_status_core::{ClusterError, ClusterStateSource, CounterSample};

/// Most recent value of a series, 0 when empty.
#[must_use]
pub fn latest(samples: &[CounterSample]) -> u64 {
    samples.last().map_or(0, |s| s.value)
}

/// Per-second rate over the last two samples.
///
/// Returns 0.0 with fewer than two samples or a zero time delta. Counter
/// resets show up as a negative rate; callers decide how to render that.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rate(samples: &[CounterSample]) -> f64 {
    match samples {
        [.., prev, last] => {
            let dt = last.timestamp.saturating_sub(prev.timestamp);
            if dt == 0 {
                0.0
            } else {
                (last.value as f64 - prev.value as f64) / dt as f64
            }
        }
        _ => 0.0,
    }
}

/// Fetch one counter and return its latest value.
///
/// # Errors
/// Propagates source failures.
pub async fn latest_counter(
    source: &dyn ClusterStateSource,
    daemon_type: &str,
    daemon_name: &str,
    metric: &str,
) -> Result<u64, ClusterError> {
    let samples = source.get_counter(daemon_type, daemon_name, metric).await?;
    Ok(latest(&samples))
}

/// Fetch one counter and return its per-second rate.
///
/// # Errors
/// Propagates source failures.
pub async fn counter_rate(
    source: &dyn ClusterStateSource,
    daemon_type: &str,
    daemon_name: &str,
    metric: &str,
) -> Result<f64, ClusterError> {
    let samples = source.get_counter(daemon_type, daemon_name, metric).await?;
    Ok(rate(&samples))
}
