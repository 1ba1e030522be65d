use std::fmt::Debug;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::core::metrics;

/// The `MetricsProvider` trait retrieves usage metrics from a remote analytics endpoint.
///
/// A provider performs a single fetch per invocation and normalizes the raw payload into
/// [crate::core::metrics::DailyMetrics] records. The normalized batch is persisted as a
/// timestamped snapshot file before the fetch completes, allowing the caller to re-process
/// the same batch later without contacting the network again.
///
/// Retry behavior is the caller's decision, a provider never retries on its own.
#[async_trait]
pub trait MetricsProvider: Debug + Send + Sync {
    /// Fetch the latest usage metrics from the remote endpoint.
    ///
    /// # Returns
    ///
    /// Returns the path of the persisted snapshot file containing the normalized batch,
    /// or a [crate::core::metrics::MetricsError::Fetch] when the endpoint couldn't be reached
    /// or returned a failure status.
    async fn fetch(&self) -> metrics::Result<PathBuf>;
}
