use thiserror::Error;

/// The result type for all metric operations.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Represents errors that can occur while fetching, reading or merging usage metrics.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MetricsError {
    /// The remote usage metrics endpoint returned a failure or couldn't be reached.
    #[error("failed to fetch usage metrics, received status {status}")]
    Fetch {
        /// The HTTP status code returned by the endpoint, or 0 for transport failures.
        status: u16,
        /// The response body or transport error message.
        body: String,
    },
    /// The given metrics file contains invalid data or is missing required fields.
    #[error("metrics file {0} cannot be parsed, {1}")]
    Parse(String, String),
    /// The merge of a new metrics batch into the store failed.
    #[error("failed to process metrics batch, {0}")]
    Processing(String),
}
