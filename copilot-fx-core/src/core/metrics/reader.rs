use itertools::Itertools;
use log::{debug, trace, warn};

use crate::core::metrics::{self, DailyMetrics, MetricsError};
use crate::core::storage::Storage;

/// The filename prefix of merged history snapshot files.
pub const DATA_FILE_PREFIX: &str = "data_";
/// The filename extension of snapshot files.
pub const DATA_FILE_EXTENSION: &str = ".json";

/// Reads and parses daily metric records from snapshot files within a data directory.
#[derive(Debug, Clone)]
pub struct MetricsReader {
    storage: Storage,
}

impl MetricsReader {
    /// Create a new reader on top of the given storage.
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Read and parse a single metrics file.
    ///
    /// # Arguments
    ///
    /// * `filename` - The name of the file to read within the data directory.
    ///
    /// # Returns
    ///
    /// The parsed records, or a [MetricsError::Parse] when the file couldn't be read.
    /// A failed read never returns partial data.
    pub fn read_metrics_file(&self, filename: &str) -> metrics::Result<Vec<DailyMetrics>> {
        trace!("Reading metrics file {}", filename);
        self.storage
            .options()
            .serializer(filename)
            .read::<Vec<DailyMetrics>>()
            .map_err(|e| MetricsError::Parse(filename.to_string(), e.to_string()))
    }

    /// Load the full accumulated history from all merged snapshot files.
    ///
    /// Snapshot files are read in filename order and the resulting records are ordered by day.
    /// A malformed file fails that file only, the remaining files are still loaded.
    /// A missing data directory or the absence of snapshot files is a valid empty history.
    pub fn load_history(&self) -> Vec<DailyMetrics> {
        let filenames = match self.storage.filenames() {
            Ok(e) => e,
            Err(e) => {
                warn!("Unable to list the data directory, {}", e);
                return Vec::new();
            }
        };

        let mut history: Vec<DailyMetrics> = Vec::new();
        for filename in filenames
            .iter()
            .filter(|e| e.starts_with(DATA_FILE_PREFIX) && e.ends_with(DATA_FILE_EXTENSION))
        {
            match self.read_metrics_file(filename) {
                Ok(mut records) => {
                    trace!("Loaded {} records from {}", records.len(), filename);
                    history.append(&mut records);
                }
                Err(e) => warn!("Skipping metrics file, {}", e),
            }
        }

        debug!("Loaded a total of {} history records", history.len());
        history.into_iter().sorted_by_key(|e| e.day).collect()
    }
}
