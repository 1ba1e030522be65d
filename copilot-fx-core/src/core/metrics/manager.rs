use chrono::NaiveDate;
use log::{debug, info, trace, warn};
use regex::Regex;

use crate::core::metrics::{self, DailyMetrics, MetricsError, MetricsReader};
use crate::core::storage::Storage;

const DATA_DATE_FORMAT: &str = "%Y-%m-%d";
const DATA_FILENAME_PATTERN: &str = r"^data_(\d{4}-\d{2}-\d{2})\.json$";

/// The `MetricsManager` integrates freshly fetched metric batches into the durable history.
///
/// History is kept as append-only `data_<YYYY-MM-DD>.json` snapshot files, each named by the
/// latest day it contains. A batch is merged exactly once: days at or below the high-water
/// mark of the existing history are dropped, the first written record for a day wins.
///
/// At most one manager may merge into a given data directory at a time, the read-modify-write
/// sequence is not protected against concurrent writers.
#[derive(Debug)]
pub struct MetricsManager {
    storage: Storage,
    reader: MetricsReader,
}

impl MetricsManager {
    /// Create a new manager for the given data directory.
    pub fn new(data_path: &str) -> Self {
        let storage = Storage::from(data_path);
        Self {
            reader: MetricsReader::new(storage.clone()),
            storage,
        }
    }

    /// The reader of the data directory managed by this instance.
    pub fn reader(&self) -> &MetricsReader {
        &self.reader
    }

    /// Merge the given input batch file into the durable history.
    ///
    /// Records with a day at or below the high-water mark of the existing history are dropped.
    /// The remaining records are written as a new snapshot file named by the latest day within
    /// the batch. The write is all-or-nothing.
    ///
    /// # Arguments
    ///
    /// * `input_filename` - The filename of the batch to merge within the data directory.
    ///
    /// # Returns
    ///
    /// The filename of the newly written snapshot file, [None] when the batch contained no new
    /// days, or a [MetricsError::Processing] when the input batch couldn't be read or the
    /// snapshot couldn't be written.
    pub fn process_new_data(&self, input_filename: &str) -> metrics::Result<Option<String>> {
        let new_metrics = self
            .reader
            .read_metrics_file(input_filename)
            .map_err(|e| MetricsError::Processing(format!("unable to read input batch, {}", e)))?;
        if new_metrics.is_empty() {
            warn!("No data found in input file {}", input_filename);
            return Ok(None);
        }

        let high_water_mark = self.find_latest_data_file().and_then(|filename| {
            debug!("Latest data file found: {}", filename);
            self.high_water_mark(filename.as_str())
        });

        let unique_metrics: Vec<DailyMetrics> = match high_water_mark {
            Some(mark) => {
                debug!("Latest day in existing data: {}", mark.format(DATA_DATE_FORMAT));
                new_metrics.into_iter().filter(|e| e.day > mark).collect()
            }
            None => new_metrics,
        };

        if unique_metrics.is_empty() {
            info!("No new metrics to save");
            return Ok(None);
        }

        let last_day = unique_metrics
            .iter()
            .map(|e| e.day)
            .max()
            .expect("expected the filtered batch to contain records");
        trace!("Last day in new metrics: {}", last_day.format(DATA_DATE_FORMAT));
        let output_filename = format!("data_{}.json", last_day.format(DATA_DATE_FORMAT));

        self.storage
            .options()
            .make_dirs(true)
            .serializer(output_filename.as_str())
            .write(&unique_metrics)
            .map_err(|e| MetricsError::Processing(e.to_string()))?;

        info!("Saved {} new metrics to {}", unique_metrics.len(), output_filename);
        Ok(Some(output_filename))
    }

    /// Locate the most recent data file by the date embedded in its filename.
    fn find_latest_data_file(&self) -> Option<String> {
        let pattern = Regex::new(DATA_FILENAME_PATTERN).expect("expected a valid filename pattern");
        let filenames = match self.storage.filenames() {
            Ok(e) => e,
            Err(e) => {
                warn!("Unable to list the data directory, {}", e);
                return None;
            }
        };

        filenames
            .into_iter()
            .filter_map(|filename| {
                pattern
                    .captures(filename.as_str())
                    .and_then(|e| NaiveDate::parse_from_str(&e[1], DATA_DATE_FORMAT).ok())
                    .map(|date| (date, filename))
            })
            .max_by_key(|(date, _)| *date)
            .map(|(_, filename)| filename)
    }

    /// The latest day present within the given data file.
    fn high_water_mark(&self, filename: &str) -> Option<NaiveDate> {
        match self.reader.read_metrics_file(filename) {
            Ok(records) => records.iter().map(|e| e.day).max(),
            Err(e) => {
                warn!("Unable to determine the high-water mark, {}", e);
                None
            }
        }
    }
}
