use chrono::{DateTime, Duration, Local};
use derive_more::Display;
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};

use copilot_fx_core::core::metrics::{self, MetricsError, MetricsManager, MetricsProvider};
use copilot_fx_core::core::storage::Storage;

const SYNC_STATE_FILENAME: &str = "sync-state.json";

/// The result of a completed sync run.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The last completed sync is still fresh, no remote call was made.
    #[display(fmt = "last sync is still fresh, skipped the remote fetch")]
    Fresh,
    /// The fetched batch contained no days newer than the stored history.
    #[display(fmt = "no new data")]
    NoNewData,
    /// New days have been merged into the given snapshot file.
    #[display(fmt = "saved new metrics to {}", _0)]
    Saved(String),
}

/// The persisted timestamp of the last successfully completed sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct SyncState {
    last_sync: DateTime<Local>,
}

/// Fetch the latest usage metrics through the given provider and merge them into the history.
///
/// A sync within the cache window of the last completed sync skips the remote fetch unless
/// `force` is set. The transient snapshot written by the provider is removed on both the
/// success and the failure path.
///
/// # Returns
///
/// The outcome of the sync run, or the fetch/merge error that terminated it.
pub async fn run_sync(
    provider: &dyn MetricsProvider,
    manager: &MetricsManager,
    storage: &Storage,
    cache_ttl_hours: i64,
    force: bool,
) -> metrics::Result<SyncOutcome> {
    if !force && is_fresh(storage, cache_ttl_hours) {
        info!("Last sync is still within the cache window, skipping the remote fetch");
        return Ok(SyncOutcome::Fresh);
    }

    let snapshot_path = provider.fetch().await?;
    let snapshot_filename = snapshot_path
        .file_name()
        .and_then(|e| e.to_str())
        .map(str::to_string)
        .ok_or_else(|| MetricsError::Processing(format!("invalid snapshot path {:?}", snapshot_path)))?;

    debug!("Processing downloaded snapshot {}", snapshot_filename);
    let result = manager.process_new_data(snapshot_filename.as_str());

    // the transient snapshot is removed on both the success and failure path
    match storage.delete_path(snapshot_filename.as_str()) {
        Ok(()) => debug!("Deleted transient snapshot {}", snapshot_filename),
        Err(e) => warn!("Unable to delete transient snapshot {}, {}", snapshot_filename, e),
    }

    match result? {
        Some(filename) => {
            update_state(storage);
            Ok(SyncOutcome::Saved(filename))
        }
        None => {
            update_state(storage);
            Ok(SyncOutcome::NoNewData)
        }
    }
}

/// Verify if the last completed sync is still within the cache window.
fn is_fresh(storage: &Storage, cache_ttl_hours: i64) -> bool {
    match storage.options().serializer(SYNC_STATE_FILENAME).read::<SyncState>() {
        Ok(state) => {
            let age = Local::now() - state.last_sync;
            trace!("Last sync completed {} minutes ago", age.num_minutes());
            age < Duration::hours(cache_ttl_hours)
        }
        Err(e) => {
            trace!("No sync state available, {}", e);
            false
        }
    }
}

fn update_state(storage: &Storage) {
    let state = SyncState {
        last_sync: Local::now(),
    };

    match storage
        .options()
        .make_dirs(true)
        .serializer(SYNC_STATE_FILENAME)
        .write(&state)
    {
        Ok(_) => debug!("Sync state has been updated"),
        Err(e) => warn!("Unable to update the sync state, {}", e),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::NaiveDate;
    use tempfile::tempdir;

    use copilot_fx_core::core::metrics::DailyMetrics;
    use copilot_fx_core::init_logger;
    use copilot_fx_core::testing::{write_test_file, MockMetricsProvider};

    use super::*;

    fn metrics_json(days: &[NaiveDate]) -> String {
        let records: Vec<DailyMetrics> = days.iter().map(|e| DailyMetrics::empty(*e)).collect();
        serde_json::to_string(&records).unwrap()
    }

    fn day(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn snapshot_provider(path: PathBuf) -> MockMetricsProvider {
        let mut provider = MockMetricsProvider::new();
        provider.expect_fetch().returning(move || Ok(path.clone()));
        provider
    }

    #[tokio::test]
    async fn test_run_sync() {
        init_logger!();
        let temp_dir = tempdir().unwrap();
        let temp_path = temp_dir.path().to_str().unwrap();
        let snapshot_path = write_test_file(
            temp_dir.path(),
            "metrics_20241101_220634.json",
            metrics_json(&[day(2024, 11, 1), day(2024, 11, 2)]).as_str(),
        );
        let provider = snapshot_provider(snapshot_path.clone());
        let manager = MetricsManager::new(temp_path);
        let storage = Storage::from(temp_path);

        let result = run_sync(&provider, &manager, &storage, 12, false)
            .await
            .expect("expected the sync to have succeeded");

        assert_eq!(SyncOutcome::Saved("data_2024-11-02.json".to_string()), result);
        assert_eq!(false, snapshot_path.exists(), "expected the transient snapshot to have been deleted");
        assert!(
            temp_dir.path().join(SYNC_STATE_FILENAME).exists(),
            "expected the sync state to have been updated"
        )
    }

    #[tokio::test]
    async fn test_run_sync_no_new_data() {
        init_logger!();
        let temp_dir = tempdir().unwrap();
        let temp_path = temp_dir.path().to_str().unwrap();
        write_test_file(
            temp_dir.path(),
            "data_2024-11-02.json",
            metrics_json(&[day(2024, 11, 2)]).as_str(),
        );
        let snapshot_path = write_test_file(
            temp_dir.path(),
            "metrics_20241102_220634.json",
            metrics_json(&[day(2024, 11, 1), day(2024, 11, 2)]).as_str(),
        );
        let provider = snapshot_provider(snapshot_path.clone());
        let manager = MetricsManager::new(temp_path);
        let storage = Storage::from(temp_path);

        let result = run_sync(&provider, &manager, &storage, 12, false)
            .await
            .expect("expected the sync to have succeeded");

        assert_eq!(SyncOutcome::NoNewData, result);
        assert_eq!(false, snapshot_path.exists(), "expected the transient snapshot to have been deleted")
    }

    #[tokio::test]
    async fn test_run_sync_removes_snapshot_on_merge_failure() {
        init_logger!();
        let temp_dir = tempdir().unwrap();
        let temp_path = temp_dir.path().to_str().unwrap();
        let snapshot_path = write_test_file(temp_dir.path(), "metrics_20241101_220634.json", "{invalid");
        let provider = snapshot_provider(snapshot_path.clone());
        let manager = MetricsManager::new(temp_path);
        let storage = Storage::from(temp_path);

        let result = run_sync(&provider, &manager, &storage, 12, false).await;

        match result.err().expect("expected an error to be returned") {
            MetricsError::Processing(_) => {}
            _ => assert!(false, "expected MetricsError::Processing to be returned"),
        }
        assert_eq!(false, snapshot_path.exists(), "expected the transient snapshot to have been deleted")
    }

    #[tokio::test]
    async fn test_run_sync_fetch_failure() {
        init_logger!();
        let temp_dir = tempdir().unwrap();
        let temp_path = temp_dir.path().to_str().unwrap();
        let mut provider = MockMetricsProvider::new();
        provider.expect_fetch().returning(|| {
            Err(MetricsError::Fetch {
                status: 500,
                body: "server error".to_string(),
            })
        });
        let manager = MetricsManager::new(temp_path);
        let storage = Storage::from(temp_path);

        let result = run_sync(&provider, &manager, &storage, 12, false).await;

        match result.err().expect("expected an error to be returned") {
            MetricsError::Fetch { status, .. } => assert_eq!(500, status),
            _ => assert!(false, "expected MetricsError::Fetch to be returned"),
        }
    }

    #[tokio::test]
    async fn test_run_sync_fresh_state_skips_fetch() {
        init_logger!();
        let temp_dir = tempdir().unwrap();
        let temp_path = temp_dir.path().to_str().unwrap();
        let storage = Storage::from(temp_path);
        update_state(&storage);
        let mut provider = MockMetricsProvider::new();
        provider.expect_fetch().never();
        let manager = MetricsManager::new(temp_path);

        let result = run_sync(&provider, &manager, &storage, 12, false)
            .await
            .expect("expected the sync to have succeeded");

        assert_eq!(SyncOutcome::Fresh, result)
    }

    #[tokio::test]
    async fn test_run_sync_force_ignores_fresh_state() {
        init_logger!();
        let temp_dir = tempdir().unwrap();
        let temp_path = temp_dir.path().to_str().unwrap();
        let storage = Storage::from(temp_path);
        update_state(&storage);
        let snapshot_path = write_test_file(
            temp_dir.path(),
            "metrics_20241101_220634.json",
            metrics_json(&[day(2024, 11, 1)]).as_str(),
        );
        let provider = snapshot_provider(snapshot_path);
        let manager = MetricsManager::new(temp_path);

        let result = run_sync(&provider, &manager, &storage, 12, true)
            .await
            .expect("expected the sync to have succeeded");

        assert_eq!(SyncOutcome::Saved("data_2024-11-01.json".to_string()), result)
    }
}
