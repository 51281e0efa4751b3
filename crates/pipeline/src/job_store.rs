//! Owner of the single import slot and its progress snapshot.
//!
//! Every mutation goes through [`ImportJobStore`], which publishes the new
//! snapshot to the [`ProgressHub`] while still holding the lock, so
//! subscribers observe changes in the order they were made.

use std::sync::Arc;

use callboard_core::import::{generate_job_id, ImportStatus, ProgressSnapshot};
use callboard_events::ProgressHub;
use chrono::Utc;
use parking_lot::Mutex;

use crate::error::ImportError;

pub struct ImportJobStore {
    state: Mutex<ProgressSnapshot>,
    hub: Arc<ProgressHub>,
}

impl ImportJobStore {
    pub fn new(hub: Arc<ProgressHub>) -> Self {
        Self {
            state: Mutex::new(ProgressSnapshot::default()),
            hub,
        }
    }

    pub fn hub(&self) -> &Arc<ProgressHub> {
        &self.hub
    }

    /// Copy of the current snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.lock().clone()
    }

    /// `true` while the current job is still in the `processing` state.
    pub fn is_processing(&self) -> bool {
        self.state.lock().status == ImportStatus::Processing
    }

    /// Admit a new job if the slot is free.
    ///
    /// On success the snapshot is reset to a fresh `processing` job and
    /// published. If a job is already in flight nothing changes and the
    /// existing snapshot is returned inside [`ImportError::AlreadyRunning`].
    pub fn try_begin(&self, file_name: &str) -> Result<ProgressSnapshot, ImportError> {
        let mut state = self.state.lock();
        if state.in_progress {
            return Err(ImportError::AlreadyRunning(Box::new(state.clone())));
        }

        *state = ProgressSnapshot::started(generate_job_id(), file_name.to_string(), Utc::now());
        self.hub.publish(&state);
        tracing::info!(
            job_id = state.job_id.as_deref().unwrap_or_default(),
            file_name,
            "Import job admitted"
        );
        Ok(state.clone())
    }

    /// Apply `f` to the snapshot and publish the result.
    pub fn update<F>(&self, f: F) -> ProgressSnapshot
    where
        F: FnOnce(&mut ProgressSnapshot),
    {
        let mut state = self.state.lock();
        f(&mut *state);
        self.hub.publish(&state);
        state.clone()
    }

    /// Force the running job into the `error` state.
    ///
    /// The job keeps its slot until its task notices the change and
    /// finalizes. Returns `false` if no job is running.
    pub fn abort(&self, reason: &str) -> bool {
        let mut state = self.state.lock();
        if state.status != ImportStatus::Processing {
            return false;
        }
        state.status = ImportStatus::Error;
        state.error = Some(reason.to_string());
        self.hub.publish(&state);
        tracing::warn!(
            job_id = state.job_id.as_deref().unwrap_or_default(),
            reason,
            "Import job aborted"
        );
        true
    }

    /// Move the job into its terminal state and release the slot.
    ///
    /// An `Err` outcome, or a job already forced to `error`, ends in `error`;
    /// otherwise the job completes. Does nothing if the slot is already free.
    pub fn finalize(&self, outcome: Result<(), ImportError>) -> ProgressSnapshot {
        let mut state = self.state.lock();
        if !state.in_progress {
            return state.clone();
        }

        let (status, error) = match outcome {
            Err(e) => (ImportStatus::Error, Some(e.to_string())),
            Ok(()) if state.status == ImportStatus::Error => {
                (ImportStatus::Error, state.error.take())
            }
            Ok(()) => (ImportStatus::Completed, None),
        };
        state.finish(status, error, Utc::now());
        self.hub.publish(&state);
        state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn store() -> (ImportJobStore, Arc<ProgressHub>) {
        let hub = Arc::new(ProgressHub::new());
        (ImportJobStore::new(Arc::clone(&hub)), hub)
    }

    #[tokio::test]
    async fn begin_resets_and_publishes() {
        let (jobs, hub) = store();
        let mut sub = hub.subscribe();

        let started = jobs.try_begin("calls.xlsx").unwrap();

        assert!(started.in_progress);
        assert_eq!(started.status, ImportStatus::Processing);
        assert_eq!(started.file_name.as_deref(), Some("calls.xlsx"));
        assert!(started.job_id.is_some());
        assert_eq!(sub.recv().await.unwrap(), started);
    }

    #[test]
    fn second_begin_conflicts_without_mutation() {
        let (jobs, _hub) = store();
        let first = jobs.try_begin("a.xlsx").unwrap();
        jobs.update(|s| s.processed_rows = 3);
        let before = jobs.snapshot();

        let err = jobs.try_begin("b.xlsx").unwrap_err();

        assert_matches!(err, ImportError::AlreadyRunning(current) => {
            assert_eq!(*current, before);
            assert_eq!(current.job_id, first.job_id);
        });
        assert_eq!(jobs.snapshot(), before);
    }

    #[test]
    fn finalize_completes_and_frees_slot() {
        let (jobs, _hub) = store();
        jobs.try_begin("a.xlsx").unwrap();
        jobs.update(|s| s.current_sheet = Some("ClinicA".into()));

        let done = jobs.finalize(Ok(()));

        assert_eq!(done.status, ImportStatus::Completed);
        assert!(!done.in_progress);
        assert!(done.current_sheet.is_none());
        assert!(done.end_time.is_some());
        assert!(jobs.try_begin("b.xlsx").is_ok());
    }

    #[test]
    fn finalize_with_error_records_message() {
        let (jobs, _hub) = store();
        jobs.try_begin("a.xlsx").unwrap();

        let done = jobs.finalize(Err(ImportError::Workbook("bad zip".into())));

        assert_eq!(done.status, ImportStatus::Error);
        assert_eq!(done.error.as_deref(), Some("Failed to read workbook: bad zip"));
    }

    #[test]
    fn aborted_job_finalizes_as_error_and_keeps_slot_until_then() {
        let (jobs, _hub) = store();
        jobs.try_begin("a.xlsx").unwrap();

        assert!(jobs.abort("server shutting down"));
        assert!(!jobs.is_processing());
        assert!(jobs.snapshot().in_progress);
        assert!(jobs.try_begin("b.xlsx").is_err());

        let done = jobs.finalize(Ok(()));
        assert_eq!(done.status, ImportStatus::Error);
        assert_eq!(done.error.as_deref(), Some("server shutting down"));
        assert!(!done.in_progress);
    }

    #[tokio::test]
    async fn finalize_publishes_exactly_once() {
        let (jobs, hub) = store();
        jobs.try_begin("a.xlsx").unwrap();
        let mut sub = hub.subscribe();

        jobs.finalize(Ok(()));
        jobs.finalize(Ok(()));
        hub.shutdown_all();

        assert_eq!(sub.recv().await.unwrap().status, ImportStatus::Completed);
        assert!(sub.recv().await.is_none());
    }

    #[test]
    fn abort_without_job_is_noop() {
        let (jobs, _hub) = store();
        assert!(!jobs.abort("nothing running"));
        assert_eq!(jobs.snapshot().status, ImportStatus::Idle);
    }
}
