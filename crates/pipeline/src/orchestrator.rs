//! Import job driver.
//!
//! [`ImportService::start`] admits a job and spawns an [`ImportOrchestrator`]
//! on its own task. The orchestrator walks the workbook sheet by sheet, in
//! workbook order, writing each sheet in fixed-size batches separated by a
//! fixed delay. Failures are contained at the narrowest level: a row, a
//! batch, a sheet, and only then the whole job.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use callboard_core::import::{ProgressSnapshot, DELAY_BETWEEN_BATCHES_MS, MAX_BATCH_SIZE};
use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::batch_writer::{process_batch, BatchContext};
use crate::error::ImportError;
use crate::job_store::ImportJobStore;
use crate::resolver::EntityResolver;
use crate::store::ImportStore;
use crate::workbook::Workbook;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Batch pacing for an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSettings {
    /// Rows per transaction. Never zero.
    pub batch_size: usize,
    /// Pause between two batches of the same sheet.
    pub batch_delay: Duration,
}

impl ImportSettings {
    /// Build settings, clamping a zero batch size to 1.
    pub fn new(batch_size: usize, batch_delay: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batch_delay,
        }
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self::new(
            MAX_BATCH_SIZE,
            Duration::from_millis(DELAY_BETWEEN_BATCHES_MS),
        )
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Entry point used by the HTTP layer.
#[derive(Clone)]
pub struct ImportService {
    store: Arc<dyn ImportStore>,
    jobs: Arc<ImportJobStore>,
    settings: ImportSettings,
}

/// An admitted job: its initial snapshot and the task running it.
pub struct StartedImport {
    pub snapshot: ProgressSnapshot,
    pub handle: JoinHandle<()>,
}

enum Source {
    Bytes(Vec<u8>),
    #[cfg(test)]
    Parsed(Workbook),
}

impl ImportService {
    pub fn new(
        store: Arc<dyn ImportStore>,
        jobs: Arc<ImportJobStore>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            store,
            jobs,
            settings,
        }
    }

    pub fn jobs(&self) -> &Arc<ImportJobStore> {
        &self.jobs
    }

    pub fn settings(&self) -> ImportSettings {
        self.settings
    }

    /// Admit an upload and run it in the background.
    ///
    /// Returns [`ImportError::AlreadyRunning`] without side effects if a job
    /// already holds the slot.
    pub fn start(&self, file_name: &str, bytes: Vec<u8>) -> Result<StartedImport, ImportError> {
        self.spawn(file_name, Source::Bytes(bytes))
    }

    /// Like [`start`](Self::start) for a workbook that is already decoded.
    #[cfg(test)]
    pub(crate) fn start_parsed(
        &self,
        file_name: &str,
        workbook: Workbook,
    ) -> Result<StartedImport, ImportError> {
        self.spawn(file_name, Source::Parsed(workbook))
    }

    fn spawn(&self, file_name: &str, source: Source) -> Result<StartedImport, ImportError> {
        let snapshot = self.jobs.try_begin(file_name)?;
        let job_id = snapshot.job_id.clone().unwrap_or_default();

        let orchestrator = ImportOrchestrator {
            store: Arc::clone(&self.store),
            jobs: Arc::clone(&self.jobs),
            settings: self.settings,
            job_id,
        };
        let handle = tokio::spawn(orchestrator.run(source));

        Ok(StartedImport { snapshot, handle })
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs one admitted job to its terminal state.
pub struct ImportOrchestrator {
    store: Arc<dyn ImportStore>,
    jobs: Arc<ImportJobStore>,
    settings: ImportSettings,
    job_id: String,
}

impl ImportOrchestrator {
    async fn run(self, source: Source) {
        // A panic anywhere in the job still has to release the slot.
        let outcome = match AssertUnwindSafe(self.execute(source)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => Err(ImportError::Internal(format!(
                "import task panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };
        if let Err(e) = &outcome {
            tracing::error!(job_id = %self.job_id, error = %e, "Import job failed");
        }

        let last = self.jobs.finalize(outcome);
        tracing::info!(
            job_id = %self.job_id,
            status = last.status.as_str(),
            total_rows = last.total_rows,
            successful_rows = last.successful_rows,
            failed_rows = last.failed_rows,
            "Import job finished",
        );
    }

    async fn execute(&self, source: Source) -> Result<(), ImportError> {
        let workbook = match source {
            Source::Bytes(bytes) => decode(bytes).await?,
            #[cfg(test)]
            Source::Parsed(workbook) => workbook,
        };

        let total = workbook.total_rows() as u64;
        self.jobs.update(|s| s.total_rows = total);
        tracing::info!(
            job_id = %self.job_id,
            sheets = workbook.sheets.len(),
            total_rows = total,
            "Workbook decoded",
        );
        if total == 0 {
            return Ok(());
        }

        let resolver = EntityResolver::new(self.store.as_ref());
        for sheet in &workbook.sheets {
            if !self.jobs.is_processing() {
                tracing::warn!(job_id = %self.job_id, "Import no longer processing, stopping");
                break;
            }
            if sheet.rows.is_empty() {
                tracing::debug!(job_id = %self.job_id, clinic = %sheet.name, "Skipping empty sheet");
                continue;
            }

            self.jobs
                .update(|s| s.current_sheet = Some(sheet.name.clone()));

            let clinic = match resolver.ensure_clinic(&sheet.name).await {
                Ok(clinic) => clinic,
                Err(e) => {
                    tracing::error!(
                        job_id = %self.job_id,
                        clinic = %sheet.name,
                        rows = sheet.rows.len(),
                        error = %e,
                        "Clinic resolution failed, skipping sheet",
                    );
                    let skipped = sheet.rows.len() as u64;
                    self.jobs.update(|s| s.skip_rows(skipped));
                    continue;
                }
            };

            for (index, chunk) in sheet.rows.chunks(self.settings.batch_size).enumerate() {
                if index > 0 && !self.settings.batch_delay.is_zero() {
                    tokio::time::sleep(self.settings.batch_delay).await;
                }

                let ctx = BatchContext {
                    job_id: &self.job_id,
                    clinic_id: clinic.id,
                    clinic_name: &sheet.name,
                    first_row: index * self.settings.batch_size,
                };
                let result = process_batch(self.store.as_ref(), &self.jobs, chunk, &ctx).await;
                self.jobs.update(|s| s.apply_batch(&result));
            }
        }

        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// Decode off the async workers; large workbooks take a while.
async fn decode(bytes: Vec<u8>) -> Result<Workbook, ImportError> {
    tokio::task::spawn_blocking(move || Workbook::from_bytes(&bytes))
        .await
        .map_err(|e| ImportError::Internal(format!("workbook decoding task failed: {e}")))?
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use callboard_core::import::ImportStatus;
    use callboard_core::normalizer::{RawRow, RawValue};
    use callboard_events::ProgressHub;
    use tokio::time::Instant;

    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::workbook::Sheet;

    fn row(call_id: &str, assistant: &str) -> RawRow {
        [
            ("call_id", RawValue::from(call_id)),
            ("call_start_time", RawValue::from("2023-01-02T09:00:00Z")),
            ("assistant", RawValue::from(assistant)),
        ]
        .into_iter()
        .collect()
    }

    fn sheet(name: &str, rows: Vec<RawRow>) -> Sheet {
        Sheet {
            name: name.to_string(),
            rows,
        }
    }

    fn service(store: Arc<MemoryStore>, settings: ImportSettings) -> ImportService {
        let jobs = Arc::new(ImportJobStore::new(Arc::new(ProgressHub::new())));
        ImportService::new(store, jobs, settings)
    }

    fn fast() -> ImportSettings {
        ImportSettings::new(50, Duration::ZERO)
    }

    async fn run_to_end(service: &ImportService, workbook: Workbook) -> ProgressSnapshot {
        let started = service.start_parsed("calls.xlsx", workbook).unwrap();
        started.handle.await.unwrap();
        service.jobs().snapshot()
    }

    fn assert_counters_consistent(s: &ProgressSnapshot) {
        assert_eq!(s.successful_rows + s.failed_rows, s.processed_rows);
        assert_eq!(s.processed_rows, s.total_rows);
    }

    #[tokio::test]
    async fn two_clinics_with_one_invalid_row() {
        let store = Arc::new(MemoryStore::new());
        let service = service(Arc::clone(&store), fast());
        let workbook = Workbook {
            sheets: vec![
                sheet("ClinicA", vec![row("a1", "x"), row("a2", "x"), row("a3", "y")]),
                sheet("ClinicB", vec![row("", "x")]),
            ],
        };

        let done = run_to_end(&service, workbook).await;

        assert_eq!(done.status, ImportStatus::Completed);
        assert!(!done.in_progress);
        assert_eq!(done.total_rows, 4);
        assert_eq!(done.successful_rows, 3);
        assert_eq!(done.failed_rows, 1);
        assert!(done.current_sheet.is_none());
        assert!(done.end_time.is_some());
        assert_counters_consistent(&done);
        assert_eq!(store.clinic_names(), vec!["ClinicA", "ClinicB"]);
    }

    #[tokio::test]
    async fn legacy_agent_referenced_twice_is_reused() {
        let store = Arc::new(MemoryStore::new());
        let legacy_id = store.insert_legacy_agent("agent_7");
        let service = service(Arc::clone(&store), ImportSettings::new(1, Duration::ZERO));
        let workbook = Workbook {
            sheets: vec![sheet("ClinicA", vec![row("c1", "agent_7"), row("c2", "agent_7")])],
        };

        run_to_end(&service, workbook).await;

        let agents = store.agents();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].external_id.as_deref(), Some("agent_7"));
        assert_eq!(store.call("c1").unwrap().agent_id, Some(legacy_id));
        assert_eq!(store.call("c2").unwrap().agent_id, Some(legacy_id));
    }

    #[tokio::test]
    async fn empty_workbook_completes_immediately() {
        let store = Arc::new(MemoryStore::new());
        let service = service(Arc::clone(&store), fast());

        let done = run_to_end(&service, Workbook::default()).await;

        assert_eq!(done.status, ImportStatus::Completed);
        assert_eq!(done.total_rows, 0);
        assert!(!store.company_created());
    }

    #[tokio::test]
    async fn empty_sheet_is_skipped_without_a_clinic() {
        let store = Arc::new(MemoryStore::new());
        let service = service(Arc::clone(&store), fast());
        let workbook = Workbook {
            sheets: vec![sheet("Empty", vec![]), sheet("ClinicA", vec![row("c1", "")])],
        };

        let done = run_to_end(&service, workbook).await;

        assert_eq!(done.successful_rows, 1);
        assert_eq!(store.clinic_names(), vec!["ClinicA"]);
    }

    #[tokio::test]
    async fn clinic_failure_skips_only_that_sheet() {
        let store = Arc::new(MemoryStore::new());
        store.fail_clinic("Broken");
        let service = service(Arc::clone(&store), fast());
        let workbook = Workbook {
            sheets: vec![
                sheet("Broken", vec![row("b1", ""), row("b2", "")]),
                sheet("ClinicA", vec![row("a1", "")]),
            ],
        };

        let done = run_to_end(&service, workbook).await;

        assert_eq!(done.status, ImportStatus::Completed);
        assert_eq!(done.failed_rows, 2);
        assert_eq!(done.successful_rows, 1);
        assert_counters_consistent(&done);
        assert!(store.call("b1").is_none());
        assert!(store.call("a1").is_some());
    }

    #[tokio::test]
    async fn failed_batch_does_not_stop_the_job() {
        let store = Arc::new(MemoryStore::new());
        store.fail_call("c2");
        let service = service(Arc::clone(&store), ImportSettings::new(2, Duration::ZERO));
        let workbook = Workbook {
            sheets: vec![sheet(
                "ClinicA",
                vec![row("c1", ""), row("c2", ""), row("c3", "")],
            )],
        };

        let done = run_to_end(&service, workbook).await;

        assert_eq!(done.status, ImportStatus::Completed);
        assert_eq!(done.failed_rows, 2);
        assert_eq!(done.successful_rows, 1);
        assert_counters_consistent(&done);
        assert_eq!(store.upsert_invocations(), 2);
        assert!(store.call("c3").is_some());
    }

    #[tokio::test]
    async fn real_xlsx_upload_is_imported() {
        let store = Arc::new(MemoryStore::new());
        let service = service(Arc::clone(&store), fast());

        let started = service
            .start("calls.xlsx", crate::workbook::fixtures::two_clinics_xlsx())
            .unwrap();
        assert_eq!(started.snapshot.status, ImportStatus::Processing);
        started.handle.await.unwrap();
        let done = service.jobs().snapshot();

        assert_eq!(done.status, ImportStatus::Completed);
        assert_eq!(done.total_rows, 4);
        assert_eq!(done.successful_rows, 3);
        assert_eq!(done.failed_rows, 1);
        assert_counters_consistent(&done);
        assert_eq!(store.clinic_names(), vec!["ClinicA", "ClinicB"]);

        let numeric = store.call("12345").unwrap();
        assert_eq!(
            numeric.fields.call_start_time.to_rfc3339(),
            "2023-01-02T09:30:00+00:00"
        );
        assert_eq!(numeric.fields.duration_seconds, Some(93.5));
        assert_eq!(
            store.call("c2").unwrap().fields.call_start_time.to_rfc3339(),
            "2022-12-31T06:00:00+00:00"
        );
        assert!(store.call("c3").is_some());
        // Both ClinicA rows name the same assistant.
        assert_eq!(store.agents().len(), 1);
    }

    #[tokio::test]
    async fn malformed_upload_ends_in_error() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store, fast());

        let started = service.start("calls.xlsx", b"not a workbook".to_vec()).unwrap();
        started.handle.await.unwrap();
        let done = service.jobs().snapshot();

        assert_eq!(done.status, ImportStatus::Error);
        assert!(!done.in_progress);
        assert!(done.error.unwrap().starts_with("Failed to read workbook"));
    }

    #[tokio::test]
    async fn panic_inside_job_finalizes_as_error() {
        let store = Arc::new(MemoryStore::new());
        store.panic_on_clinic("Cursed");
        let service = service(Arc::clone(&store), fast());
        let workbook = Workbook {
            sheets: vec![sheet("Cursed", vec![row("c1", "")])],
        };

        let done = run_to_end(&service, workbook).await;

        assert_eq!(done.status, ImportStatus::Error);
        assert!(!done.in_progress);
        assert!(done.end_time.is_some());
        let error = done.error.unwrap();
        assert!(error.contains("import task panicked"), "{error}");
        assert!(error.contains("Cursed"), "{error}");
        // The slot is free again.
        assert!(service.start_parsed("next.xlsx", Workbook::default()).is_ok());
    }

    #[tokio::test]
    async fn second_start_while_running_conflicts() {
        let store = Arc::new(MemoryStore::new());
        let service = service(store, ImportSettings::new(1, Duration::from_secs(60)));
        let workbook = Workbook {
            sheets: vec![sheet("ClinicA", vec![row("c1", ""), row("c2", "")])],
        };

        let started = service.start_parsed("first.xlsx", workbook).unwrap();
        let before = service.jobs().snapshot();
        let second = service.start_parsed("second.xlsx", Workbook::default());

        match second {
            Err(ImportError::AlreadyRunning(current)) => {
                assert_eq!(current.job_id, started.snapshot.job_id);
                assert_eq!(current.file_name.as_deref(), Some("first.xlsx"));
            }
            _ => panic!("expected a conflict"),
        }
        assert_eq!(service.jobs().snapshot().job_id, before.job_id);
        started.handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn batches_are_paced_by_the_delay() {
        let store = Arc::new(MemoryStore::new());
        let service = service(
            Arc::clone(&store),
            ImportSettings::new(1, Duration::from_secs(1)),
        );
        let workbook = Workbook {
            sheets: vec![sheet("ClinicA", vec![row("c1", ""), row("c2", ""), row("c3", "")])],
        };

        let begin = Instant::now();
        let done = run_to_end(&service, workbook).await;

        assert_eq!(done.successful_rows, 3);
        // Three batches, two pauses between them.
        assert_eq!(begin.elapsed().as_secs(), 2);
    }

    #[tokio::test]
    async fn aborted_job_stops_between_sheets() {
        let store = Arc::new(MemoryStore::new());
        let service = service(
            Arc::clone(&store),
            ImportSettings::new(1, Duration::from_millis(50)),
        );
        let workbook = Workbook {
            sheets: vec![
                sheet("ClinicA", vec![row("a1", ""), row("a2", "")]),
                sheet("ClinicB", vec![row("b1", "")]),
            ],
        };

        let started = service.start_parsed("calls.xlsx", workbook).unwrap();
        service.jobs().abort("stopped by operator");
        started.handle.await.unwrap();
        let done = service.jobs().snapshot();

        assert_eq!(done.status, ImportStatus::Error);
        assert_eq!(done.error.as_deref(), Some("stopped by operator"));
        assert!(!done.in_progress);
        assert!(store.call("b1").is_none());
    }

    #[tokio::test]
    async fn reimport_updates_without_duplicating() {
        let store = Arc::new(MemoryStore::new());
        let service = service(Arc::clone(&store), fast());
        let first = Workbook {
            sheets: vec![sheet("ClinicA", vec![row("c1", "a"), row("c2", "a")])],
        };
        let second = Workbook {
            sheets: vec![sheet("ClinicB", vec![row("c1", "b"), row("c2", "b")])],
        };

        run_to_end(&service, first).await;
        let clinic_a = store.call("c1").unwrap().clinic_id;
        let done = run_to_end(&service, second).await;

        assert_eq!(done.status, ImportStatus::Completed);
        assert_eq!(store.call_count(), 2);
        // The clinic link set on creation survives the second pass.
        assert_eq!(store.call("c1").unwrap().clinic_id, clinic_a);
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        assert_eq!(ImportSettings::new(0, Duration::ZERO).batch_size, 1);
        assert_eq!(ImportSettings::default().batch_size, 50);
        assert_eq!(ImportSettings::default().batch_delay, Duration::from_secs(1));
    }
}
