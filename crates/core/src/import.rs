//! Import job constants, status values and the progress snapshot.
//!
//! The [`ProgressSnapshot`] is the single record describing the current (or
//! most recent) spreadsheet import. It is what the status endpoint returns and
//! what every progress subscriber receives, so its JSON shape is part of the
//! public API.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ── Constants ────────────────────────────────────────────────────────

/// Number of rows committed per transaction.
pub const MAX_BATCH_SIZE: usize = 50;

/// Pause between two consecutive batches of the same sheet, in milliseconds.
pub const DELAY_BETWEEN_BATCHES_MS: u64 = 1000;

/// File extensions accepted by the upload endpoint.
pub const ACCEPTED_EXTENSIONS: &[&str] = &[".xlsx", ".xls"];

/// Number of characters of a call id shown in log lines.
const CALL_ID_DISPLAY_LEN: usize = 10;

// ── Status ───────────────────────────────────────────────────────────

/// Lifecycle state of an import job.
///
/// `Idle -> Processing -> {Completed, Error}`. A fresh job always starts from
/// a reset snapshot, so `Idle` is only observed before the first upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    #[default]
    Idle,
    Processing,
    Completed,
    Error,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// `true` for the two states a job can end in.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

// ── Progress snapshot ────────────────────────────────────────────────

/// Serialized state of the current or last import job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub in_progress: bool,
    pub job_id: Option<String>,
    pub status: ImportStatus,
    pub file_name: Option<String>,
    pub total_rows: u64,
    pub processed_rows: u64,
    pub successful_rows: u64,
    pub failed_rows: u64,
    pub current_sheet: Option<String>,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub error: Option<String>,
}

impl ProgressSnapshot {
    /// Snapshot of a job that has just been admitted.
    pub fn started(job_id: String, file_name: String, now: Timestamp) -> Self {
        Self {
            in_progress: true,
            job_id: Some(job_id),
            status: ImportStatus::Processing,
            file_name: Some(file_name),
            start_time: Some(now),
            ..Self::default()
        }
    }

    /// Move the job into a terminal state.
    ///
    /// Clears the current sheet, stamps the end time and releases the
    /// single-flight slot.
    pub fn finish(&mut self, status: ImportStatus, error: Option<String>, now: Timestamp) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.error = error;
        self.end_time = Some(now);
        self.in_progress = false;
        self.current_sheet = None;
    }

    /// Fold the outcome of one committed (or rolled back) batch.
    pub fn apply_batch(&mut self, result: &BatchResult) {
        self.successful_rows += result.successful_rows;
        self.failed_rows += result.failed_rows;
    }

    /// Rows that can no longer be attempted (e.g. the clinic could not be
    /// resolved) count as both processed and failed.
    pub fn skip_rows(&mut self, count: u64) {
        self.processed_rows += count;
        self.failed_rows += count;
    }
}

// ── Batch result ─────────────────────────────────────────────────────

/// Outcome of one batch; folded into the snapshot, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub successful_rows: u64,
    pub failed_rows: u64,
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Generate an opaque, unique job id.
pub fn generate_job_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

/// `true` if `file_name` ends with one of [`ACCEPTED_EXTENSIONS`]
/// (case-insensitive).
pub fn is_accepted_file_name(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    ACCEPTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Short form of a call id for log lines; `MISSING` when absent.
pub fn call_id_display(call_id: &str) -> String {
    let trimmed = call_id.trim();
    if trimmed.is_empty() {
        return "MISSING".to_string();
    }
    trimmed.chars().take(CALL_ID_DISPLAY_LEN).collect()
}
