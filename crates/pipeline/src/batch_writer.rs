//! Turns one chunk of raw rows into at most one transactional write.

use callboard_core::call::NormalizedCallRecord;
use callboard_core::import::{call_id_display, BatchResult};
use callboard_core::normalizer::{normalize_row, source_call_id, RawRow, RowRejection};
use callboard_core::types::DbId;

use crate::job_store::ImportJobStore;
use crate::resolver::EntityResolver;
use crate::store::ImportStore;

/// Where a batch belongs, for resolution and log context.
#[derive(Debug, Clone, Copy)]
pub struct BatchContext<'a> {
    pub job_id: &'a str,
    pub clinic_id: DbId,
    pub clinic_name: &'a str,
    /// Sheet index of the first row in the batch.
    pub first_row: usize,
}

/// Normalize every row of `rows` and upsert the valid ones together.
///
/// `processed_rows` is bumped on the job store as each row is handled.
/// Rejected rows are counted as failed and left out of the write. If the
/// write fails, every row that was part of it is counted as failed too.
///
/// Runs inside an `import_batch` span so every event logged while handling
/// the batch, date warnings included, carries the job and clinic.
#[tracing::instrument(
    name = "import_batch",
    skip_all,
    fields(job_id = %ctx.job_id, clinic = %ctx.clinic_name, first_row = ctx.first_row)
)]
pub async fn process_batch(
    store: &dyn ImportStore,
    jobs: &ImportJobStore,
    rows: &[RawRow],
    ctx: &BatchContext<'_>,
) -> BatchResult {
    let resolver = EntityResolver::new(store);
    let mut result = BatchResult::default();
    let mut records = Vec::with_capacity(rows.len());

    for (offset, row) in rows.iter().enumerate() {
        jobs.update(|s| s.processed_rows += 1);
        let row_index = ctx.first_row + offset;

        match prepare_record(&resolver, row, ctx.clinic_id).await {
            Ok(record) => {
                tracing::debug!(
                    job_id = ctx.job_id,
                    clinic = ctx.clinic_name,
                    row = row_index,
                    call_id = %call_id_display(&record.fields.source_call_id),
                    "Row prepared",
                );
                records.push(record);
            }
            Err(rejection) => {
                tracing::warn!(
                    job_id = ctx.job_id,
                    clinic = ctx.clinic_name,
                    row = row_index,
                    call_id = %call_id_display(&source_call_id(row)),
                    reason = %rejection,
                    "Row rejected",
                );
                result.failed_rows += 1;
            }
        }
    }

    if records.is_empty() {
        return result;
    }

    let attempted = records.len() as u64;
    match store.upsert_calls(&records).await {
        Ok(_) => result.successful_rows += attempted,
        Err(e) => {
            tracing::error!(
                job_id = ctx.job_id,
                clinic = ctx.clinic_name,
                first_row = ctx.first_row,
                rows = attempted,
                error = %e,
                "Batch rolled back",
            );
            result.failed_rows += attempted;
        }
    }
    result
}

async fn prepare_record(
    resolver: &EntityResolver<'_>,
    row: &RawRow,
    clinic_id: DbId,
) -> Result<NormalizedCallRecord, RowRejection> {
    let normalized = normalize_row(row)?;
    let agent_id = resolver
        .ensure_agent(normalized.assistant.as_deref())
        .await
        .map_err(|e| RowRejection::AgentResolution(e.to_string()))?;

    Ok(NormalizedCallRecord {
        clinic_id,
        agent_id,
        fields: normalized.fields,
    })
}
