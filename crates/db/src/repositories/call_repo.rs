use sqlx::PgPool;
use callboard_core::call::NormalizedCallRecord;
use callboard_core::types::DbId;

use crate::models::call::{Call, CallDetail, ReviewQueueFilter, UpdateCallReview};

/// Column list for `calls`.
const COLUMNS: &str = "id, source_call_id, clinic_id, agent_id, call_start_time, ended_reason, \
     customer_phone_number, duration_seconds, call_ended_time, call_date, recording_url, \
     summary, vapi_score, check_status, evaluation, feedback, sentiment, protocol_adherence, \
     llm_feedback, outcome, call_type_value, call_type_confidence, call_type_reasoning, \
     sentiment_reasoning, sentiment_confidence, protocol_reasoning, protocol_confidence, \
     outcome_reasoning, outcome_confidence, engineer_status, engineer_comments, call_type, \
     customer_name, insurance, date_of_birth, call_reason, reviewer_name, qa_check, \
     created_at, updated_at";

/// Columns written by an import, in bind order.
const UPSERT_COLUMNS: &[&str] = &[
    "source_call_id",
    "clinic_id",
    "agent_id",
    "call_start_time",
    "ended_reason",
    "customer_phone_number",
    "duration_seconds",
    "call_ended_time",
    "call_date",
    "recording_url",
    "summary",
    "vapi_score",
    "check_status",
    "evaluation",
    "feedback",
    "sentiment",
    "protocol_adherence",
    "llm_feedback",
    "outcome",
    "call_type_value",
    "call_type_confidence",
    "call_type_reasoning",
    "sentiment_reasoning",
    "sentiment_confidence",
    "protocol_reasoning",
    "protocol_confidence",
    "outcome_reasoning",
    "outcome_confidence",
    "engineer_status",
    "engineer_comments",
    "call_type",
    "customer_name",
    "insurance",
    "date_of_birth",
    "call_reason",
    "reviewer_name",
    "qa_check",
];

/// Maximum number of calls returned by the review queue.
pub const REVIEW_QUEUE_LIMIT: i64 = 100;

/// Build the `INSERT ... ON CONFLICT (source_call_id) DO UPDATE` statement.
///
/// On conflict every imported column is overwritten except `source_call_id`
/// and `clinic_id`. A row without an agent keeps the agent already linked.
fn upsert_sql() -> String {
    let placeholders: Vec<String> = (1..=UPSERT_COLUMNS.len()).map(|i| format!("${i}")).collect();
    let assignments: Vec<String> = UPSERT_COLUMNS
        .iter()
        .filter(|c| !matches!(**c, "source_call_id" | "clinic_id"))
        .map(|c| match *c {
            "agent_id" => "agent_id = COALESCE(EXCLUDED.agent_id, calls.agent_id)".to_string(),
            other => format!("{other} = EXCLUDED.{other}"),
        })
        .collect();
    format!(
        "INSERT INTO calls ({}) VALUES ({}) \
         ON CONFLICT (source_call_id) DO UPDATE SET {}, updated_at = NOW()",
        UPSERT_COLUMNS.join(", "),
        placeholders.join(", "),
        assignments.join(", "),
    )
}

/// Provides CRUD operations for calls.
pub struct CallRepo;

impl CallRepo {
    /// Upsert a batch of calls in a single transaction.
    ///
    /// All-or-nothing: if any statement fails, the transaction is rolled back
    /// and the error is returned. Returns the number of rows written.
    pub async fn upsert_batch(
        pool: &PgPool,
        records: &[NormalizedCallRecord],
    ) -> Result<u64, sqlx::Error> {
        if records.is_empty() {
            return Ok(0);
        }
        let sql = upsert_sql();
        let mut tx = pool.begin().await?;
        let mut written = 0;
        for record in records {
            let f = &record.fields;
            let result = sqlx::query(&sql)
                .bind(&f.source_call_id)
                .bind(record.clinic_id)
                .bind(record.agent_id)
                .bind(f.call_start_time)
                .bind(&f.ended_reason)
                .bind(&f.customer_phone_number)
                .bind(f.duration_seconds)
                .bind(f.call_ended_time)
                .bind(f.call_date)
                .bind(&f.recording_url)
                .bind(&f.summary)
                .bind(&f.vapi_score)
                .bind(&f.check_status)
                .bind(&f.evaluation)
                .bind(&f.feedback)
                .bind(&f.sentiment)
                .bind(f.protocol_adherence)
                .bind(&f.llm_feedback)
                .bind(&f.outcome)
                .bind(&f.call_type_value)
                .bind(f.call_type_confidence)
                .bind(&f.call_type_reasoning)
                .bind(&f.sentiment_reasoning)
                .bind(f.sentiment_confidence)
                .bind(&f.protocol_reasoning)
                .bind(f.protocol_confidence)
                .bind(&f.outcome_reasoning)
                .bind(f.outcome_confidence)
                .bind(&f.engineer_status)
                .bind(&f.engineer_comments)
                .bind(&f.call_type)
                .bind(&f.customer_name)
                .bind(&f.insurance)
                .bind(f.date_of_birth)
                .bind(&f.call_reason)
                .bind(&f.reviewer_name)
                .bind(&f.qa_check)
                .execute(&mut *tx)
                .await?;
            written += result.rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }

    /// Find a call by its natural key.
    pub async fn find_by_source_call_id(
        pool: &PgPool,
        source_call_id: &str,
    ) -> Result<Option<Call>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM calls WHERE source_call_id = $1");
        sqlx::query_as::<_, Call>(&sql)
            .bind(source_call_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a call by id, joined with its agent and clinic names.
    pub async fn find_detail_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<CallDetail>, sqlx::Error> {
        sqlx::query_as::<_, CallDetail>(
            "SELECT c.*, a.name AS agent_name, cl.name AS clinic_name \
             FROM calls c \
             JOIN clinics cl ON cl.id = c.clinic_id \
             LEFT JOIN agents a ON a.id = c.agent_id \
             WHERE c.id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Record an engineer review on a call. Returns `None` if it does not exist.
    pub async fn update_review(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCallReview,
    ) -> Result<Option<Call>, sqlx::Error> {
        let sql = format!(
            "UPDATE calls SET engineer_status = $2, engineer_comments = $3, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Call>(&sql)
            .bind(id)
            .bind(&input.engineer_status)
            .bind(&input.engineer_comments)
            .fetch_optional(pool)
            .await
    }

    /// Calls not yet reviewed by an engineer, oldest first.
    pub async fn list_awaiting_review(
        pool: &PgPool,
        filter: &ReviewQueueFilter,
    ) -> Result<Vec<CallDetail>, sqlx::Error> {
        sqlx::query_as::<_, CallDetail>(
            "SELECT c.*, a.name AS agent_name, cl.name AS clinic_name \
             FROM calls c \
             JOIN clinics cl ON cl.id = c.clinic_id \
             LEFT JOIN agents a ON a.id = c.agent_id \
             WHERE c.engineer_status IS NULL \
               AND ($1::BIGINT IS NULL OR c.clinic_id = $1) \
               AND ($2::BIGINT IS NULL OR c.agent_id = $2) \
             ORDER BY c.call_start_time ASC, c.id ASC \
             LIMIT $3",
        )
        .bind(filter.clinic_id)
        .bind(filter.agent_id)
        .bind(REVIEW_QUEUE_LIMIT)
        .fetch_all(pool)
        .await
    }

    /// Total number of calls.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM calls")
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_binds_one_placeholder_per_column() {
        let sql = upsert_sql();
        assert!(sql.contains(&format!("${}", UPSERT_COLUMNS.len())));
        assert!(!sql.contains(&format!("${}", UPSERT_COLUMNS.len() + 1)));
    }

    #[test]
    fn upsert_update_keeps_identity_and_clinic() {
        let sql = upsert_sql();
        let update = sql.split("DO UPDATE SET").nth(1).unwrap();
        assert!(!update.contains("source_call_id ="));
        assert!(!update.contains("clinic_id ="));
        assert!(update.contains("agent_id = COALESCE(EXCLUDED.agent_id, calls.agent_id)"));
        assert!(update.contains("summary = EXCLUDED.summary"));
    }
}
