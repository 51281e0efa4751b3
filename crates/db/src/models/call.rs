//! Imported calls and the QA review DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use callboard_core::types::{DbId, Timestamp};

/// A row from the `calls` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Call {
    pub id: DbId,
    pub source_call_id: String,
    pub clinic_id: DbId,
    pub agent_id: Option<DbId>,
    pub call_start_time: Timestamp,
    pub ended_reason: Option<String>,
    pub customer_phone_number: Option<String>,
    pub duration_seconds: Option<f64>,
    pub call_ended_time: Option<Timestamp>,
    pub call_date: Option<Timestamp>,
    pub recording_url: Option<String>,
    pub summary: Option<String>,
    pub vapi_score: Option<String>,
    pub check_status: Option<String>,
    pub evaluation: Option<String>,
    pub feedback: Option<String>,
    pub sentiment: Option<String>,
    pub protocol_adherence: Option<i32>,
    pub llm_feedback: Option<String>,
    pub outcome: Option<String>,
    pub call_type_value: Option<String>,
    pub call_type_confidence: Option<f64>,
    pub call_type_reasoning: Option<String>,
    pub sentiment_reasoning: Option<String>,
    pub sentiment_confidence: Option<f64>,
    pub protocol_reasoning: Option<String>,
    pub protocol_confidence: Option<f64>,
    pub outcome_reasoning: Option<String>,
    pub outcome_confidence: Option<f64>,
    pub engineer_status: Option<String>,
    pub engineer_comments: Option<String>,
    pub call_type: Option<String>,
    pub customer_name: Option<String>,
    pub insurance: Option<String>,
    pub date_of_birth: Option<Timestamp>,
    pub call_reason: Option<String>,
    pub reviewer_name: Option<String>,
    pub qa_check: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A call with the display names of its agent and clinic.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CallDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub call: Call,
    pub agent_name: Option<String>,
    pub clinic_name: String,
}

/// DTO for recording an engineer's QA review of a call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCallReview {
    pub engineer_status: Option<String>,
    pub engineer_comments: Option<String>,
}

/// Optional filters for the QA review queue.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ReviewQueueFilter {
    pub clinic_id: Option<DbId>,
    pub agent_id: Option<DbId>,
}
