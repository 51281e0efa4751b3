//! Canonical, typed shape of an imported call record.

use serde::Serialize;

use crate::types::{DbId, Timestamp};

/// Every column of a call that is derived from a spreadsheet row.
///
/// `source_call_id` and `call_start_time` are required; everything else is
/// optional and stored as `NULL` when the cell is missing or unparseable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallFields {
    pub source_call_id: String,
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
}

impl CallFields {
    /// A record with only the required fields set.
    pub fn new(source_call_id: impl Into<String>, call_start_time: Timestamp) -> Self {
        Self {
            source_call_id: source_call_id.into(),
            call_start_time,
            ended_reason: None,
            customer_phone_number: None,
            duration_seconds: None,
            call_ended_time: None,
            call_date: None,
            recording_url: None,
            summary: None,
            vapi_score: None,
            check_status: None,
            evaluation: None,
            feedback: None,
            sentiment: None,
            protocol_adherence: None,
            llm_feedback: None,
            outcome: None,
            call_type_value: None,
            call_type_confidence: None,
            call_type_reasoning: None,
            sentiment_reasoning: None,
            sentiment_confidence: None,
            protocol_reasoning: None,
            protocol_confidence: None,
            outcome_reasoning: None,
            outcome_confidence: None,
            engineer_status: None,
            engineer_comments: None,
            call_type: None,
            customer_name: None,
            insurance: None,
            date_of_birth: None,
            call_reason: None,
            reviewer_name: None,
            qa_check: None,
        }
    }
}

/// A normalized row with its related entities resolved, ready to upsert.
///
/// Keyed by `fields.source_call_id`. `clinic_id` is only written when the
/// call is first created; re-imports never move a call to another clinic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedCallRecord {
    pub clinic_id: DbId,
    pub agent_id: Option<DbId>,
    pub fields: CallFields,
}
