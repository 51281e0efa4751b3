//! Row normalization for spreadsheet imports.
//!
//! Converts a raw spreadsheet row (column header -> loosely typed cell) into
//! a [`CallFields`] value. Cells arrive in many historical encodings: ISO
//! strings, `D/M/YYYY` strings, native spreadsheet dates and numeric date
//! serials, numbers stored as text, and several spellings of the same column.
//! All functions here are pure; a value that cannot be parsed becomes `None`
//! and is logged, it never fails the row on its own. Only a missing call id
//! or an unusable call start time rejects a row.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::call::CallFields;
use crate::types::Timestamp;

// ── Column names ─────────────────────────────────────────────────────

/// Spreadsheet column headers understood by the importer, including the
/// legacy "Title Case" headers of older exports.
pub mod columns {
    pub const CALL_ID: &str = "call_id";
    pub const ASSISTANT: &str = "assistant";
    pub const ENDED_REASON: &str = "ended_reason";
    pub const CUSTOMER_PHONE: &[&str] = &["customer_phone", "customer_phone_number"];
    pub const CALL_START_TIME: &str = "call_start_time";
    pub const DURATION: &str = "duration";
    pub const CALL_ENDED_TIME: &str = "call_ended_time";
    pub const DATE: &str = "date";
    pub const RECORDING_URL: &str = "recording_url";
    pub const SUMMARY: &str = "summary";
    pub const VAPI_SCORE: &str = "vapi_score";
    /// Some exports carry the vapi score under a header that reads `FALSE`.
    pub const VAPI_SCORE_LEGACY: &str = "FALSE";
    pub const CHECK: &str = "check";
    pub const EVALUATION: &str = "evaluation";
    pub const FEEDBACK: &[&str] = &["feedback", "Feedback QA"];
    pub const SENTIMENT: &str = "sentiment";
    pub const PROTOCOL_ADHERENCE: &str = "protocol_adherence";
    pub const LLM_FEEDBACK: &str = "llm_feedback";
    pub const OUTCOME: &str = "outcome";
    pub const CALL_TYPE_VALUE: &str = "call_type_value";
    pub const CALL_TYPE_CONFIDENCE: &str = "call_type_confidence";
    pub const CALL_TYPE_REASONING: &str = "call_type_reasoning";
    pub const SENTIMENT_REASONING: &str = "sentiment_reasoning";
    pub const SENTIMENT_CONFIDENCE: &str = "sentiment_confidence";
    pub const PROTOCOL_REASONING: &str = "protocol_reasoning";
    pub const PROTOCOL_CONFIDENCE: &str = "protocol_confidence";
    pub const OUTCOME_REASONING: &str = "outcome_reasoning";
    pub const OUTCOME_CONFIDENCE: &str = "outcome_confidence";
    pub const ENGINEER_STATUS: &[&str] = &["status_feedback_engineer", "Status Feedback Engineer"];
    pub const ENGINEER_COMMENTS: &[&str] = &["comments_engineer", "Comments Engineer"];
    pub const TYPE: &str = "type";
    pub const CUSTOMER_NAME: &str = "customer_name";
    pub const INSURANCE: &str = "insurance";
    pub const DOB: &str = "dob";
    pub const CALL_REASON: &str = "call_reason";
    pub const REVIEWER: &str = "Reviewer";
    pub const QA_CHECK: &str = "QA Check";
}

// ── Raw values ───────────────────────────────────────────────────────

/// Upper bound (exclusive) of a plausible spreadsheet date serial
/// (9999-12-31).
const MAX_DATE_SERIAL: f64 = 2_958_466.0;

/// Serials above this value are shifted by one day to undo the 1900
/// leap-year bug.
const LEAP_BUG_SERIAL: f64 = 60.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// A single decoded spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// The column exists in the sheet but this cell is blank.
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// A cell the spreadsheet itself typed as a date.
    DateTime(NaiveDateTime),
}

impl RawValue {
    /// `true` for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Stringified form of the value.
    pub fn to_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::DateTime(dt) => dt.and_utc().to_rfc3339(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// One spreadsheet row keyed by column header.
///
/// Every header of the sheet is present as a key; blank cells are
/// [`RawValue::Empty`]. A header missing from the map means the sheet does
/// not have that column at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow(HashMap<String, RawValue>);

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: RawValue) {
        self.0.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.0.get(column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// `true` if every cell is blank.
    pub fn is_blank(&self) -> bool {
        self.0.values().all(RawValue::is_blank)
    }

    /// First alias (in priority order) holding a non-blank value.
    pub fn first_present(&self, aliases: &[&str]) -> Option<&RawValue> {
        aliases
            .iter()
            .filter_map(|alias| self.get(alias))
            .find(|value| !value.is_blank())
    }
}

impl<K: Into<String>> FromIterator<(K, RawValue)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, RawValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ── Scalar parsers ───────────────────────────────────────────────────

/// Parse a date cell.
///
/// Rules are tried in order and the first success wins:
///
/// 1. a native spreadsheet date,
/// 2. an ISO-8601 UTC string (`...T...Z`),
/// 3. any other RFC 3339 / RFC 2822 / ISO-like string, or an `M/D/YYYY`
///    string (month first),
/// 4. a `D/M/YYYY` string (day first), reached only when the month-first
///    reading is not a valid date,
/// 5. a numeric date serial in `(0, 2958466)`, counted from 1899-12-30 with
///    one day subtracted for serials above 60.
///
/// Blank input yields `None` silently; input that matches no rule yields
/// `None` and a warning carrying `field` and `call_id`.
pub fn parse_date(value: Option<&RawValue>, field: &str, call_id: &str) -> Option<Timestamp> {
    let value = value.filter(|v| !v.is_blank())?;

    let parsed = match value {
        RawValue::DateTime(dt) => Some(dt.and_utc()),
        RawValue::Text(text) => parse_date_text(text.trim()),
        RawValue::Number(serial) => from_date_serial(*serial),
        RawValue::Bool(_) | RawValue::Empty => None,
    };

    if parsed.is_none() {
        tracing::warn!(
            call_id,
            field,
            value = %value.to_text(),
            "Invalid date, storing as null"
        );
    }
    parsed
}

fn parse_date_text(text: &str) -> Option<Timestamp> {
    if text.contains('T') && text.ends_with('Z') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    parse_generic_date(text).or_else(|| parse_slash_date(text, SlashOrder::DayFirst))
}

fn parse_generic_date(text: &str) -> Option<Timestamp> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc());
        }
    }
    if let Some(dt) = parse_slash_date(text, SlashOrder::MonthFirst) {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[derive(Debug, Clone, Copy)]
enum SlashOrder {
    MonthFirst,
    DayFirst,
}

/// `M/D/YYYY` or `D/M/YYYY` with one- or two-digit day and month, at
/// midnight UTC.
fn parse_slash_date(text: &str, order: SlashOrder) -> Option<Timestamp> {
    let mut parts = text.split('/');
    let (first, second, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let is_digits = |s: &str, min: usize, max: usize| {
        (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
    };
    if !is_digits(first, 1, 2) || !is_digits(second, 1, 2) || !is_digits(year, 4, 4) {
        return None;
    }
    let (month, day) = match order {
        SlashOrder::MonthFirst => (first, second),
        SlashOrder::DayFirst => (second, first),
    };
    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)?;
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

/// Convert a spreadsheet date serial to a UTC timestamp.
pub fn from_date_serial(serial: f64) -> Option<Timestamp> {
    if !serial.is_finite() || serial <= 0.0 || serial >= MAX_DATE_SERIAL {
        return None;
    }
    let days = if serial > LEAP_BUG_SERIAL { serial - 1.0 } else { serial };
    let epoch = Utc.with_ymd_and_hms(1899, 12, 30, 0, 0, 0).single()?;
    let millis = (days * MILLIS_PER_DAY).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

/// Parse a float; blank or unparseable input yields `None`.
///
/// Text is read up to the first character that cannot continue a number,
/// so `"12.5s"` yields `12.5`.
pub fn parse_float_or_null(value: Option<&RawValue>) -> Option<f64> {
    match value? {
        RawValue::Number(n) if n.is_finite() => Some(*n),
        RawValue::Text(text) => leading_float(text.trim()),
        _ => None,
    }
}

/// Parse an integer; blank or unparseable input yields `None`.
///
/// Numbers are truncated toward zero; text is read up to the first
/// non-digit, so `"85%"` yields `85`.
pub fn parse_int_or_null(value: Option<&RawValue>) -> Option<i32> {
    match value? {
        RawValue::Number(n) if n.is_finite() => i32::try_from(n.trunc() as i64).ok(),
        RawValue::Text(text) => {
            let text = text.trim();
            let end = numeric_prefix_len(text, false);
            text[..end].parse::<i64>().ok().and_then(|n| i32::try_from(n).ok())
        }
        _ => None,
    }
}

/// Stringify a value; blank or absent input yields `None`.
pub fn get_string_or_null(value: Option<&RawValue>) -> Option<String> {
    value.filter(|v| !v.is_blank()).map(RawValue::to_text)
}

fn leading_float(text: &str) -> Option<f64> {
    let end = numeric_prefix_len(text, true);
    text[..end].parse::<f64>().ok()
}

/// Length of the longest prefix of `text` that reads as a number:
/// an optional sign, digits, and (for floats) a fraction and exponent.
fn numeric_prefix_len(text: &str, allow_fraction: bool) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut has_digits = i > digits_start;
    if !allow_fraction {
        return if has_digits { i } else { 0 };
    }
    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > frac_start || has_digits {
            has_digits = has_digits || j > frac_start;
            i = j;
        }
    }
    if !has_digits {
        return 0;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}

// ── Row normalization ────────────────────────────────────────────────

/// Why a row was rejected before reaching persistence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowRejection {
    #[error("missing call_id")]
    MissingCallId,

    #[error("invalid call_start_time")]
    InvalidCallStartTime,

    #[error("agent resolution failed: {0}")]
    AgentResolution(String),
}

/// A row whose scalar fields are normalized but whose agent is not yet
/// resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub fields: CallFields,
    /// Trimmed `assistant` identifier, `None` when blank.
    pub assistant: Option<String>,
}

/// Trimmed call id of a row; empty when the column is missing or blank.
pub fn source_call_id(row: &RawRow) -> String {
    row.get(columns::CALL_ID)
        .map(|v| v.to_text().trim().to_string())
        .unwrap_or_default()
}

/// Normalize one raw row.
pub fn normalize_row(row: &RawRow) -> Result<NormalizedRow, RowRejection> {
    use self::columns as c;

    let call_id = source_call_id(row);
    if call_id.is_empty() {
        return Err(RowRejection::MissingCallId);
    }
    let id = call_id.as_str();

    let call_start_time = parse_date(row.get(c::CALL_START_TIME), c::CALL_START_TIME, id)
        .ok_or(RowRejection::InvalidCallStartTime)?;

    let assistant = get_string_or_null(row.get(c::ASSISTANT))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    // An existing vapi_score column wins even when the cell is blank.
    let vapi_score = if row.has_column(c::VAPI_SCORE) {
        row.get(c::VAPI_SCORE)
    } else {
        row.get(c::VAPI_SCORE_LEGACY)
    };

    let text = |column: &str| get_string_or_null(row.get(column));
    let float = |column: &str| parse_float_or_null(row.get(column));

    let fields = CallFields {
        source_call_id: call_id.clone(),
        call_start_time,
        ended_reason: text(c::ENDED_REASON),
        customer_phone_number: get_string_or_null(row.first_present(c::CUSTOMER_PHONE)),
        duration_seconds: float(c::DURATION),
        call_ended_time: parse_date(row.get(c::CALL_ENDED_TIME), c::CALL_ENDED_TIME, id),
        call_date: parse_date(row.get(c::DATE), c::DATE, id),
        recording_url: text(c::RECORDING_URL),
        summary: text(c::SUMMARY),
        vapi_score: get_string_or_null(vapi_score),
        check_status: text(c::CHECK).map(|s| s.to_uppercase()),
        evaluation: text(c::EVALUATION),
        feedback: get_string_or_null(row.first_present(c::FEEDBACK)),
        sentiment: text(c::SENTIMENT),
        protocol_adherence: parse_int_or_null(row.get(c::PROTOCOL_ADHERENCE)),
        llm_feedback: text(c::LLM_FEEDBACK),
        outcome: text(c::OUTCOME),
        call_type_value: text(c::CALL_TYPE_VALUE),
        call_type_confidence: float(c::CALL_TYPE_CONFIDENCE),
        call_type_reasoning: text(c::CALL_TYPE_REASONING),
        sentiment_reasoning: text(c::SENTIMENT_REASONING),
        sentiment_confidence: float(c::SENTIMENT_CONFIDENCE),
        protocol_reasoning: text(c::PROTOCOL_REASONING),
        protocol_confidence: float(c::PROTOCOL_CONFIDENCE),
        outcome_reasoning: text(c::OUTCOME_REASONING),
        outcome_confidence: float(c::OUTCOME_CONFIDENCE),
        engineer_status: get_string_or_null(row.first_present(c::ENGINEER_STATUS)),
        engineer_comments: get_string_or_null(row.first_present(c::ENGINEER_COMMENTS)),
        call_type: text(c::TYPE),
        customer_name: text(c::CUSTOMER_NAME),
        insurance: text(c::INSURANCE),
        date_of_birth: parse_date(row.get(c::DOB), "date_of_birth", id),
        call_reason: text(c::CALL_REASON),
        reviewer_name: text(c::REVIEWER),
        qa_check: text(c::QA_CHECK),
    };

    Ok(NormalizedRow { fields, assistant })
}
