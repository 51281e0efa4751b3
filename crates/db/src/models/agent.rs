//! Agents (the "assistant" of a call).
//!
//! Agents are identified by `external_id`. Older rows were created with only
//! a `name`; the importer backfills `external_id` on those when it matches
//! them by name.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use callboard_core::types::{DbId, Timestamp};

/// A row from the `agents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Agent {
    pub id: DbId,
    pub company_id: DbId,
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an agent.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAgent {
    pub company_id: DbId,
    pub name: Option<String>,
    pub external_id: Option<String>,
}

/// Id and trimmed display name, for filter dropdowns.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct AgentSummary {
    pub id: DbId,
    pub name: String,
}
