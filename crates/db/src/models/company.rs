use serde::Serialize;
use sqlx::FromRow;
use callboard_core::types::{DbId, Timestamp};

/// Id of the single company every imported clinic and agent belongs to.
pub const DEFAULT_COMPANY_ID: DbId = 1;

/// Display name given to the default company when it is first created.
pub const DEFAULT_COMPANY_NAME: &str = "Default Company";

/// A row from the `companies` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Company {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
