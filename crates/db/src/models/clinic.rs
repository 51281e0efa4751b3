//! Clinics. Each spreadsheet sheet maps to one clinic by name.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use callboard_core::types::{DbId, Timestamp};

/// A row from the `clinics` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Clinic {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a clinic.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateClinic {
    pub company_id: DbId,
    pub name: String,
}

/// Clinic joined with its company name, as listed by the dashboard.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClinicWithCompany {
    pub id: DbId,
    pub name: String,
    pub company_id: DbId,
    pub company_name: String,
}
