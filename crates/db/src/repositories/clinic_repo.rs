use sqlx::PgPool;
use callboard_core::types::DbId;

use crate::models::clinic::{Clinic, ClinicWithCompany, CreateClinic};

/// Column list for `clinics`.
const COLUMNS: &str = "id, company_id, name, created_at, updated_at";

/// Provides CRUD operations for clinics.
pub struct ClinicRepo;

impl ClinicRepo {
    /// Find a clinic by its exact name within a company.
    pub async fn find_by_name(
        pool: &PgPool,
        company_id: DbId,
        name: &str,
    ) -> Result<Option<Clinic>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM clinics WHERE company_id = $1 AND name = $2");
        sqlx::query_as::<_, Clinic>(&sql)
            .bind(company_id)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new clinic.
    pub async fn create(pool: &PgPool, input: &CreateClinic) -> Result<Clinic, sqlx::Error> {
        let sql = format!(
            "INSERT INTO clinics (company_id, name) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Clinic>(&sql)
            .bind(input.company_id)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    /// All clinics with their company name, ordered by clinic name.
    pub async fn list_with_company(pool: &PgPool) -> Result<Vec<ClinicWithCompany>, sqlx::Error> {
        sqlx::query_as::<_, ClinicWithCompany>(
            "SELECT c.id, c.name, c.company_id, co.name AS company_name \
             FROM clinics c \
             JOIN companies co ON co.id = c.company_id \
             ORDER BY c.name ASC",
        )
        .fetch_all(pool)
        .await
    }
}
