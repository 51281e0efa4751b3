use sqlx::PgPool;

use crate::models::company::{Company, DEFAULT_COMPANY_ID, DEFAULT_COMPANY_NAME};

/// Column list for `companies`.
const COLUMNS: &str = "id, name, created_at, updated_at";

/// Provides access to the `companies` table.
pub struct CompanyRepo;

impl CompanyRepo {
    /// Create the default company if it does not exist and return it.
    ///
    /// Idempotent: an existing row is returned unchanged.
    pub async fn ensure_default(pool: &PgPool) -> Result<Company, sqlx::Error> {
        let sql = format!(
            "INSERT INTO companies (id, name) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET name = companies.name \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Company>(&sql)
            .bind(DEFAULT_COMPANY_ID)
            .bind(DEFAULT_COMPANY_NAME)
            .fetch_one(pool)
            .await
    }
}
