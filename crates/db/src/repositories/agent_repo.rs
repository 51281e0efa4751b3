use sqlx::PgPool;
use callboard_core::types::DbId;

use crate::models::agent::{Agent, AgentSummary, CreateAgent};

/// Column list for `agents`.
const COLUMNS: &str = "id, company_id, name, external_id, created_at, updated_at";

/// Provides CRUD operations for agents.
pub struct AgentRepo;

impl AgentRepo {
    /// Find an agent by its external id.
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_id: &str,
    ) -> Result<Option<Agent>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM agents WHERE external_id = $1");
        sqlx::query_as::<_, Agent>(&sql)
            .bind(external_id)
            .fetch_optional(pool)
            .await
    }

    /// Find the oldest agent with an exact name match.
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Agent>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM agents WHERE name = $1 ORDER BY id LIMIT 1");
        sqlx::query_as::<_, Agent>(&sql)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Set the external id of an agent that does not have one yet.
    ///
    /// Returns `None` if the agent does not exist.
    pub async fn set_external_id(
        pool: &PgPool,
        id: DbId,
        external_id: &str,
    ) -> Result<Option<Agent>, sqlx::Error> {
        let sql = format!(
            "UPDATE agents SET external_id = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Agent>(&sql)
            .bind(id)
            .bind(external_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new agent.
    pub async fn create(pool: &PgPool, input: &CreateAgent) -> Result<Agent, sqlx::Error> {
        let sql = format!(
            "INSERT INTO agents (company_id, name, external_id) VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Agent>(&sql)
            .bind(input.company_id)
            .bind(&input.name)
            .bind(&input.external_id)
            .fetch_one(pool)
            .await
    }

    /// Agents with a non-blank name, sorted by trimmed name.
    ///
    /// With `clinic_id`, only agents that handled at least one call at that
    /// clinic are returned.
    pub async fn list_named(
        pool: &PgPool,
        clinic_id: Option<DbId>,
    ) -> Result<Vec<AgentSummary>, sqlx::Error> {
        sqlx::query_as::<_, AgentSummary>(
            "SELECT a.id, TRIM(a.name) AS name \
             FROM agents a \
             WHERE a.name IS NOT NULL AND TRIM(a.name) <> '' \
               AND ($1::BIGINT IS NULL OR EXISTS ( \
                    SELECT 1 FROM calls c WHERE c.agent_id = a.id AND c.clinic_id = $1)) \
             ORDER BY name ASC, a.id ASC",
        )
        .bind(clinic_id)
        .fetch_all(pool)
        .await
    }
}
