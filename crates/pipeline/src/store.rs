//! Persistence seam used by the import pipeline.
//!
//! [`ImportStore`] lists exactly the storage operations an import needs.
//! [`PgImportStore`] implements them with the `callboard-db` repositories.

use async_trait::async_trait;
use callboard_core::call::NormalizedCallRecord;
use callboard_core::types::DbId;
use callboard_db::models::agent::{Agent, CreateAgent};
use callboard_db::models::clinic::{Clinic, CreateClinic};
use callboard_db::repositories::{AgentRepo, CallRepo, ClinicRepo, CompanyRepo};
use callboard_db::DbPool;

use crate::error::ImportError;

/// Storage operations required to import calls.
#[async_trait]
pub trait ImportStore: Send + Sync {
    /// Create the default company if missing; returns its id.
    async fn ensure_default_company(&self) -> Result<DbId, ImportError>;

    async fn find_clinic(&self, company_id: DbId, name: &str)
        -> Result<Option<Clinic>, ImportError>;

    async fn create_clinic(&self, company_id: DbId, name: &str) -> Result<Clinic, ImportError>;

    async fn find_agent_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Agent>, ImportError>;

    async fn find_agent_by_name(&self, name: &str) -> Result<Option<Agent>, ImportError>;

    async fn set_agent_external_id(
        &self,
        agent_id: DbId,
        external_id: &str,
    ) -> Result<Option<Agent>, ImportError>;

    /// Create an agent whose name and external id are both `external_id`.
    async fn create_agent(&self, company_id: DbId, external_id: &str)
        -> Result<Agent, ImportError>;

    /// Upsert calls in one all-or-nothing transaction.
    async fn upsert_calls(&self, records: &[NormalizedCallRecord]) -> Result<u64, ImportError>;
}

/// [`ImportStore`] backed by Postgres.
#[derive(Clone)]
pub struct PgImportStore {
    pool: DbPool,
}

impl PgImportStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportStore for PgImportStore {
    async fn ensure_default_company(&self) -> Result<DbId, ImportError> {
        Ok(CompanyRepo::ensure_default(&self.pool).await?.id)
    }

    async fn find_clinic(
        &self,
        company_id: DbId,
        name: &str,
    ) -> Result<Option<Clinic>, ImportError> {
        Ok(ClinicRepo::find_by_name(&self.pool, company_id, name).await?)
    }

    async fn create_clinic(&self, company_id: DbId, name: &str) -> Result<Clinic, ImportError> {
        let input = CreateClinic {
            company_id,
            name: name.to_string(),
        };
        Ok(ClinicRepo::create(&self.pool, &input).await?)
    }

    async fn find_agent_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Agent>, ImportError> {
        Ok(AgentRepo::find_by_external_id(&self.pool, external_id).await?)
    }

    async fn find_agent_by_name(&self, name: &str) -> Result<Option<Agent>, ImportError> {
        Ok(AgentRepo::find_by_name(&self.pool, name).await?)
    }

    async fn set_agent_external_id(
        &self,
        agent_id: DbId,
        external_id: &str,
    ) -> Result<Option<Agent>, ImportError> {
        Ok(AgentRepo::set_external_id(&self.pool, agent_id, external_id).await?)
    }

    async fn create_agent(
        &self,
        company_id: DbId,
        external_id: &str,
    ) -> Result<Agent, ImportError> {
        let input = CreateAgent {
            company_id,
            name: Some(external_id.to_string()),
            external_id: Some(external_id.to_string()),
        };
        Ok(AgentRepo::create(&self.pool, &input).await?)
    }

    async fn upsert_calls(&self, records: &[NormalizedCallRecord]) -> Result<u64, ImportError> {
        Ok(CallRepo::upsert_batch(&self.pool, records).await?)
    }
}

// ---------------------------------------------------------------------------
// In-memory store for unit tests
// ---------------------------------------------------------------------------
