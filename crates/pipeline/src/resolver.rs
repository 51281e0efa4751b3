//! Resolution of clinics (one per sheet) and agents (one per row).

use callboard_core::types::DbId;
use callboard_db::models::clinic::Clinic;
use callboard_db::models::company::DEFAULT_COMPANY_ID;

use crate::error::ImportError;
use crate::store::ImportStore;

/// Finds or creates the clinic and agent records an imported call points at.
pub struct EntityResolver<'a> {
    store: &'a dyn ImportStore,
}

impl<'a> EntityResolver<'a> {
    pub fn new(store: &'a dyn ImportStore) -> Self {
        Self { store }
    }

    /// Clinic for a sheet, created under the default company on first use.
    pub async fn ensure_clinic(&self, sheet_name: &str) -> Result<Clinic, ImportError> {
        let company_id = self.store.ensure_default_company().await?;

        if let Some(clinic) = self.store.find_clinic(company_id, sheet_name).await? {
            return Ok(clinic);
        }

        let clinic = self.store.create_clinic(company_id, sheet_name).await?;
        tracing::info!(clinic_id = clinic.id, clinic = %clinic.name, "Created clinic");
        Ok(clinic)
    }

    /// Agent id for a raw `assistant` identifier.
    ///
    /// Lookup order: external id, then name (backfilling the external id of
    /// a legacy record), then a new agent named after the identifier. A blank
    /// identifier resolves to no agent.
    pub async fn ensure_agent(&self, raw: Option<&str>) -> Result<Option<DbId>, ImportError> {
        let Some(external_id) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        if let Some(agent) = self.store.find_agent_by_external_id(external_id).await? {
            return Ok(Some(agent.id));
        }

        if let Some(agent) = self.store.find_agent_by_name(external_id).await? {
            if agent.external_id.is_none() {
                self.store.set_agent_external_id(agent.id, external_id).await?;
                tracing::info!(agent_id = agent.id, external_id, "Backfilled agent external id");
            }
            return Ok(Some(agent.id));
        }

        let agent = self.store.create_agent(DEFAULT_COMPANY_ID, external_id).await?;
        tracing::info!(agent_id = agent.id, external_id, "Created agent");
        Ok(Some(agent.id))
    }
}
