//! Repository layer: one zero-sized struct per table, all methods take a
//! `&PgPool` (or a transaction) and return `sqlx::Error`.

mod agent_repo;
mod call_repo;
mod clinic_repo;
mod company_repo;

pub use agent_repo::AgentRepo;
pub use call_repo::CallRepo;
pub use clinic_repo::ClinicRepo;
pub use company_repo::CompanyRepo;
