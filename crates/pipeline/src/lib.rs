//! Spreadsheet import pipeline.
//!
//! An upload is admitted by [`ImportJobStore::try_begin`], then an
//! [`ImportOrchestrator`] runs on its own task: it decodes the workbook,
//! resolves one clinic per sheet and hands fixed-size chunks of rows to the
//! batch writer. All observable effects go through the job store, which
//! publishes every snapshot change to the progress hub.

pub mod batch_writer;
pub mod error;
pub mod job_store;
pub mod orchestrator;
pub mod resolver;
pub mod store;
pub mod workbook;

pub use error::ImportError;
pub use job_store::ImportJobStore;
pub use orchestrator::{ImportOrchestrator, ImportService, ImportSettings, StartedImport};
pub use resolver::EntityResolver;
pub use store::{ImportStore, PgImportStore};
pub use workbook::{Sheet, Workbook};
