//! Request handlers.
//!
//! Each submodule holds the async handler functions for one resource.
//! Handlers delegate to `callboard_db` repositories or the import service and
//! map errors via [`AppError`](crate::error::AppError).

pub mod agents;
pub mod calls;
pub mod clinics;
pub mod import;
