//! Domain types and pure logic for the call-center import service.
//!
//! Nothing in this crate touches the database or the network. It holds the
//! shared id/timestamp aliases, the domain error type, the import progress
//! snapshot and the row normalizer used by the import pipeline.

pub mod call;
pub mod error;
pub mod import;
pub mod normalizer;
pub mod types;
