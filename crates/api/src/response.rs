//! Shared response envelope types for API handlers.
//!
//! Entity responses use a `{ "data": ... }` envelope. The import progress
//! snapshot is the exception and is serialized bare.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
