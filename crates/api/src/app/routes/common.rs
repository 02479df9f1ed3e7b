use sprintspace_core::DocumentId;

use crate::app::errors::ApiError;

/// Parse a path identifier; malformed ids never reach the store.
pub fn parse_id(raw: &str) -> Result<DocumentId, ApiError> {
    raw.parse::<DocumentId>().map_err(ApiError::from)
}
