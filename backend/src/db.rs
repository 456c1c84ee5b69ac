use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::error::ApiError;

/// Establishes a fresh connection per request. The service is stateless;
/// nothing is shared across requests beyond the config.
pub fn connect(database_url: &str) -> Result<PgConnection, ApiError> {
    PgConnection::establish(database_url).map_err(|e| {
        log::error!("Failed to establish database connection: {}", e);
        ApiError::Internal
    })
}
