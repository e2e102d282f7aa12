//! Shared Diesel/pool error mapping for the persistence adapters.
//!
//! Each adapter owns its port error type, so the helpers take constructor
//! closures instead of returning a concrete error. Failure details are logged
//! at debug level here and summarised in the returned variant.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Map a pool checkout failure into the adapter's connection variant.
pub(crate) fn map_pool_error<E>(error: PoolError, connection: impl FnOnce(String) -> E) -> E {
    debug!(error = %error, "connection checkout failed");
    connection(error.to_string())
}

/// Map a Diesel execution failure into the adapter's error type.
///
/// Closed connections surface through `connection`; everything else is a
/// query-level failure. `Error::NotFound` never reaches this helper because
/// the adapters use `.optional()` for lookups.
pub(crate) fn map_diesel_error<E>(
    error: DieselError,
    connection: impl FnOnce(String) -> E,
    query: impl FnOnce(String) -> E,
) -> E {
    debug!(error = %error, "database query failed");
    match &error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection(error.to_string())
        }
        _ => query(error.to_string()),
    }
}
