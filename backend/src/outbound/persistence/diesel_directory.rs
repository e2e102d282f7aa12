//! PostgreSQL-backed user and listing directory adapters.
//!
//! The directories are read-only collaborators: this backend looks records up
//! by id and never writes them. A stored role string outside the closed role
//! set is a lookup failure, not a panic.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{DirectoryError, ListingDirectory, UserDirectory};
use crate::domain::{DirectoryUser, ListingId, ListingRecord, UserId, UserRole};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{ListingRow, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::{listings, users};

fn map_pool(error: PoolError) -> DirectoryError {
    map_pool_error(error, DirectoryError::connection)
}

fn map_query(error: DieselError) -> DirectoryError {
    map_diesel_error(error, DirectoryError::connection, DirectoryError::lookup)
}

/// Convert a user row, rejecting roles outside the closed set.
fn row_to_user(row: UserRow) -> Result<DirectoryUser, DirectoryError> {
    let role = UserRole::from_directory(&row.role).ok_or_else(|| {
        DirectoryError::lookup(format!("user {} has unknown role `{}`", row.id, row.role))
    })?;
    Ok(DirectoryUser {
        id: UserId::from_uuid(row.id),
        username: row.username,
        email: row.email,
        role,
    })
}

fn row_to_listing(row: ListingRow) -> ListingRecord {
    ListingRecord {
        id: ListingId::from_uuid(row.id),
        name: row.name,
        address: row.address,
    }
}

/// Diesel-backed implementation of the `UserDirectory` port.
#[derive(Clone)]
pub struct DieselUserDirectory {
    pool: DbPool,
}

impl DieselUserDirectory {
    /// Create a new directory with the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for DieselUserDirectory {
    async fn find_user(&self, id: UserId) -> Result<Option<DirectoryUser>, DirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row = users::table
            .filter(users::id.eq(*id.as_uuid()))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_query)?;
        row.map(row_to_user).transpose()
    }
}

/// Diesel-backed implementation of the `ListingDirectory` port.
#[derive(Clone)]
pub struct DieselListingDirectory {
    pool: DbPool,
}

impl DieselListingDirectory {
    /// Create a new directory with the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListingDirectory for DieselListingDirectory {
    async fn find_listing(&self, id: ListingId) -> Result<Option<ListingRecord>, DirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row = listings::table
            .filter(listings::id.eq(*id.as_uuid()))
            .select(ListingRow::as_select())
            .first::<ListingRow>(&mut conn)
            .await
            .optional()
            .map_err(map_query)?;
        Ok(row.map(row_to_listing))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use uuid::Uuid;

    use super::*;

    fn user_row(role: &str) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            username: "agent-smith".to_owned(),
            email: "smith@example.com".to_owned(),
            role: role.to_owned(),
        }
    }

    #[rstest]
    #[case("client", UserRole::Client)]
    #[case("agent", UserRole::Agent)]
    #[case("admin", UserRole::Admin)]
    fn stored_roles_map_to_the_closed_set(#[case] stored: &str, #[case] expected: UserRole) {
        let user = row_to_user(user_row(stored)).expect("known role");
        assert_eq!(user.role, expected);
    }

    #[rstest]
    fn unknown_roles_are_lookup_failures() {
        let error = row_to_user(user_row("owner")).expect_err("unknown role");
        assert!(matches!(error, DirectoryError::Lookup { .. }));
        assert!(error.to_string().contains("owner"));
    }

    #[rstest]
    fn listing_rows_map_to_records() {
        let id = Uuid::new_v4();
        let record = row_to_listing(ListingRow {
            id,
            name: "Sunny Two-Bed".to_owned(),
            address: "12 Elm Street".to_owned(),
        });
        assert_eq!(record.id, ListingId::from_uuid(id));
        assert_eq!(record.address, "12 Elm Street");
    }

    #[rstest]
    fn pool_failures_surface_as_connection_errors() {
        let error = map_pool(PoolError::checkout("pool exhausted"));
        assert!(matches!(error, DirectoryError::Connection { .. }));
    }
}
