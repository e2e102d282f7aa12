//! PostgreSQL-backed `AppointmentRepository` implementation using Diesel.
//!
//! Owns the appointment table end to end: CRUD, the slot-occupancy probe
//! backing conflict checks, and the read-side join that resolves directory
//! references into summaries. Slot uniqueness is enforced twice: the service
//! probes with [`AppointmentRepository::slot_taken`], and the store's partial
//! unique index catches the race between probe and insert, surfacing as
//! [`AppointmentRepositoryError::SlotTaken`].

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use pagination::{Page, PageInfo, PageRequest};
use uuid::Uuid;

use crate::domain::ports::{
    AppointmentFilter, AppointmentRepository, AppointmentRepositoryError, ListOrder, PaymentSample,
};
use crate::domain::{
    Appointment, AppointmentDetails, AppointmentId, ListingId, ListingRecord, PaymentMethod,
    PaymentStatus, TimeSlot, UserId, UserSummary,
};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{
    AppointmentRow, appointment_to_insert, appointment_to_update, row_to_appointment,
};
use super::pool::{DbPool, PoolError};
use super::schema::{appointments, listings, users};

/// Status strings that occupy their (agent, date, time) slot. Must match the
/// predicate of the partial unique index in the migrations.
const SLOT_HOLDING_STATUSES: [&str; 2] = ["pending", "confirmed"];

/// Diesel-backed implementation of the `AppointmentRepository` port.
#[derive(Clone)]
pub struct DieselAppointmentRepository {
    pool: DbPool,
}

impl DieselAppointmentRepository {
    /// Create a new repository with the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool(error: PoolError) -> AppointmentRepositoryError {
    map_pool_error(error, AppointmentRepositoryError::connection)
}

fn map_query(error: DieselError) -> AppointmentRepositoryError {
    map_diesel_error(
        error,
        AppointmentRepositoryError::connection,
        AppointmentRepositoryError::query,
    )
}

/// Map an insert failure, turning the slot index's unique violation into the
/// dedicated conflict variant.
fn map_insert_error(error: DieselError) -> AppointmentRepositoryError {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            AppointmentRepositoryError::SlotTaken
        }
        other => map_query(other),
    }
}

type BoxedAppointments<'a> = appointments::BoxedQuery<'a, diesel::pg::Pg>;

/// Apply an [`AppointmentFilter`] to a boxed appointments query.
fn filtered(filter: &AppointmentFilter) -> BoxedAppointments<'static> {
    let mut query = appointments::table.into_boxed();
    if let Some(agent) = filter.agent {
        query = query.filter(appointments::agent_id.eq(*agent.as_uuid()));
    }
    if let Some(client) = filter.client {
        query = query.filter(appointments::client_id.eq(*client.as_uuid()));
    }
    if let Some(status) = filter.status {
        query = query.filter(appointments::status.eq(status.as_str()));
    }
    if let Some(status) = filter.payment_status {
        query = query.filter(appointments::payment_status.eq(status.as_str()));
    }
    if let Some(method) = filter.payment_method {
        query = query.filter(appointments::payment_method.eq(method.as_str()));
    }
    if let Some(date) = filter.date {
        query = query.filter(appointments::date.eq(date));
    }
    query
}

fn ordered(query: BoxedAppointments<'static>, order: ListOrder) -> BoxedAppointments<'static> {
    match order {
        ListOrder::SlotAscending => {
            query.order((appointments::date.asc(), appointments::time_slot.asc()))
        }
        ListOrder::DateDescending => query.order(appointments::date.desc()),
        ListOrder::CreatedDescending => query.order(appointments::created_at.desc()),
    }
}

async fn load_user_summaries(
    conn: &mut AsyncPgConnection,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, UserSummary>, AppointmentRepositoryError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = users::table
        .filter(users::id.eq_any(ids.iter().copied()))
        .select((users::id, users::username, users::email))
        .load::<(Uuid, String, String)>(conn)
        .await
        .map_err(map_query)?;
    Ok(rows
        .into_iter()
        .map(|(id, username, email)| {
            (
                id,
                UserSummary {
                    id: UserId::from_uuid(id),
                    username,
                    email,
                },
            )
        })
        .collect())
}

async fn load_listing_records(
    conn: &mut AsyncPgConnection,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, ListingRecord>, AppointmentRepositoryError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = listings::table
        .filter(listings::id.eq_any(ids.iter().copied()))
        .select((listings::id, listings::name, listings::address))
        .load::<(Uuid, String, String)>(conn)
        .await
        .map_err(map_query)?;
    Ok(rows
        .into_iter()
        .map(|(id, name, address)| {
            (
                id,
                ListingRecord {
                    id: ListingId::from_uuid(id),
                    name,
                    address,
                },
            )
        })
        .collect())
}

/// Resolve a batch of rows into detailed records with two directory queries.
///
/// Directory references that no longer resolve stay `None`; the appointment
/// itself is still returned.
async fn resolve_details(
    conn: &mut AsyncPgConnection,
    rows: Vec<AppointmentRow>,
) -> Result<Vec<AppointmentDetails>, AppointmentRepositoryError> {
    let mut user_ids = HashSet::new();
    let mut listing_ids = HashSet::new();
    for row in &rows {
        user_ids.insert(row.client_id);
        user_ids.insert(row.agent_id);
        listing_ids.insert(row.property_id);
    }
    let user_ids: Vec<Uuid> = user_ids.into_iter().collect();
    let listing_ids: Vec<Uuid> = listing_ids.into_iter().collect();
    let users = load_user_summaries(conn, &user_ids).await?;
    let listings = load_listing_records(conn, &listing_ids).await?;

    rows.into_iter()
        .map(|row| {
            let client_user = users.get(&row.client_id).cloned();
            let agent_user = users.get(&row.agent_id).cloned();
            let listing = listings.get(&row.property_id).cloned();
            let appointment = row_to_appointment(row)?;
            Ok(AppointmentDetails {
                appointment,
                client_user,
                agent_user,
                listing,
            })
        })
        .collect()
}

#[async_trait]
impl AppointmentRepository for DieselAppointmentRepository {
    async fn insert(&self, appointment: &Appointment) -> Result<(), AppointmentRepositoryError> {
        let row = appointment_to_insert(appointment)?;
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        diesel::insert_into(appointments::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_insert_error)?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: AppointmentId,
    ) -> Result<Option<Appointment>, AppointmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row = appointments::table
            .filter(appointments::id.eq(*id.as_uuid()))
            .select(AppointmentRow::as_select())
            .first::<AppointmentRow>(&mut conn)
            .await
            .optional()
            .map_err(map_query)?;
        row.map(row_to_appointment).transpose()
    }

    async fn find_details(
        &self,
        id: AppointmentId,
    ) -> Result<Option<AppointmentDetails>, AppointmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let row = appointments::table
            .filter(appointments::id.eq(*id.as_uuid()))
            .select(AppointmentRow::as_select())
            .first::<AppointmentRow>(&mut conn)
            .await
            .optional()
            .map_err(map_query)?;
        match row {
            None => Ok(None),
            Some(row) => {
                let mut details = resolve_details(&mut conn, vec![row]).await?;
                Ok(details.pop())
            }
        }
    }

    async fn save(&self, appointment: &Appointment) -> Result<(), AppointmentRepositoryError> {
        let changes = appointment_to_update(appointment)?;
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let updated = diesel::update(
            appointments::table.filter(appointments::id.eq(*appointment.id.as_uuid())),
        )
        .set(&changes)
        .execute(&mut conn)
        .await
        .map_err(map_query)?;
        if updated == 0 {
            return Err(AppointmentRepositoryError::query(format!(
                "appointment {} no longer exists",
                appointment.id
            )));
        }
        Ok(())
    }

    async fn slot_taken(
        &self,
        agent: UserId,
        date: NaiveDate,
        time: &TimeSlot,
    ) -> Result<bool, AppointmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        diesel::select(diesel::dsl::exists(
            appointments::table.filter(
                appointments::agent_id
                    .eq(*agent.as_uuid())
                    .and(appointments::date.eq(date))
                    .and(appointments::time_slot.eq(time.as_str().to_owned()))
                    .and(appointments::status.eq_any(SLOT_HOLDING_STATUSES)),
            ),
        ))
        .get_result::<bool>(&mut conn)
        .await
        .map_err(map_query)
    }

    async fn list(
        &self,
        filter: &AppointmentFilter,
        order: ListOrder,
        page: &PageRequest,
    ) -> Result<Page<AppointmentDetails>, AppointmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let total: i64 = filtered(filter)
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_query)?;
        let rows = ordered(filtered(filter), order)
            .offset(i64::try_from(page.offset()).unwrap_or(i64::MAX))
            .limit(i64::from(page.limit()))
            .select(AppointmentRow::as_select())
            .load::<AppointmentRow>(&mut conn)
            .await
            .map_err(map_query)?;
        let items = resolve_details(&mut conn, rows).await?;
        Ok(Page::new(
            items,
            PageInfo::for_request(page, u64::try_from(total).unwrap_or(0)),
        ))
    }

    async fn list_all(
        &self,
        filter: &AppointmentFilter,
        order: ListOrder,
    ) -> Result<Vec<AppointmentDetails>, AppointmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let rows = ordered(filtered(filter), order)
            .select(AppointmentRow::as_select())
            .load::<AppointmentRow>(&mut conn)
            .await
            .map_err(map_query)?;
        resolve_details(&mut conn, rows).await
    }

    async fn payment_samples(&self) -> Result<Vec<PaymentSample>, AppointmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let rows = appointments::table
            .select((
                appointments::payment_method,
                appointments::payment_status,
                appointments::amount_cents,
            ))
            .load::<(String, String, i64)>(&mut conn)
            .await
            .map_err(map_query)?;
        rows.into_iter()
            .map(|(method, status, amount_cents)| {
                let method = PaymentMethod::from_stored(&method).ok_or_else(|| {
                    AppointmentRepositoryError::corrupt(format!(
                        "unknown payment method `{method}`"
                    ))
                })?;
                let status = PaymentStatus::from_stored(&status).ok_or_else(|| {
                    AppointmentRepositoryError::corrupt(format!(
                        "unknown payment status `{status}`"
                    ))
                })?;
                Ok(PaymentSample {
                    method,
                    status,
                    amount_cents,
                })
            })
            .collect()
    }

    async fn delete(&self, id: AppointmentId) -> Result<bool, AppointmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool)?;
        let deleted =
            diesel::delete(appointments::table.filter(appointments::id.eq(*id.as_uuid())))
                .execute(&mut conn)
                .await
                .map_err(map_query)?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn unique_violations_surface_as_slot_conflicts() {
        let error = map_insert_error(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value violates unique constraint".to_owned()),
        ));
        assert_eq!(error, AppointmentRepositoryError::SlotTaken);
    }

    #[rstest]
    fn other_insert_failures_stay_query_errors() {
        let error = map_insert_error(DieselError::QueryBuilderError("bad query".into()));
        assert!(matches!(error, AppointmentRepositoryError::Query { .. }));
    }

    #[rstest]
    fn pool_failures_surface_as_connection_errors() {
        let error = map_pool(PoolError::checkout("pool exhausted"));
        assert!(matches!(
            error,
            AppointmentRepositoryError::Connection { .. }
        ));
        assert!(error.to_string().contains("pool exhausted"));
    }
}
