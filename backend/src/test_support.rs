//! In-memory port implementations for integration tests.
//!
//! Compiled behind the `test-support` feature so the `tests/` suites can run
//! the real domain services end to end without PostgreSQL or a mail relay.
//! The repository mirrors the store's observable behaviour, including the
//! slot uniqueness race guard.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, Utc};
use mockable::Clock;
use pagination::{Page, PageInfo, PageRequest};

use crate::domain::ports::{
    AppointmentFilter, AppointmentRepository, AppointmentRepositoryError, DirectoryError,
    ListOrder, ListingDirectory, Mailer, MailerError, OutboundEmail, PaymentSample, UserDirectory,
};
use crate::domain::{
    Appointment, AppointmentDetails, AppointmentId, DirectoryUser, ListingId, ListingRecord,
    TimeSlot, UserId, UserSummary,
};

fn locked<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clock pinned to a fixed instant for deterministic assertions.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    /// Pin the clock to `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.now
    }
}

/// User directory backed by a map.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: Mutex<HashMap<UserId, DirectoryUser>>,
}

impl InMemoryUserDirectory {
    /// Register a user record.
    pub fn insert(&self, user: DirectoryUser) {
        locked(&self.users).insert(user.id, user);
    }

    fn summary(&self, id: UserId) -> Option<UserSummary> {
        locked(&self.users).get(&id).cloned().map(UserSummary::from)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user(&self, id: UserId) -> Result<Option<DirectoryUser>, DirectoryError> {
        Ok(locked(&self.users).get(&id).cloned())
    }
}

/// Listing directory backed by a map.
#[derive(Debug, Default)]
pub struct InMemoryListingDirectory {
    listings: Mutex<HashMap<ListingId, ListingRecord>>,
}

impl InMemoryListingDirectory {
    /// Register a listing record.
    pub fn insert(&self, listing: ListingRecord) {
        locked(&self.listings).insert(listing.id, listing);
    }

    fn record(&self, id: ListingId) -> Option<ListingRecord> {
        locked(&self.listings).get(&id).cloned()
    }
}

#[async_trait]
impl ListingDirectory for InMemoryListingDirectory {
    async fn find_listing(&self, id: ListingId) -> Result<Option<ListingRecord>, DirectoryError> {
        Ok(self.record(id))
    }
}

/// Mailer that records every email instead of delivering it.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutboundEmail>>,
}

impl RecordingMailer {
    /// Every email handed to the mailer so far.
    #[must_use]
    pub fn sent(&self) -> Vec<OutboundEmail> {
        locked(&self.sent).clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailerError> {
        locked(&self.sent).push(email.clone());
        Ok(())
    }
}

/// Appointment repository backed by a map, with directory references resolved
/// through the shared in-memory directories.
pub struct InMemoryAppointmentRepository {
    records: Mutex<HashMap<AppointmentId, Appointment>>,
    users: std::sync::Arc<InMemoryUserDirectory>,
    listings: std::sync::Arc<InMemoryListingDirectory>,
}

impl InMemoryAppointmentRepository {
    /// Create a repository resolving details against the given directories.
    #[must_use]
    pub fn new(
        users: std::sync::Arc<InMemoryUserDirectory>,
        listings: std::sync::Arc<InMemoryListingDirectory>,
    ) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            users,
            listings,
        }
    }

    fn details_for(&self, appointment: Appointment) -> AppointmentDetails {
        let client_user = self.users.summary(appointment.client);
        let agent_user = self.users.summary(appointment.agent);
        let listing = self.listings.record(appointment.property);
        AppointmentDetails {
            appointment,
            client_user,
            agent_user,
            listing,
        }
    }

    fn matching(&self, filter: &AppointmentFilter, order: ListOrder) -> Vec<Appointment> {
        let mut matches: Vec<Appointment> = locked(&self.records)
            .values()
            .filter(|record| {
                filter.agent.is_none_or(|agent| record.agent == agent)
                    && filter.client.is_none_or(|client| record.client == client)
                    && filter.status.is_none_or(|status| record.status == status)
                    && filter
                        .payment_status
                        .is_none_or(|status| record.payment.status == status)
                    && filter
                        .payment_method
                        .is_none_or(|method| record.payment.method == method)
                    && filter.date.is_none_or(|date| record.date == date)
            })
            .cloned()
            .collect();
        match order {
            ListOrder::SlotAscending => {
                matches.sort_by(|a, b| {
                    (a.date, a.time.as_str()).cmp(&(b.date, b.time.as_str()))
                });
            }
            ListOrder::DateDescending => matches.sort_by(|a, b| b.date.cmp(&a.date)),
            ListOrder::CreatedDescending => {
                matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
        }
        matches
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn insert(&self, appointment: &Appointment) -> Result<(), AppointmentRepositoryError> {
        let mut records = locked(&self.records);
        let conflict = records.values().any(|record| {
            record.agent == appointment.agent
                && record.date == appointment.date
                && record.time == appointment.time
                && record.status.holds_slot()
        });
        if conflict {
            return Err(AppointmentRepositoryError::SlotTaken);
        }
        records.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: AppointmentId,
    ) -> Result<Option<Appointment>, AppointmentRepositoryError> {
        Ok(locked(&self.records).get(&id).cloned())
    }

    async fn find_details(
        &self,
        id: AppointmentId,
    ) -> Result<Option<AppointmentDetails>, AppointmentRepositoryError> {
        let record = locked(&self.records).get(&id).cloned();
        Ok(record.map(|appointment| self.details_for(appointment)))
    }

    async fn save(&self, appointment: &Appointment) -> Result<(), AppointmentRepositoryError> {
        let mut records = locked(&self.records);
        if !records.contains_key(&appointment.id) {
            return Err(AppointmentRepositoryError::query(format!(
                "appointment {} no longer exists",
                appointment.id
            )));
        }
        records.insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn slot_taken(
        &self,
        agent: UserId,
        date: NaiveDate,
        time: &TimeSlot,
    ) -> Result<bool, AppointmentRepositoryError> {
        Ok(locked(&self.records).values().any(|record| {
            record.agent == agent
                && record.date == date
                && record.time == *time
                && record.status.holds_slot()
        }))
    }

    async fn list(
        &self,
        filter: &AppointmentFilter,
        order: ListOrder,
        page: &PageRequest,
    ) -> Result<Page<AppointmentDetails>, AppointmentRepositoryError> {
        let matches = self.matching(filter, order);
        let total = matches.len() as u64;
        let items = matches
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit() as usize)
            .map(|appointment| self.details_for(appointment))
            .collect();
        Ok(Page::new(items, PageInfo::for_request(page, total)))
    }

    async fn list_all(
        &self,
        filter: &AppointmentFilter,
        order: ListOrder,
    ) -> Result<Vec<AppointmentDetails>, AppointmentRepositoryError> {
        Ok(self
            .matching(filter, order)
            .into_iter()
            .map(|appointment| self.details_for(appointment))
            .collect())
    }

    async fn payment_samples(&self) -> Result<Vec<PaymentSample>, AppointmentRepositoryError> {
        Ok(locked(&self.records)
            .values()
            .map(|record| PaymentSample {
                method: record.payment.method,
                status: record.payment.status,
                amount_cents: record.payment.amount_cents,
            })
            .collect())
    }

    async fn delete(&self, id: AppointmentId) -> Result<bool, AppointmentRepositoryError> {
        Ok(locked(&self.records).remove(&id).is_some())
    }
}
