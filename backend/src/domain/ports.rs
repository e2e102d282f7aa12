//! Domain ports defining the edges of the hexagon.
//!
//! Driven ports (repository, directories, mailer) describe how the domain
//! expects to reach infrastructure; driving ports (scheduling, appointments,
//! payments) are the use-case surface consumed by inbound adapters. Each
//! driven port exposes strongly typed errors so adapters map their failures
//! into predictable variants instead of returning `anyhow::Result`.

use async_trait::async_trait;
use chrono::NaiveDate;
use pagination::{Page, PageRequest};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::appointment::{
    Appointment, AppointmentDetails, AppointmentStatus, Payment, PaymentMethod, PaymentStatus,
    Receipt,
};
use super::contact::TimeSlot;
use super::error::Error;
use super::identity::{AppointmentId, DirectoryUser, ListingId, ListingRecord, Requester, UserId};

// ---------------------------------------------------------------------------
// Driven ports
// ---------------------------------------------------------------------------

/// Errors surfaced by the appointment persistence adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppointmentRepositoryError {
    /// Database connectivity or pool failures.
    #[error("appointment store connection failed: {message}")]
    Connection {
        /// Adapter-provided failure description.
        message: String,
    },
    /// Query construction or execution failures.
    #[error("appointment store query failed: {message}")]
    Query {
        /// Adapter-provided failure description.
        message: String,
    },
    /// Row contents that cannot be mapped back into domain types.
    #[error("appointment record is corrupt: {message}")]
    Corrupt {
        /// What failed to map.
        message: String,
    },
    /// The store's uniqueness constraint rejected a duplicate slot holder.
    #[error("slot already booked for this agent, date, and time")]
    SlotTaken,
}

impl AppointmentRepositoryError {
    /// Helper for connection-level failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query-level failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Helper for row-mapping failures.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the user/listing directory adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// Directory backend unavailable.
    #[error("directory connection failed: {message}")]
    Connection {
        /// Adapter-provided failure description.
        message: String,
    },
    /// Lookup failed for another reason.
    #[error("directory lookup failed: {message}")]
    Lookup {
        /// Adapter-provided failure description.
        message: String,
    },
}

impl DirectoryError {
    /// Helper for connection-level failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for lookup failures.
    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the mailer adapter. Always swallowed and logged by the
/// domain; never propagated to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailerError {
    /// Transport-level delivery failure.
    #[error("mail delivery failed: {message}")]
    Delivery {
        /// Adapter-provided failure description.
        message: String,
    },
}

impl MailerError {
    /// Helper for delivery failures.
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
        }
    }
}

/// Filter applied to appointment list queries. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    /// Restrict to a single agent.
    pub agent: Option<UserId>,
    /// Restrict to a single client.
    pub client: Option<UserId>,
    /// Restrict to one lifecycle status.
    pub status: Option<AppointmentStatus>,
    /// Restrict to one payment status.
    pub payment_status: Option<PaymentStatus>,
    /// Restrict to one payment method.
    pub payment_method: Option<PaymentMethod>,
    /// Restrict to one calendar date.
    pub date: Option<NaiveDate>,
}

/// Sort order for appointment list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    /// Date ascending, then time ascending (agent work queues).
    SlotAscending,
    /// Date descending (client history).
    DateDescending,
    /// Creation time descending (admin views).
    CreatedDescending,
}

/// One payment observation used by the stats aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentSample {
    /// Payment method of the observed appointment.
    pub method: PaymentMethod,
    /// Payment status of the observed appointment.
    pub status: PaymentStatus,
    /// Amount in minor units.
    pub amount_cents: i64,
}

/// Persisted appointment records: CRUD, slot probing, and read-side joins
/// against the directory tables.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Persist a new appointment.
    ///
    /// Returns [`AppointmentRepositoryError::SlotTaken`] when the store's
    /// uniqueness constraint detects a concurrent booking for the same slot.
    async fn insert(&self, appointment: &Appointment) -> Result<(), AppointmentRepositoryError>;

    /// Load a raw appointment record.
    async fn find_by_id(
        &self,
        id: AppointmentId,
    ) -> Result<Option<Appointment>, AppointmentRepositoryError>;

    /// Load an appointment with directory references resolved.
    async fn find_details(
        &self,
        id: AppointmentId,
    ) -> Result<Option<AppointmentDetails>, AppointmentRepositoryError>;

    /// Persist changes to an existing appointment (last write wins).
    async fn save(&self, appointment: &Appointment) -> Result<(), AppointmentRepositoryError>;

    /// Whether any appointment in a slot-holding status occupies the exact
    /// (agent, date, time) triple.
    async fn slot_taken(
        &self,
        agent: UserId,
        date: NaiveDate,
        time: &TimeSlot,
    ) -> Result<bool, AppointmentRepositoryError>;

    /// Paginated, filtered listing with directory references resolved.
    async fn list(
        &self,
        filter: &AppointmentFilter,
        order: ListOrder,
        page: &PageRequest,
    ) -> Result<Page<AppointmentDetails>, AppointmentRepositoryError>;

    /// Unpaginated filtered listing (client history, pending payments).
    async fn list_all(
        &self,
        filter: &AppointmentFilter,
        order: ListOrder,
    ) -> Result<Vec<AppointmentDetails>, AppointmentRepositoryError>;

    /// Every payment observation, for the stats aggregation.
    async fn payment_samples(&self) -> Result<Vec<PaymentSample>, AppointmentRepositoryError>;

    /// Delete a record; returns whether it existed.
    async fn delete(&self, id: AppointmentId) -> Result<bool, AppointmentRepositoryError>;
}

/// User lookups against the external directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a user record by id.
    async fn find_user(&self, id: UserId) -> Result<Option<DirectoryUser>, DirectoryError>;
}

/// Listing lookups against the external directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingDirectory: Send + Sync {
    /// Find a listing record by id.
    async fn find_listing(&self, id: ListingId) -> Result<Option<ListingRecord>, DirectoryError>;
}

/// An outbound email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html_body: String,
}

/// Best-effort email delivery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one email.
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailerError>;
}

// ---------------------------------------------------------------------------
// Driving ports
// ---------------------------------------------------------------------------

/// Raw contact fields from a booking request, validated by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfoInput {
    /// Contact name.
    pub name: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Contact email.
    pub email: Option<String>,
}

/// Raw payment descriptor from a booking request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentInput {
    /// Requested method (`cash` or `qr`).
    pub method: Option<String>,
    /// Amount in minor units.
    pub amount_cents: Option<i64>,
    /// Customer email for QR receipts.
    pub customer_email: Option<String>,
    /// Transfer reference supplied by the customer.
    pub transaction_id: Option<String>,
}

/// A booking request as received from the inbound adapter.
///
/// Fields are raw optionals: the scheduling engine owns presence and format
/// validation so failures keep their documented order and messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingRequest {
    /// Listing to view.
    pub property: Option<ListingId>,
    /// Agent to book.
    pub agent: Option<UserId>,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Time slot string.
    pub time: Option<String>,
    /// Optional free-text message.
    pub message: Option<String>,
    /// Optional property-address override.
    pub property_address: Option<String>,
    /// Contact snapshot.
    pub client_info: Option<ClientInfoInput>,
    /// Optional payment descriptor; defaults apply when absent.
    pub payment: Option<PaymentInput>,
}

/// Appointment creation use-case.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Scheduling: Send + Sync {
    /// Validate and create an appointment on behalf of `requester`.
    async fn create(
        &self,
        request: BookingRequest,
        requester: Requester,
    ) -> Result<AppointmentDetails, Error>;
}

/// Optional filters accepted by the list endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Restrict to one lifecycle status.
    pub status: Option<AppointmentStatus>,
    /// Restrict to one payment status.
    pub payment_status: Option<PaymentStatus>,
    /// Restrict to one calendar date.
    pub date: Option<NaiveDate>,
}

/// Appointment query and lifecycle use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Appointments: Send + Sync {
    /// Appointments assigned to the requesting agent (admins included).
    async fn list_for_agent(
        &self,
        requester: Requester,
        filter: ListFilter,
        page: PageRequest,
    ) -> Result<Page<AppointmentDetails>, Error>;

    /// Every appointment booked by the requesting client.
    async fn list_for_client(&self, requester: Requester)
    -> Result<Vec<AppointmentDetails>, Error>;

    /// Unscoped listing; admin only.
    async fn list_all(
        &self,
        requester: Requester,
        filter: ListFilter,
        page: PageRequest,
    ) -> Result<Page<AppointmentDetails>, Error>;

    /// Appointment details for an involved party or admin.
    async fn get(
        &self,
        id: AppointmentId,
        requester: Requester,
    ) -> Result<AppointmentDetails, Error>;

    /// Move the appointment to `status`; assigned agent or admin only.
    async fn update_status(
        &self,
        id: AppointmentId,
        status: AppointmentStatus,
        requester: Requester,
    ) -> Result<AppointmentDetails, Error>;

    /// Cancel the appointment; owning client, assigned agent, or admin.
    async fn cancel(
        &self,
        id: AppointmentId,
        requester: Requester,
    ) -> Result<AppointmentDetails, Error>;

    /// Remove the record entirely; admin only.
    async fn delete(&self, id: AppointmentId, requester: Requester) -> Result<(), Error>;
}

/// Agent/admin decision on a QR payment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationDecision {
    /// `true` approves, `false` rejects.
    pub approved: bool,
    /// Notes (approval) or reason (rejection).
    pub notes: Option<String>,
}

/// Compact appointment summary attached to payment/receipt responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSummary {
    /// Appointment identifier.
    pub id: AppointmentId,
    /// Lifecycle status.
    pub status: AppointmentStatus,
    /// Calendar date of the slot.
    pub date: NaiveDate,
    /// Literal time slot.
    pub time: TimeSlot,
}

impl From<&Appointment> for AppointmentSummary {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id,
            status: appointment.status,
            date: appointment.date,
            time: appointment.time.clone(),
        }
    }
}

/// Payment block plus appointment summary returned by the details endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    /// The payment sub-record.
    pub payment: Payment,
    /// Summary of the owning appointment.
    pub appointment: AppointmentSummary,
}

/// Pending QR payments awaiting verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingPayments {
    /// Matching appointments, newest first.
    pub pending_payments: Vec<AppointmentDetails>,
    /// Number of matches.
    pub count: u64,
}

/// Aggregates for one payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MethodStats {
    /// Payment method these aggregates describe.
    pub method: PaymentMethod,
    /// Number of appointments using this method.
    pub count: u64,
    /// Sum of amounts in minor units.
    pub total_amount_cents: i64,
    /// Count with verified payment.
    pub verified: u64,
    /// Count with pending payment.
    pub pending: u64,
    /// Count with rejected payment.
    pub rejected: u64,
}

/// Whole-store payment aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    /// Total number of appointments observed.
    pub total_appointments: u64,
    /// Sum of all payment amounts in minor units.
    pub total_revenue_cents: i64,
    /// Mean payment amount in minor units (floor; 0 when empty).
    pub average_amount_cents: i64,
}

/// Response of the admin stats endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatsReport {
    /// Aggregates grouped by payment method.
    pub payment_method_stats: Vec<MethodStats>,
    /// Aggregates across every appointment.
    pub overall_stats: OverallStats,
}

/// Receipt plus appointment summary returned by the receipt endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptView {
    /// The immutable receipt.
    pub receipt: Receipt,
    /// Summary of the owning appointment.
    pub appointment: AppointmentSummary,
}

/// Payment verification and reporting use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Payments: Send + Sync {
    /// Approve or reject a pending QR payment.
    async fn verify(
        &self,
        id: AppointmentId,
        decision: VerificationDecision,
        requester: Requester,
    ) -> Result<AppointmentDetails, Error>;

    /// Payment block for an involved party or admin.
    async fn details(
        &self,
        id: AppointmentId,
        requester: Requester,
    ) -> Result<PaymentDetails, Error>;

    /// QR payments awaiting verification (agents see their own).
    async fn pending(&self, requester: Requester) -> Result<PendingPayments, Error>;

    /// Store-wide payment aggregates; admin only.
    async fn stats(&self, requester: Requester) -> Result<PaymentStatsReport, Error>;

    /// Overwrite the amount of an unverified payment; admin only.
    async fn update_amount(
        &self,
        id: AppointmentId,
        amount_cents: i64,
        reason: Option<String>,
        requester: Requester,
    ) -> Result<Appointment, Error>;

    /// Receipt for a verified payment; involved parties and admins.
    async fn receipt(&self, id: AppointmentId, requester: Requester)
    -> Result<ReceiptView, Error>;
}
