//! Appointment aggregate and its payment sub-record.
//!
//! Serialisation contract: camelCase JSON, amounts in integral minor units
//! (`amountCents`). The aggregate is persisted as one record; the directory
//! references (`client`, `agent`, `property`) are resolved into summaries by
//! the store's read-side join, never embedded here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::contact::{ClientInfo, TimeSlot};
use super::identity::{AppointmentId, DirectoryUser, ListingId, ListingRecord, UserId};

/// How the appointment is paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on arrival; auto-verified at creation.
    Cash,
    /// QR transfer requiring manual agent/admin verification.
    Qr,
}

impl PaymentMethod {
    /// Canonical lowercase name, as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Qr => "qr",
        }
    }

    /// Parse a stored method string; unknown values map to `None`.
    #[must_use]
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            "cash" => Some(Self::Cash),
            "qr" => Some(Self::Qr),
            _ => None,
        }
    }
}

/// Settlement state of the payment.
///
/// Cash: `Verified` immediately. QR: `Pending` until an agent or admin
/// approves (`Verified`) or rejects (`Rejected`); both outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting manual verification.
    Pending,
    /// Settled; a receipt exists.
    Verified,
    /// Verification failed; the appointment was cancelled.
    Rejected,
}

impl PaymentStatus {
    /// Canonical lowercase name, as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a stored status string; unknown values map to `None`.
    #[must_use]
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "verified" => Some(Self::Verified),
            // Legacy records wrote `failed` before the rename.
            "rejected" | "failed" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Lifecycle state of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Requested by the client, not yet confirmed.
    Pending,
    /// Confirmed by the agent (or by payment verification).
    Confirmed,
    /// Cancelled; terminal.
    Canceled,
    /// Completed; terminal.
    Completed,
}

impl AppointmentStatus {
    /// Canonical lowercase name, as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Canceled => "canceled",
            Self::Completed => "completed",
        }
    }

    /// Parse a stored status string; unknown values map to `None`.
    #[must_use]
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            // Both spellings occur in legacy data.
            "canceled" | "cancelled" => Some(Self::Canceled),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Whether no further status transition is permitted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Canceled | Self::Completed)
    }

    /// Whether this appointment occupies its (agent, date, time) slot.
    #[must_use]
    pub const fn holds_slot(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

/// QR transfer details captured at booking time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QrDetails {
    /// Address receipt/rejection emails are sent to.
    pub customer_email: String,
    /// Transfer reference supplied by the customer, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

/// Outcome of a manual payment verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum VerificationOutcome {
    /// The payment was approved.
    #[serde(rename_all = "camelCase")]
    Verified {
        /// Agent or admin who approved.
        by: UserId,
        /// When the approval happened.
        at: DateTime<Utc>,
        /// Free-text notes recorded with the approval.
        notes: String,
    },
    /// The payment was rejected.
    #[serde(rename_all = "camelCase")]
    Rejected {
        /// Agent or admin who rejected.
        by: UserId,
        /// When the rejection happened.
        at: DateTime<Utc>,
        /// Reason surfaced to the customer.
        reason: String,
    },
}

/// One entry in the append-only amount-change history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AmountChange {
    /// Amount before the change, in minor units.
    pub old_amount_cents: i64,
    /// Amount after the change, in minor units.
    pub new_amount_cents: i64,
    /// Admin who made the change.
    pub changed_by: UserId,
    /// When the change was made.
    pub changed_at: DateTime<Utc>,
    /// Recorded justification.
    pub reason: String,
}

/// Payment sub-record; always present on an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Payment method chosen at booking.
    pub method: PaymentMethod,
    /// Settlement state.
    pub status: PaymentStatus,
    /// Amount in integral minor units; always positive.
    pub amount_cents: i64,
    /// QR transfer details; present iff `method` is [`PaymentMethod::Qr`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_details: Option<QrDetails>,
    /// Manual verification outcome, once one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<VerificationOutcome>,
    /// Append-only admin amount-change log.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amount_history: Vec<AmountChange>,
}

impl Payment {
    /// Customer email for QR payments, if present.
    #[must_use]
    pub fn customer_email(&self) -> Option<&str> {
        self.qr_details
            .as_ref()
            .map(|details| details.customer_email.as_str())
    }
}

/// Immutable proof of payment, generated exactly once per appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Collision-resistant receipt identifier.
    pub receipt_number: String,
    /// When the receipt was generated.
    pub generated_date: DateTime<Utc>,
    /// Whether the receipt may be retrieved by the involved parties.
    pub downloadable: bool,
}

impl Receipt {
    /// Generate a fresh receipt with a collision-resistant number.
    ///
    /// The number combines the millisecond timestamp with a random uppercase
    /// alphanumeric suffix: `RCP-<millis>-<4 chars>`.
    #[must_use]
    pub fn generate(now: DateTime<Utc>) -> Self {
        use rand::Rng;

        let suffix: String = rand::thread_rng()
            .sample_iter(rand::distributions::Alphanumeric)
            .take(4)
            .map(|byte| char::from(byte).to_ascii_uppercase())
            .collect();
        Self {
            receipt_number: format!("RCP-{}-{suffix}", now.timestamp_millis()),
            generated_date: now,
            downloadable: true,
        }
    }
}

/// The central appointment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    /// Unique identifier, generated at creation.
    pub id: AppointmentId,
    /// Requesting user; immutable.
    pub client: UserId,
    /// Assigned agent; immutable, must carry the agent role.
    pub agent: UserId,
    /// Listing being viewed; immutable.
    pub property: ListingId,
    /// Calendar date of the slot; immutable (no reschedule operation).
    pub date: NaiveDate,
    /// Literal time slot string; immutable.
    pub time: TimeSlot,
    /// Contact snapshot supplied at booking.
    pub client_info: ClientInfo,
    /// Address snapshot, defaulted from the listing when not supplied.
    pub property_address: String,
    /// Optional free-text message from the client.
    pub message: String,
    /// Lifecycle state.
    pub status: AppointmentStatus,
    /// Payment sub-record.
    pub payment: Payment,
    /// Proof of payment; populated once payment is verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Receipt>,
    /// Record creation timestamp (system-managed).
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp (system-managed).
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Attach a receipt if none exists yet.
    ///
    /// Receipt numbers are assigned exactly once; a second attempt is a no-op
    /// returning `false`.
    pub fn attach_receipt(&mut self, receipt: Receipt) -> bool {
        if self.receipt.is_some() {
            return false;
        }
        self.receipt = Some(receipt);
        true
    }
}

/// Compact directory summary embedded in detailed responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// Directory identifier.
    pub id: UserId,
    /// Display/login name.
    pub username: String,
    /// Contact email.
    pub email: String,
}

impl From<DirectoryUser> for UserSummary {
    fn from(user: DirectoryUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

/// An appointment with its directory references resolved for responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDetails {
    /// The appointment record itself.
    #[serde(flatten)]
    pub appointment: Appointment,
    /// Resolved client record, when still present in the directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_user: Option<UserSummary>,
    /// Resolved agent record, when still present in the directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_user: Option<UserSummary>,
    /// Resolved listing record, when still present in the directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing: Option<ListingRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_exactly_canceled_and_completed() {
        assert!(!AppointmentStatus::Pending.is_terminal());
        assert!(!AppointmentStatus::Confirmed.is_terminal());
        assert!(AppointmentStatus::Canceled.is_terminal());
        assert!(AppointmentStatus::Completed.is_terminal());
    }

    #[test]
    fn slot_holders_are_pending_and_confirmed() {
        assert!(AppointmentStatus::Pending.holds_slot());
        assert!(AppointmentStatus::Confirmed.holds_slot());
        assert!(!AppointmentStatus::Canceled.holds_slot());
        assert!(!AppointmentStatus::Completed.holds_slot());
    }

    #[test]
    fn legacy_spellings_parse() {
        assert_eq!(
            AppointmentStatus::from_stored("cancelled"),
            Some(AppointmentStatus::Canceled)
        );
        assert_eq!(
            PaymentStatus::from_stored("failed"),
            Some(PaymentStatus::Rejected)
        );
    }

    #[test]
    fn payment_serialises_amount_in_minor_units() {
        let payment = Payment {
            method: PaymentMethod::Cash,
            status: PaymentStatus::Verified,
            amount_cents: 10_000,
            qr_details: None,
            outcome: None,
            amount_history: Vec::new(),
        };
        let value = serde_json::to_value(&payment).expect("serialises");
        assert_eq!(value["amountCents"], 10_000);
        assert_eq!(value["method"], "cash");
        assert_eq!(value["status"], "verified");
    }
}
