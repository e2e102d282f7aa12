//! Scheduling engine: validated appointment creation.
//!
//! Validation fails fast with a distinct error per rule. Slot conflicts are a
//! literal equality check on (agent, date, time) against slot-holding
//! statuses; the store additionally enforces a uniqueness constraint, so a
//! concurrent duplicate that slips past the probe still surfaces as the same
//! conflict error.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use mockable::Clock;
use tracing::debug;

use super::appointment::{
    Appointment, AppointmentDetails, AppointmentStatus, Payment, PaymentMethod, PaymentStatus,
    QrDetails, Receipt,
};
use super::contact::{is_valid_email, ClientInfo, ClientInfoError, TimeSlot, TimeSlotError};
use super::error::Error;
use super::identity::{AppointmentId, Requester};
use super::ports::{
    AppointmentRepository, AppointmentRepositoryError, BookingRequest, DirectoryError,
    ListingDirectory, PaymentInput, Scheduling, UserDirectory,
};

/// Payment defaults applied when a booking omits the payment descriptor.
///
/// Injected at construction from server configuration; the canonical schema
/// keeps payment always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentDefaults {
    /// Amount in minor units for defaulted cash payments.
    pub default_amount_cents: i64,
}

impl Default for PaymentDefaults {
    fn default() -> Self {
        Self {
            default_amount_cents: 10_000,
        }
    }
}

/// Appointment creation service implementing the [`Scheduling`] driving port.
#[derive(Clone)]
pub struct SchedulingService {
    repository: Arc<dyn AppointmentRepository>,
    users: Arc<dyn UserDirectory>,
    listings: Arc<dyn ListingDirectory>,
    clock: Arc<dyn Clock>,
    payment_defaults: PaymentDefaults,
}

impl SchedulingService {
    /// Create a new service over the given ports.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AppointmentRepository>,
        users: Arc<dyn UserDirectory>,
        listings: Arc<dyn ListingDirectory>,
        clock: Arc<dyn Clock>,
        payment_defaults: PaymentDefaults,
    ) -> Self {
        Self {
            repository,
            users,
            listings,
            clock,
            payment_defaults,
        }
    }

    fn build_payment(&self, input: Option<PaymentInput>) -> Result<Payment, Error> {
        let Some(input) = input else {
            // Canonical schema: payment always present, defaulting to
            // auto-verified cash at the configured amount.
            return Ok(Payment {
                method: PaymentMethod::Cash,
                status: PaymentStatus::Verified,
                amount_cents: self.payment_defaults.default_amount_cents,
                qr_details: None,
                outcome: None,
                amount_history: Vec::new(),
            });
        };

        let method = input
            .method
            .as_deref()
            .ok_or_else(|| Error::invalid_request("Payment method is required"))?;
        let method = PaymentMethod::from_stored(method)
            .ok_or_else(|| Error::invalid_request("Payment method must be cash or qr"))?;

        let amount_cents = input
            .amount_cents
            .ok_or_else(|| Error::invalid_request("Valid payment amount is required"))?;
        if amount_cents <= 0 {
            return Err(Error::invalid_request("Valid payment amount is required"));
        }

        let qr_details = match method {
            PaymentMethod::Cash => None,
            PaymentMethod::Qr => {
                let customer_email = input
                    .customer_email
                    .filter(|email| !email.trim().is_empty())
                    .ok_or_else(|| {
                        Error::invalid_request("Customer email is required for QR payments")
                    })?;
                if !is_valid_email(&customer_email) {
                    return Err(Error::invalid_request("Invalid email format"));
                }
                Some(QrDetails {
                    customer_email,
                    transaction_id: input.transaction_id,
                })
            }
        };

        Ok(Payment {
            method,
            status: match method {
                PaymentMethod::Cash => PaymentStatus::Verified,
                PaymentMethod::Qr => PaymentStatus::Pending,
            },
            amount_cents,
            qr_details,
            outcome: None,
            amount_history: Vec::new(),
        })
    }
}

fn map_repository_error(error: AppointmentRepositoryError) -> Error {
    match error {
        AppointmentRepositoryError::Connection { message } => Error::service_unavailable(message),
        AppointmentRepositoryError::Query { message }
        | AppointmentRepositoryError::Corrupt { message } => Error::internal(message),
        AppointmentRepositoryError::SlotTaken => {
            Error::conflict("Agent is not available at this time")
        }
    }
}

fn map_directory_error(error: DirectoryError) -> Error {
    match error {
        DirectoryError::Connection { message } => Error::service_unavailable(message),
        DirectoryError::Lookup { message } => Error::internal(message),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| Error::invalid_request("Invalid date format"))
}

fn parse_time(raw: &str) -> Result<TimeSlot, Error> {
    TimeSlot::new(raw).map_err(|TimeSlotError::InvalidFormat| {
        Error::invalid_request("Invalid time format. Use HH:MM or HH:MM AM/PM format")
    })
}

fn map_client_info_error(error: ClientInfoError) -> Error {
    Error::invalid_request(error.to_string())
}

#[async_trait]
impl Scheduling for SchedulingService {
    async fn create(
        &self,
        request: BookingRequest,
        requester: Requester,
    ) -> Result<AppointmentDetails, Error> {
        // 1. Required-field presence, each with its own message.
        let property = request
            .property
            .ok_or_else(|| Error::invalid_request("Property ID is required"))?;
        let agent = request
            .agent
            .ok_or_else(|| Error::invalid_request("Agent ID is required"))?;
        let raw_date = request
            .date
            .ok_or_else(|| Error::invalid_request("Appointment date is required"))?;
        let raw_time = request
            .time
            .ok_or_else(|| Error::invalid_request("Appointment time is required"))?;
        let contact = request.client_info.ok_or_else(|| {
            Error::invalid_request("Client information (name, phone, email) is required")
        })?;

        // 2. Payment descriptor (or configured defaults).
        let payment = self.build_payment(request.payment)?;

        // 3. The referenced user must exist and carry the agent role.
        let agent_user = self
            .users
            .find_user(agent)
            .await
            .map_err(map_directory_error)?;
        let agent_user = match agent_user {
            Some(user) if user.is_agent() => user,
            _ => return Err(Error::invalid_request("Invalid agent selected")),
        };

        // 4. The referenced listing must exist.
        let listing = self
            .listings
            .find_listing(property)
            .await
            .map_err(map_directory_error)?
            .ok_or_else(|| Error::invalid_request("Property not found"))?;

        // 5. Slot formats, then the conflict probe against slot holders.
        let date = parse_date(&raw_date)?;
        let time = parse_time(&raw_time)?;
        if self
            .repository
            .slot_taken(agent, date, &time)
            .await
            .map_err(map_repository_error)?
        {
            return Err(Error::conflict("Agent is not available at this time"));
        }

        // 6. Day-granularity past check; time of day is ignored.
        let today = self.clock.utc().date_naive();
        if date < today {
            return Err(Error::invalid_request(
                "Appointment date cannot be in the past",
            ));
        }

        // 7. Contact snapshot formats.
        let client_info = ClientInfo::new(
            contact.name.unwrap_or_default(),
            contact.phone.unwrap_or_default(),
            contact.email.unwrap_or_default(),
        )
        .map_err(map_client_info_error)?;

        let now = self.clock.utc();
        let mut appointment = Appointment {
            id: AppointmentId::random(),
            client: requester.id,
            agent: agent_user.id,
            property: listing.id,
            date,
            time,
            client_info,
            property_address: request
                .property_address
                .filter(|address| !address.trim().is_empty())
                .unwrap_or_else(|| listing.address.clone()),
            message: request.message.unwrap_or_default(),
            status: AppointmentStatus::Pending,
            payment,
            receipt: None,
            created_at: now,
            updated_at: now,
        };
        // Cash auto-verifies, so its receipt exists from the start.
        if appointment.payment.status == PaymentStatus::Verified {
            let issued = appointment.attach_receipt(Receipt::generate(now));
            debug!(appointment = %appointment.id, issued, "cash receipt generated at booking");
        }

        self.repository
            .insert(&appointment)
            .await
            .map_err(map_repository_error)?;

        match self
            .repository
            .find_details(appointment.id)
            .await
            .map_err(map_repository_error)?
        {
            Some(details) => Ok(details),
            // The read-back can only miss if the record was deleted between
            // the two calls; respond with the unresolved record.
            None => Ok(AppointmentDetails {
                appointment,
                client_user: None,
                agent_user: None,
                listing: None,
            }),
        }
    }
}

#[cfg(test)]
#[path = "scheduling_tests.rs"]
mod scheduling_tests;
