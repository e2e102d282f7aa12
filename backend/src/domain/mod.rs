//! Domain layer: appointment scheduling and the payment workflow.
//!
//! The hexagon's core. Entities live in `appointment`, `contact`, and
//! `identity`; the port traits the adapters implement or consume live in
//! `ports`; the three services (`scheduling`, `appointments`, `payments`)
//! implement the driving ports and hold every business rule, so the HTTP
//! layer stays a thin translation shell.

pub mod appointment;
pub mod appointments;
pub mod authorization;
pub mod contact;
pub mod error;
pub mod identity;
pub mod payments;
pub mod ports;
pub mod scheduling;

#[cfg(test)]
pub(crate) mod fixtures;

pub use self::appointment::{
    AmountChange, Appointment, AppointmentDetails, AppointmentStatus, Payment, PaymentMethod,
    PaymentStatus, QrDetails, Receipt, UserSummary, VerificationOutcome,
};
pub use self::appointments::AppointmentsService;
pub use self::contact::{ClientInfo, ClientInfoError, TimeSlot, TimeSlotError};
pub use self::error::{Error, ErrorCode};
pub use self::identity::{
    AppointmentId, DirectoryUser, ListingId, ListingRecord, Requester, UserId, UserRole,
};
pub use self::payments::PaymentsService;
pub use self::scheduling::{PaymentDefaults, SchedulingService};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
