//! Booking-time contact details and slot formats.
//!
//! The client info captured at booking is a snapshot independent of the user
//! profile, so it is validated here rather than trusted from the directory.
//! Time slots are literal strings; two bookings conflict only when their slot
//! strings compare equal, so the accepted formats are pinned down exactly.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

fn time_24h_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$").unwrap_or_else(|e| {
            panic!("24h time pattern must compile: {e}");
        })
    })
}

fn time_12h_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(0?[1-9]|1[0-2]):[0-5][0-9] ?(AM|PM)$").unwrap_or_else(|e| {
            panic!("12h time pattern must compile: {e}");
        })
    })
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|e| {
            panic!("email pattern must compile: {e}");
        })
    })
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\+?[1-9][0-9]{9,14}$").unwrap_or_else(|e| {
            panic!("phone pattern must compile: {e}");
        })
    })
}

/// Validation errors for [`TimeSlot`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeSlotError {
    /// The string matched neither the 24h nor the 12h format.
    #[error("Invalid time format. Use HH:MM or HH:MM AM/PM format")]
    InvalidFormat,
}

/// An appointment time slot in one of the accepted literal formats.
///
/// Accepts 24-hour `H:MM`/`HH:MM` and 12-hour `H:MM AM/PM` (case-insensitive,
/// optional space before the meridiem). The original string is preserved:
/// `"9:30"` and `"09:30"` are different slots by design.
///
/// # Examples
/// ```
/// use backend::domain::TimeSlot;
///
/// assert!(TimeSlot::new("09:30").is_ok());
/// assert!(TimeSlot::new("9:30 PM").is_ok());
/// assert!(TimeSlot::new("25:00").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot(String);

impl TimeSlot {
    /// Validate and construct a time slot.
    ///
    /// # Errors
    ///
    /// Returns [`TimeSlotError::InvalidFormat`] for anything outside the two
    /// accepted formats.
    pub fn new(value: impl Into<String>) -> Result<Self, TimeSlotError> {
        let value = value.into();
        if time_24h_pattern().is_match(&value) || time_12h_pattern().is_match(&value) {
            Ok(Self(value))
        } else {
            Err(TimeSlotError::InvalidFormat)
        }
    }

    /// Borrow the literal slot string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = TimeSlotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TimeSlot> for String {
    fn from(value: TimeSlot) -> Self {
        value.0
    }
}

/// Validation errors for [`ClientInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientInfoError {
    /// Name, phone, or email was missing/blank.
    #[error("Client information (name, phone, email) is required")]
    MissingField,
    /// Email did not match the RFC-light pattern.
    #[error("Invalid email format")]
    InvalidEmail,
    /// Phone, after separator stripping, was not 10-15 digits with an
    /// optional leading `+`.
    #[error("Invalid phone number format")]
    InvalidPhone,
}

/// Contact snapshot supplied by the client at booking time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Contact name for this booking.
    pub name: String,
    /// Contact phone number as entered (separators preserved).
    pub phone: String,
    /// Contact email address.
    pub email: String,
}

impl ClientInfo {
    /// Validate and construct a contact snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientInfoError`] when a field is blank or the email/phone
    /// format is invalid.
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<Self, ClientInfoError> {
        let name = name.into();
        let phone = phone.into();
        let email = email.into();
        if name.trim().is_empty() || phone.trim().is_empty() || email.trim().is_empty() {
            return Err(ClientInfoError::MissingField);
        }
        if !email_pattern().is_match(&email) {
            return Err(ClientInfoError::InvalidEmail);
        }
        let digits: String = phone
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
            .collect();
        if !phone_pattern().is_match(&digits) {
            return Err(ClientInfoError::InvalidPhone);
        }
        Ok(Self { name, phone, email })
    }
}

/// Whether the string is an acceptable email address.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    email_pattern().is_match(value)
}
