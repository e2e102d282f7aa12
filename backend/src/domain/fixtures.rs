//! Shared fixtures for the domain service unit tests.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use mockable::Clock;

use super::appointment::{
    Appointment, AppointmentStatus, Payment, PaymentMethod, PaymentStatus, QrDetails,
};
use super::contact::{ClientInfo, TimeSlot};
use super::identity::{
    AppointmentId, DirectoryUser, ListingId, ListingRecord, Requester, UserId, UserRole,
};

pub(crate) fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

pub(crate) fn fixture_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid fixture date")
}

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub(crate) fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock {
        utc_now: fixture_timestamp(),
    })
}

pub(crate) fn agent_user(id: UserId) -> DirectoryUser {
    DirectoryUser {
        id,
        username: "agent-smith".to_owned(),
        email: "smith@example.com".to_owned(),
        role: UserRole::Agent,
    }
}

pub(crate) fn listing_record(id: ListingId) -> ListingRecord {
    ListingRecord {
        id,
        name: "Sunny Two-Bed".to_owned(),
        address: "12 Elm Street".to_owned(),
    }
}

pub(crate) fn requester(role: UserRole) -> Requester {
    Requester {
        id: UserId::random(),
        role,
    }
}

pub(crate) fn cash_payment() -> Payment {
    Payment {
        method: PaymentMethod::Cash,
        status: PaymentStatus::Verified,
        amount_cents: 10_000,
        qr_details: None,
        outcome: None,
        amount_history: Vec::new(),
    }
}

pub(crate) fn pending_qr_payment() -> Payment {
    Payment {
        method: PaymentMethod::Qr,
        status: PaymentStatus::Pending,
        amount_cents: 25_000,
        qr_details: Some(QrDetails {
            customer_email: "customer@example.com".to_owned(),
            transaction_id: Some("TXN-1".to_owned()),
        }),
        outcome: None,
        amount_history: Vec::new(),
    }
}

pub(crate) fn fixture_appointment(client: UserId, agent: UserId, payment: Payment) -> Appointment {
    Appointment {
        id: AppointmentId::random(),
        client,
        agent,
        property: ListingId::random(),
        date: fixture_date(),
        time: TimeSlot::new("10:00 AM").expect("valid slot"),
        client_info: ClientInfo::new("Jane Doe", "5551234567", "jane@example.com")
            .expect("valid contact"),
        property_address: "12 Elm Street".to_owned(),
        message: String::new(),
        status: AppointmentStatus::Pending,
        payment,
        receipt: None,
        created_at: fixture_timestamp(),
        updated_at: fixture_timestamp(),
    }
}
