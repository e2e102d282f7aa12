//! Internal Diesel row structs and their domain conversions.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Enum-ish columns are stored as their
//! canonical lowercase strings; the verification outcome and amount-change
//! history are `jsonb` documents. A row that no longer maps back into domain
//! types surfaces as [`AppointmentRepositoryError::Corrupt`] rather than a
//! panic.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::ports::AppointmentRepositoryError;
use crate::domain::{
    Appointment, AppointmentId, AppointmentStatus, ClientInfo, ListingId, Payment, PaymentMethod,
    PaymentStatus, QrDetails, Receipt, TimeSlot, UserId,
};

use super::schema::{appointments, listings, users};

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
}

/// Row struct for reading from the listings table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = listings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ListingRow {
    pub id: Uuid,
    pub name: String,
    pub address: String,
}

/// Row struct for reading from the appointments table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = appointments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AppointmentRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub agent_id: Uuid,
    pub property_id: Uuid,
    pub date: NaiveDate,
    pub time_slot: String,
    pub client_name: String,
    pub client_phone: String,
    pub client_email: String,
    pub property_address: String,
    pub message: String,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String,
    pub amount_cents: i64,
    pub qr_customer_email: Option<String>,
    pub qr_transaction_id: Option<String>,
    pub outcome: Option<serde_json::Value>,
    pub amount_history: serde_json::Value,
    pub receipt_number: Option<String>,
    pub receipt_generated_at: Option<DateTime<Utc>>,
    pub receipt_downloadable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable struct for creating appointment records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = appointments)]
pub(crate) struct NewAppointmentRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub agent_id: Uuid,
    pub property_id: Uuid,
    pub date: NaiveDate,
    pub time_slot: String,
    pub client_name: String,
    pub client_phone: String,
    pub client_email: String,
    pub property_address: String,
    pub message: String,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String,
    pub amount_cents: i64,
    pub qr_customer_email: Option<String>,
    pub qr_transaction_id: Option<String>,
    pub outcome: Option<serde_json::Value>,
    pub amount_history: serde_json::Value,
    pub receipt_number: Option<String>,
    pub receipt_generated_at: Option<DateTime<Utc>>,
    pub receipt_downloadable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset struct covering every mutable appointment field.
///
/// The slot triple, directory references, and contact snapshot are immutable
/// after creation, so they never appear here. `treat_none_as_null` keeps the
/// changeset a full overwrite of the mutable fields (last write wins).
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = appointments)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct AppointmentUpdate {
    pub status: String,
    pub payment_status: String,
    pub amount_cents: i64,
    pub outcome: Option<serde_json::Value>,
    pub amount_history: serde_json::Value,
    pub receipt_number: Option<String>,
    pub receipt_generated_at: Option<DateTime<Utc>>,
    pub receipt_downloadable: bool,
    pub updated_at: DateTime<Utc>,
}

fn corrupt(message: String) -> AppointmentRepositoryError {
    AppointmentRepositoryError::Corrupt { message }
}

fn encode_json<T: serde::Serialize>(
    value: &T,
    what: &str,
) -> Result<serde_json::Value, AppointmentRepositoryError> {
    serde_json::to_value(value)
        .map_err(|error| AppointmentRepositoryError::query(format!("could not encode {what}: {error}")))
}

/// Convert a stored row back into the domain aggregate.
pub(crate) fn row_to_appointment(
    row: AppointmentRow,
) -> Result<Appointment, AppointmentRepositoryError> {
    let status = AppointmentStatus::from_stored(&row.status)
        .ok_or_else(|| corrupt(format!("unknown appointment status `{}`", row.status)))?;
    let method = PaymentMethod::from_stored(&row.payment_method)
        .ok_or_else(|| corrupt(format!("unknown payment method `{}`", row.payment_method)))?;
    let payment_status = PaymentStatus::from_stored(&row.payment_status)
        .ok_or_else(|| corrupt(format!("unknown payment status `{}`", row.payment_status)))?;
    let time = TimeSlot::new(row.time_slot)
        .map_err(|error| corrupt(format!("stored time slot rejected: {error}")))?;
    let outcome = row
        .outcome
        .map(serde_json::from_value)
        .transpose()
        .map_err(|error| corrupt(format!("verification outcome does not decode: {error}")))?;
    let amount_history = serde_json::from_value(row.amount_history)
        .map_err(|error| corrupt(format!("amount history does not decode: {error}")))?;
    let qr_details = row.qr_customer_email.map(|customer_email| QrDetails {
        customer_email,
        transaction_id: row.qr_transaction_id,
    });
    let receipt = match (row.receipt_number, row.receipt_generated_at) {
        (None, None) => None,
        (Some(receipt_number), Some(generated_date)) => Some(Receipt {
            receipt_number,
            generated_date,
            downloadable: row.receipt_downloadable,
        }),
        _ => {
            return Err(corrupt(
                "receipt number and generation timestamp must be set together".to_owned(),
            ));
        }
    };

    Ok(Appointment {
        id: AppointmentId::from_uuid(row.id),
        client: UserId::from_uuid(row.client_id),
        agent: UserId::from_uuid(row.agent_id),
        property: ListingId::from_uuid(row.property_id),
        date: row.date,
        time,
        client_info: ClientInfo {
            name: row.client_name,
            phone: row.client_phone,
            email: row.client_email,
        },
        property_address: row.property_address,
        message: row.message,
        status,
        payment: Payment {
            method,
            status: payment_status,
            amount_cents: row.amount_cents,
            qr_details,
            outcome,
            amount_history,
        },
        receipt,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Build the insertable row for a freshly created appointment.
pub(crate) fn appointment_to_insert(
    appointment: &Appointment,
) -> Result<NewAppointmentRow, AppointmentRepositoryError> {
    let outcome = appointment
        .payment
        .outcome
        .as_ref()
        .map(|outcome| encode_json(outcome, "verification outcome"))
        .transpose()?;
    Ok(NewAppointmentRow {
        id: *appointment.id.as_uuid(),
        client_id: *appointment.client.as_uuid(),
        agent_id: *appointment.agent.as_uuid(),
        property_id: *appointment.property.as_uuid(),
        date: appointment.date,
        time_slot: appointment.time.as_str().to_owned(),
        client_name: appointment.client_info.name.clone(),
        client_phone: appointment.client_info.phone.clone(),
        client_email: appointment.client_info.email.clone(),
        property_address: appointment.property_address.clone(),
        message: appointment.message.clone(),
        status: appointment.status.as_str().to_owned(),
        payment_method: appointment.payment.method.as_str().to_owned(),
        payment_status: appointment.payment.status.as_str().to_owned(),
        amount_cents: appointment.payment.amount_cents,
        qr_customer_email: appointment
            .payment
            .qr_details
            .as_ref()
            .map(|details| details.customer_email.clone()),
        qr_transaction_id: appointment
            .payment
            .qr_details
            .as_ref()
            .and_then(|details| details.transaction_id.clone()),
        outcome,
        amount_history: encode_json(&appointment.payment.amount_history, "amount history")?,
        receipt_number: appointment
            .receipt
            .as_ref()
            .map(|receipt| receipt.receipt_number.clone()),
        receipt_generated_at: appointment.receipt.as_ref().map(|receipt| receipt.generated_date),
        receipt_downloadable: appointment
            .receipt
            .as_ref()
            .is_some_and(|receipt| receipt.downloadable),
        created_at: appointment.created_at,
        updated_at: appointment.updated_at,
    })
}

/// Build the changeset persisting an appointment's mutable fields.
pub(crate) fn appointment_to_update(
    appointment: &Appointment,
) -> Result<AppointmentUpdate, AppointmentRepositoryError> {
    let outcome = appointment
        .payment
        .outcome
        .as_ref()
        .map(|outcome| encode_json(outcome, "verification outcome"))
        .transpose()?;
    Ok(AppointmentUpdate {
        status: appointment.status.as_str().to_owned(),
        payment_status: appointment.payment.status.as_str().to_owned(),
        amount_cents: appointment.payment.amount_cents,
        outcome,
        amount_history: encode_json(&appointment.payment.amount_history, "amount history")?,
        receipt_number: appointment
            .receipt
            .as_ref()
            .map(|receipt| receipt.receipt_number.clone()),
        receipt_generated_at: appointment.receipt.as_ref().map(|receipt| receipt.generated_date),
        receipt_downloadable: appointment
            .receipt
            .as_ref()
            .is_some_and(|receipt| receipt.downloadable),
        updated_at: appointment.updated_at,
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::domain::fixtures::{
        agent_user, fixture_appointment, fixture_timestamp, pending_qr_payment,
    };
    use crate::domain::{Receipt, UserId, VerificationOutcome};

    use super::*;

    fn sample_row() -> AppointmentRow {
        let appointment = fixture_appointment(
            UserId::random(),
            agent_user(UserId::random()).id,
            pending_qr_payment(),
        );
        let insert = appointment_to_insert(&appointment).expect("encodes");
        AppointmentRow {
            id: insert.id,
            client_id: insert.client_id,
            agent_id: insert.agent_id,
            property_id: insert.property_id,
            date: insert.date,
            time_slot: insert.time_slot,
            client_name: insert.client_name,
            client_phone: insert.client_phone,
            client_email: insert.client_email,
            property_address: insert.property_address,
            message: insert.message,
            status: insert.status,
            payment_method: insert.payment_method,
            payment_status: insert.payment_status,
            amount_cents: insert.amount_cents,
            qr_customer_email: insert.qr_customer_email,
            qr_transaction_id: insert.qr_transaction_id,
            outcome: insert.outcome,
            amount_history: insert.amount_history,
            receipt_number: insert.receipt_number,
            receipt_generated_at: insert.receipt_generated_at,
            receipt_downloadable: insert.receipt_downloadable,
            created_at: insert.created_at,
            updated_at: insert.updated_at,
        }
    }

    #[rstest]
    fn rows_survive_the_domain_round_trip() {
        let appointment = fixture_appointment(
            UserId::random(),
            agent_user(UserId::random()).id,
            pending_qr_payment(),
        );
        let insert = appointment_to_insert(&appointment).expect("encodes");
        assert_eq!(insert.payment_method, "qr");
        assert_eq!(
            insert.qr_customer_email.as_deref(),
            Some("customer@example.com")
        );

        let mut row = sample_row();
        row.id = *appointment.id.as_uuid();
        let decoded = row_to_appointment(row).expect("decodes");
        assert_eq!(decoded.payment.method, appointment.payment.method);
        assert_eq!(decoded.time.as_str(), appointment.time.as_str());
        assert_eq!(decoded.client_info, appointment.client_info);
    }

    #[rstest]
    fn outcome_documents_round_trip() {
        let mut appointment = fixture_appointment(
            UserId::random(),
            agent_user(UserId::random()).id,
            pending_qr_payment(),
        );
        let verifier = UserId::random();
        appointment.payment.outcome = Some(VerificationOutcome::Verified {
            by: verifier,
            at: fixture_timestamp(),
            notes: "Transfer matched".to_owned(),
        });
        appointment.attach_receipt(Receipt::generate(fixture_timestamp()));

        let update = appointment_to_update(&appointment).expect("encodes");
        assert!(update.receipt_number.is_some());
        assert!(update.receipt_downloadable);

        let mut row = sample_row();
        row.outcome = update.outcome;
        row.receipt_number = update.receipt_number;
        row.receipt_generated_at = update.receipt_generated_at;
        row.receipt_downloadable = update.receipt_downloadable;
        let decoded = row_to_appointment(row).expect("decodes");
        assert!(matches!(
            decoded.payment.outcome,
            Some(VerificationOutcome::Verified { by, .. }) if by == verifier
        ));
        assert!(decoded.receipt.is_some());
    }

    #[rstest]
    #[case::status("status")]
    #[case::method("payment_method")]
    #[case::payment_status("payment_status")]
    fn unknown_enum_strings_are_corrupt(#[case] column: &str) {
        let mut row = sample_row();
        match column {
            "status" => row.status = "sideways".to_owned(),
            "payment_method" => row.payment_method = "card".to_owned(),
            _ => row.payment_status = "maybe".to_owned(),
        }
        assert!(matches!(
            row_to_appointment(row),
            Err(AppointmentRepositoryError::Corrupt { .. })
        ));
    }

    #[rstest]
    fn dangling_receipt_columns_are_corrupt() {
        let mut row = sample_row();
        row.receipt_number = Some("RCP-1-AAAA".to_owned());
        row.receipt_generated_at = None;
        assert!(matches!(
            row_to_appointment(row),
            Err(AppointmentRepositoryError::Corrupt { .. })
        ));
    }
}
