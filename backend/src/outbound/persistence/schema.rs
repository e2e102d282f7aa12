//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly; Diesel uses
//! them for compile-time query validation. Regenerate with
//! `diesel print-schema` after a migration changes the schema.
//!
//! The appointment's payment sub-record is flattened into columns; the
//! verification outcome and amount-change history are `jsonb` documents. The
//! partial unique index guarding (agent, date, time) slots lives in the
//! migrations and has no table-level representation here.

diesel::table! {
    /// Directory of user accounts.
    users (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Display/login name.
        username -> Varchar,
        /// Contact email.
        email -> Varchar,
        /// Role string: `client`, `agent`, or `admin`.
        role -> Varchar,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Directory of property listings.
    listings (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Listing display name.
        name -> Varchar,
        /// Street address of the property.
        address -> Varchar,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Appointment records, payment sub-record included.
    appointments (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Requesting user.
        client_id -> Uuid,
        /// Assigned agent.
        agent_id -> Uuid,
        /// Listing being viewed.
        property_id -> Uuid,
        /// Calendar date of the slot.
        date -> Date,
        /// Literal time slot string.
        time_slot -> Varchar,
        /// Contact name snapshot.
        client_name -> Varchar,
        /// Contact phone snapshot.
        client_phone -> Varchar,
        /// Contact email snapshot.
        client_email -> Varchar,
        /// Address snapshot taken at booking.
        property_address -> Varchar,
        /// Free-text message from the client.
        message -> Text,
        /// Lifecycle status string.
        status -> Varchar,
        /// Payment method string: `cash` or `qr`.
        payment_method -> Varchar,
        /// Payment status string.
        payment_status -> Varchar,
        /// Payment amount in minor units.
        amount_cents -> Int8,
        /// QR customer email; null for cash payments.
        qr_customer_email -> Nullable<Varchar>,
        /// QR transfer reference; null when not supplied.
        qr_transaction_id -> Nullable<Varchar>,
        /// Manual verification outcome document.
        outcome -> Nullable<Jsonb>,
        /// Append-only amount-change history document.
        amount_history -> Jsonb,
        /// Receipt number; null until payment verification.
        receipt_number -> Nullable<Varchar>,
        /// Receipt generation timestamp.
        receipt_generated_at -> Nullable<Timestamptz>,
        /// Whether the receipt may be retrieved.
        receipt_downloadable -> Bool,
        /// Record creation timestamp.
        created_at -> Timestamptz,
        /// Last modification timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(appointments -> listings (property_id));

diesel::allow_tables_to_appear_in_same_query!(appointments, listings, users);
