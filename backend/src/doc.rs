//! OpenAPI documentation configuration.
//!
//! Defines [`ApiDoc`], the generated specification covering the appointment
//! and payment endpoints plus the health probes. Swagger UI serves it in
//! debug builds only.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::ports::{
    AppointmentSummary, MethodStats, OverallStats, PaymentDetails, PaymentStatsReport,
    PendingPayments, ReceiptView,
};
use crate::domain::{
    AmountChange, Appointment, AppointmentDetails, AppointmentStatus, ClientInfo, Error,
    ErrorCode, ListingRecord, Payment, PaymentMethod, PaymentStatus, QrDetails, Receipt,
    TimeSlot, UserSummary, VerificationOutcome,
};
use crate::inbound::http::appointments::{
    AppointmentListResponse, AppointmentResponse, ClientInfoDto, CreateAppointmentRequest,
    MessageResponse, PaymentDto, ReceiptResponse, UpdateStatusRequest,
};
use crate::inbound::http::payments::{
    PaymentDetailsResponse, PaymentStatsResponse, PendingPaymentsResponse, UpdateAmountRequest,
    UpdateAmountResponse, VerifyPaymentRequest, VerifyPaymentResponse,
};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by the authentication service.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Doorstep backend API",
        description = "Appointment scheduling and payment verification for the \
                       property marketplace."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::appointments::create,
        crate::inbound::http::appointments::list_for_agent,
        crate::inbound::http::appointments::list_for_client,
        crate::inbound::http::appointments::list_all,
        crate::inbound::http::appointments::get_appointment,
        crate::inbound::http::appointments::update_status,
        crate::inbound::http::appointments::cancel,
        crate::inbound::http::appointments::delete_appointment,
        crate::inbound::http::appointments::receipt,
        crate::inbound::http::payments::verify,
        crate::inbound::http::payments::details,
        crate::inbound::http::payments::pending,
        crate::inbound::http::payments::stats,
        crate::inbound::http::payments::update_amount,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Appointment,
        AppointmentDetails,
        AppointmentStatus,
        AppointmentSummary,
        AmountChange,
        ClientInfo,
        ClientInfoDto,
        CreateAppointmentRequest,
        Error,
        ErrorCode,
        ListingRecord,
        MessageResponse,
        MethodStats,
        OverallStats,
        Payment,
        PaymentDetails,
        PaymentDetailsResponse,
        PaymentDto,
        PaymentMethod,
        PaymentStatsReport,
        PaymentStatsResponse,
        PaymentStatus,
        PendingPayments,
        PendingPaymentsResponse,
        QrDetails,
        Receipt,
        ReceiptResponse,
        ReceiptView,
        TimeSlot,
        UpdateAmountRequest,
        UpdateAmountResponse,
        UpdateStatusRequest,
        UserSummary,
        VerificationOutcome,
        VerifyPaymentRequest,
        VerifyPaymentResponse,
        AppointmentResponse,
        AppointmentListResponse,
    )),
    tags(
        (name = "appointments", description = "Booking and lifecycle operations"),
        (name = "payments", description = "Verification, reporting, and receipts"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
