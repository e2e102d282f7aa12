//! Payment API handlers.
//!
//! ```text
//! PUT /api/v1/payments/verify/{id}   Approve or reject a pending QR payment
//! GET /api/v1/payments/details/{id}  Payment block for an appointment
//! GET /api/v1/payments/pending       QR payments awaiting verification
//! GET /api/v1/payments/stats         Store-wide aggregates (admin)
//! PUT /api/v1/payments/amount/{id}   Overwrite an unverified amount (admin)
//! ```

use actix_web::{get, put, web};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ports::{
    PaymentDetails, PaymentStatsReport, PendingPayments, VerificationDecision,
};
use crate::domain::{Appointment, AppointmentDetails, AppointmentId, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Verification decision body.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    /// `true` approves the payment, `false` rejects it.
    pub verified: bool,
    /// Approval notes or rejection reason.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Amount update body.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAmountRequest {
    /// New amount in minor units.
    #[serde(default)]
    pub amount_cents: Option<i64>,
    /// Recorded justification; a default applies when omitted.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Envelope for the verification endpoint.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    /// Always `true`.
    pub success: bool,
    /// Outcome description.
    pub message: String,
    /// Updated appointment with directory references resolved.
    pub appointment: AppointmentDetails,
}

/// Envelope for the payment details endpoint.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetailsResponse {
    /// Always `true`.
    pub success: bool,
    /// Payment block and owning appointment summary.
    #[serde(flatten)]
    pub details: PaymentDetails,
}

/// Envelope for the pending queue endpoint.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingPaymentsResponse {
    /// Always `true`.
    pub success: bool,
    /// Pending QR payments and their count.
    #[serde(flatten)]
    pub pending: PendingPayments,
}

/// Envelope for the stats endpoint.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatsResponse {
    /// Always `true`.
    pub success: bool,
    /// Per-method and overall aggregates.
    #[serde(flatten)]
    pub report: PaymentStatsReport,
}

/// Envelope for the amount update endpoint.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAmountResponse {
    /// Always `true`.
    pub success: bool,
    /// Confirmation message.
    pub message: String,
    /// Updated appointment record.
    pub appointment: Appointment,
}

/// Approve or reject a pending QR payment.
#[utoipa::path(
    put,
    path = "/api/v1/payments/verify/{id}",
    params(("id" = Uuid, Path, description = "Appointment id")),
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Decision recorded", body = VerifyPaymentResponse),
        (status = 400, description = "Not a QR payment", body = Error),
        (status = 403, description = "Not the assigned agent", body = Error),
        (status = 409, description = "Payment already settled", body = Error)
    ),
    tags = ["payments"],
    operation_id = "verifyPayment"
)]
#[put("/payments/verify/{id}")]
pub async fn verify(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
    payload: web::Json<VerifyPaymentRequest>,
) -> ApiResult<web::Json<VerifyPaymentResponse>> {
    let requester = state.resolve_requester(&session).await?;
    let id = AppointmentId::from_uuid(path.into_inner());
    let body = payload.into_inner();
    let decision = VerificationDecision {
        approved: body.verified,
        notes: body.notes,
    };
    let message = if decision.approved {
        "Payment verified successfully"
    } else {
        "Payment rejected"
    };
    let appointment = state.payments.verify(id, decision, requester).await?;
    Ok(web::Json(VerifyPaymentResponse {
        success: true,
        message: message.to_owned(),
        appointment,
    }))
}

/// Payment block for one appointment.
#[utoipa::path(
    get,
    path = "/api/v1/payments/details/{id}",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Payment details", body = PaymentDetailsResponse),
        (status = 403, description = "Not an involved party", body = Error),
        (status = 404, description = "Unknown appointment", body = Error)
    ),
    tags = ["payments"],
    operation_id = "getPaymentDetails"
)]
#[get("/payments/details/{id}")]
pub async fn details(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<PaymentDetailsResponse>> {
    let requester = state.resolve_requester(&session).await?;
    let id = AppointmentId::from_uuid(path.into_inner());
    let details = state.payments.details(id, requester).await?;
    Ok(web::Json(PaymentDetailsResponse {
        success: true,
        details,
    }))
}

/// QR payments awaiting verification.
#[utoipa::path(
    get,
    path = "/api/v1/payments/pending",
    responses(
        (status = 200, description = "Pending queue", body = PendingPaymentsResponse),
        (status = 403, description = "Agent role required", body = Error)
    ),
    tags = ["payments"],
    operation_id = "listPendingPayments"
)]
#[get("/payments/pending")]
pub async fn pending(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<PendingPaymentsResponse>> {
    let requester = state.resolve_requester(&session).await?;
    let pending = state.payments.pending(requester).await?;
    Ok(web::Json(PendingPaymentsResponse {
        success: true,
        pending,
    }))
}

/// Store-wide payment aggregates; admin only.
#[utoipa::path(
    get,
    path = "/api/v1/payments/stats",
    responses(
        (status = 200, description = "Aggregates", body = PaymentStatsResponse),
        (status = 403, description = "Admin access required", body = Error)
    ),
    tags = ["payments"],
    operation_id = "getPaymentStats"
)]
#[get("/payments/stats")]
pub async fn stats(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<PaymentStatsResponse>> {
    let requester = state.resolve_requester(&session).await?;
    let report = state.payments.stats(requester).await?;
    Ok(web::Json(PaymentStatsResponse {
        success: true,
        report,
    }))
}

/// Overwrite the amount of an unverified payment; admin only.
#[utoipa::path(
    put,
    path = "/api/v1/payments/amount/{id}",
    params(("id" = Uuid, Path, description = "Appointment id")),
    request_body = UpdateAmountRequest,
    responses(
        (status = 200, description = "Amount updated", body = UpdateAmountResponse),
        (status = 400, description = "Invalid amount", body = Error),
        (status = 403, description = "Admin access required", body = Error),
        (status = 409, description = "Payment already verified", body = Error)
    ),
    tags = ["payments"],
    operation_id = "updatePaymentAmount"
)]
#[put("/payments/amount/{id}")]
pub async fn update_amount(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateAmountRequest>,
) -> ApiResult<web::Json<UpdateAmountResponse>> {
    let requester = state.resolve_requester(&session).await?;
    let id = AppointmentId::from_uuid(path.into_inner());
    let body = payload.into_inner();
    let amount_cents = body
        .amount_cents
        .ok_or_else(|| Error::invalid_request("Valid amount is required"))?;
    let appointment = state
        .payments
        .update_amount(id, amount_cents, body.reason, requester)
        .await?;
    Ok(web::Json(UpdateAmountResponse {
        success: true,
        message: "Payment amount updated".to_owned(),
        appointment,
    }))
}

#[cfg(test)]
#[path = "payments_tests.rs"]
mod payments_tests;
