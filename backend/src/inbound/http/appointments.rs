//! Appointment API handlers.
//!
//! ```text
//! POST   /api/v1/appointments                Book a viewing
//! GET    /api/v1/appointments/agent          Assigned appointments (agent/admin)
//! GET    /api/v1/appointments/client         Own bookings (any user)
//! GET    /api/v1/appointments/all            Every appointment (admin)
//! GET    /api/v1/appointments/{id}           Details
//! PUT    /api/v1/appointments/{id}/status    Update lifecycle status
//! PUT    /api/v1/appointments/{id}/cancel    Cancel
//! DELETE /api/v1/appointments/{id}           Remove (admin)
//! GET    /api/v1/appointments/{id}/receipt   Receipt for a verified payment
//! ```
//!
//! Handlers translate between JSON DTOs and the driving ports; every business
//! rule, including field presence, lives in the domain services.

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::NaiveDate;
use pagination::{PageInfo, PageRequest};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ports::{BookingRequest, ClientInfoInput, ListFilter, PaymentInput, ReceiptView};
use crate::domain::{
    AppointmentDetails, AppointmentId, AppointmentStatus, Error, ListingId, PaymentStatus, UserId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Contact block of a booking request.
#[derive(Debug, Clone, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientInfoDto {
    /// Contact name.
    pub name: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Contact email.
    pub email: Option<String>,
}

/// Payment descriptor of a booking request.
#[derive(Debug, Clone, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentDto {
    /// `cash` or `qr`.
    pub method: Option<String>,
    /// Amount in minor units.
    pub amount_cents: Option<i64>,
    /// Customer email for QR receipts.
    pub customer_email: Option<String>,
    /// Transfer reference supplied by the customer.
    pub transaction_id: Option<String>,
}

/// Booking request body. Every field is optional at the transport layer; the
/// scheduling service owns presence validation so each missing field keeps
/// its documented message.
#[derive(Debug, Clone, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateAppointmentRequest {
    /// Listing to view.
    pub property_id: Option<String>,
    /// Agent to book.
    pub agent_id: Option<String>,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Time slot, `HH:MM` or `HH:MM AM/PM`.
    pub time: Option<String>,
    /// Optional free-text message.
    pub message: Option<String>,
    /// Optional property-address override.
    pub property_address: Option<String>,
    /// Contact snapshot.
    pub client_info: Option<ClientInfoDto>,
    /// Payment descriptor; configured defaults apply when absent.
    pub payment: Option<PaymentDto>,
}

impl CreateAppointmentRequest {
    fn into_booking(self) -> Result<BookingRequest, Error> {
        let property = self
            .property_id
            .map(|raw| {
                ListingId::parse(&raw).map_err(|_| Error::invalid_request("Property not found"))
            })
            .transpose()?;
        let agent = self
            .agent_id
            .map(|raw| {
                UserId::parse(&raw).map_err(|_| Error::invalid_request("Invalid agent selected"))
            })
            .transpose()?;
        Ok(BookingRequest {
            property,
            agent,
            date: self.date,
            time: self.time,
            message: self.message,
            property_address: self.property_address,
            client_info: self.client_info.map(|info| ClientInfoInput {
                name: info.name,
                phone: info.phone,
                email: info.email,
            }),
            payment: self.payment.map(|payment| PaymentInput {
                method: payment.method,
                amount_cents: payment.amount_cents,
                customer_email: payment.customer_email,
                transaction_id: payment.transaction_id,
            }),
        })
    }
}

/// Filter and pagination parameters accepted by the list endpoints.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase", default)]
pub struct ListQuery {
    /// One-based page number.
    pub page: Option<u32>,
    /// Page size, capped at the shared maximum.
    pub limit: Option<u32>,
    /// Lifecycle status filter.
    pub status: Option<String>,
    /// Payment status filter.
    pub payment_status: Option<String>,
    /// Calendar date filter, `YYYY-MM-DD`.
    pub date: Option<String>,
}

impl ListQuery {
    fn page_request(&self) -> Result<PageRequest, Error> {
        PageRequest::from_query(self.page, self.limit)
            .map_err(|error| Error::invalid_request(error.to_string()))
    }

    fn filter(&self) -> Result<ListFilter, Error> {
        let status = self
            .status
            .as_deref()
            .map(|raw| {
                AppointmentStatus::from_stored(raw)
                    .ok_or_else(|| Error::invalid_request("Invalid status filter"))
            })
            .transpose()?;
        let payment_status = self
            .payment_status
            .as_deref()
            .map(|raw| {
                PaymentStatus::from_stored(raw)
                    .ok_or_else(|| Error::invalid_request("Invalid payment status filter"))
            })
            .transpose()?;
        let date = self
            .date
            .as_deref()
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| Error::invalid_request("Invalid date format"))
            })
            .transpose()?;
        Ok(ListFilter {
            status,
            payment_status,
            date,
        })
    }
}

/// Status update request body.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    /// Target lifecycle status.
    pub status: String,
}

/// Envelope for a single appointment.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    /// Always `true`.
    pub success: bool,
    /// Confirmation message on mutations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// The appointment with directory references resolved.
    pub appointment: AppointmentDetails,
}

impl AppointmentResponse {
    fn new(appointment: AppointmentDetails) -> Self {
        Self {
            success: true,
            message: None,
            appointment,
        }
    }

    fn with_message(appointment: AppointmentDetails, message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.to_owned()),
            appointment,
        }
    }
}

/// Envelope for appointment listings.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListResponse {
    /// Always `true`.
    pub success: bool,
    /// Matching appointments.
    pub appointments: Vec<AppointmentDetails>,
    /// Pagination envelope, present on paginated endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageInfo>,
}

/// Envelope for message-only responses.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    /// Always `true`.
    pub success: bool,
    /// Confirmation message.
    pub message: String,
}

/// Envelope for the receipt endpoint.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    /// Always `true`.
    pub success: bool,
    /// Receipt and owning appointment summary.
    #[serde(flatten)]
    pub view: ReceiptView,
}

/// Book a property viewing.
#[utoipa::path(
    post,
    path = "/api/v1/appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment scheduled", body = AppointmentResponse),
        (status = 400, description = "Validation failure", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 409, description = "Slot already booked", body = Error)
    ),
    tags = ["appointments"],
    operation_id = "createAppointment"
)]
#[post("/appointments")]
pub async fn create(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateAppointmentRequest>,
) -> ApiResult<HttpResponse> {
    let requester = state.resolve_requester(&session).await?;
    let booking = payload.into_inner().into_booking()?;
    let details = state.scheduling.create(booking, requester).await?;
    Ok(HttpResponse::Created().json(AppointmentResponse::with_message(
        details,
        "Appointment scheduled successfully",
    )))
}

/// Appointments assigned to the requesting agent.
#[utoipa::path(
    get,
    path = "/api/v1/appointments/agent",
    params(ListQuery),
    responses(
        (status = 200, description = "Assigned appointments", body = AppointmentListResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Agent role required", body = Error)
    ),
    tags = ["appointments"],
    operation_id = "listAgentAppointments"
)]
#[get("/appointments/agent")]
pub async fn list_for_agent(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<ListQuery>,
) -> ApiResult<web::Json<AppointmentListResponse>> {
    let requester = state.resolve_requester(&session).await?;
    let page = state
        .appointments
        .list_for_agent(requester, query.filter()?, query.page_request()?)
        .await?;
    Ok(web::Json(AppointmentListResponse {
        success: true,
        appointments: page.items,
        pagination: Some(page.pagination),
    }))
}

/// Appointments booked by the requesting client.
#[utoipa::path(
    get,
    path = "/api/v1/appointments/client",
    responses(
        (status = 200, description = "Own bookings", body = AppointmentListResponse),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["appointments"],
    operation_id = "listClientAppointments"
)]
#[get("/appointments/client")]
pub async fn list_for_client(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<AppointmentListResponse>> {
    let requester = state.resolve_requester(&session).await?;
    let appointments = state.appointments.list_for_client(requester).await?;
    Ok(web::Json(AppointmentListResponse {
        success: true,
        appointments,
        pagination: None,
    }))
}

/// Every appointment in the store; admin only.
#[utoipa::path(
    get,
    path = "/api/v1/appointments/all",
    params(ListQuery),
    responses(
        (status = 200, description = "All appointments", body = AppointmentListResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Admin access required", body = Error)
    ),
    tags = ["appointments"],
    operation_id = "listAllAppointments"
)]
#[get("/appointments/all")]
pub async fn list_all(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<ListQuery>,
) -> ApiResult<web::Json<AppointmentListResponse>> {
    let requester = state.resolve_requester(&session).await?;
    let page = state
        .appointments
        .list_all(requester, query.filter()?, query.page_request()?)
        .await?;
    Ok(web::Json(AppointmentListResponse {
        success: true,
        appointments: page.items,
        pagination: Some(page.pagination),
    }))
}

/// Details of one appointment for an involved party.
#[utoipa::path(
    get,
    path = "/api/v1/appointments/{id}",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment details", body = AppointmentResponse),
        (status = 403, description = "Not an involved party", body = Error),
        (status = 404, description = "Unknown appointment", body = Error)
    ),
    tags = ["appointments"],
    operation_id = "getAppointment"
)]
#[get("/appointments/{id}")]
pub async fn get_appointment(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<AppointmentResponse>> {
    let requester = state.resolve_requester(&session).await?;
    let id = AppointmentId::from_uuid(path.into_inner());
    let details = state.appointments.get(id, requester).await?;
    Ok(web::Json(AppointmentResponse::new(details)))
}

/// Move an appointment to a new lifecycle status.
#[utoipa::path(
    put,
    path = "/api/v1/appointments/{id}/status",
    params(("id" = Uuid, Path, description = "Appointment id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = AppointmentResponse),
        (status = 400, description = "Unknown status", body = Error),
        (status = 403, description = "Not the assigned agent", body = Error),
        (status = 409, description = "Terminal status", body = Error)
    ),
    tags = ["appointments"],
    operation_id = "updateAppointmentStatus"
)]
#[put("/appointments/{id}/status")]
pub async fn update_status(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateStatusRequest>,
) -> ApiResult<web::Json<AppointmentResponse>> {
    let requester = state.resolve_requester(&session).await?;
    let id = AppointmentId::from_uuid(path.into_inner());
    let status = AppointmentStatus::from_stored(&payload.status)
        .ok_or_else(|| Error::invalid_request("Invalid status"))?;
    let details = state
        .appointments
        .update_status(id, status, requester)
        .await?;
    Ok(web::Json(AppointmentResponse::with_message(
        details,
        "Appointment status updated",
    )))
}

/// Cancel an appointment.
#[utoipa::path(
    put,
    path = "/api/v1/appointments/{id}/cancel",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment canceled", body = AppointmentResponse),
        (status = 403, description = "Not an involved party", body = Error),
        (status = 409, description = "Already canceled or completed", body = Error)
    ),
    tags = ["appointments"],
    operation_id = "cancelAppointment"
)]
#[put("/appointments/{id}/cancel")]
pub async fn cancel(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<AppointmentResponse>> {
    let requester = state.resolve_requester(&session).await?;
    let id = AppointmentId::from_uuid(path.into_inner());
    let details = state.appointments.cancel(id, requester).await?;
    Ok(web::Json(AppointmentResponse::with_message(
        details,
        "Appointment canceled successfully",
    )))
}

/// Remove an appointment record; admin only.
#[utoipa::path(
    delete,
    path = "/api/v1/appointments/{id}",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment deleted", body = MessageResponse),
        (status = 403, description = "Admin access required", body = Error),
        (status = 404, description = "Unknown appointment", body = Error)
    ),
    tags = ["appointments"],
    operation_id = "deleteAppointment"
)]
#[delete("/appointments/{id}")]
pub async fn delete_appointment(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<MessageResponse>> {
    let requester = state.resolve_requester(&session).await?;
    let id = AppointmentId::from_uuid(path.into_inner());
    state.appointments.delete(id, requester).await?;
    Ok(web::Json(MessageResponse {
        success: true,
        message: "Appointment deleted successfully".to_owned(),
    }))
}

/// Receipt for a verified payment.
#[utoipa::path(
    get,
    path = "/api/v1/appointments/{id}/receipt",
    params(("id" = Uuid, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Receipt", body = ReceiptResponse),
        (status = 403, description = "Not an involved party", body = Error),
        (status = 404, description = "Receipt is not available", body = Error)
    ),
    tags = ["appointments"],
    operation_id = "getAppointmentReceipt"
)]
#[get("/appointments/{id}/receipt")]
pub async fn receipt(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<ReceiptResponse>> {
    let requester = state.resolve_requester(&session).await?;
    let id = AppointmentId::from_uuid(path.into_inner());
    let view = state.payments.receipt(id, requester).await?;
    Ok(web::Json(ReceiptResponse {
        success: true,
        view,
    }))
}

#[cfg(test)]
#[path = "appointments_tests.rs"]
mod appointments_tests;
