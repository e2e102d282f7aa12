//! Payment verification, reporting, and receipt retrieval.
//!
//! QR payments sit in `pending` until the assigned agent or an admin decides;
//! approval confirms the appointment and mints its receipt, rejection cancels
//! it. Both outcomes notify the customer by email on a best-effort basis:
//! delivery failures are logged and never fail the verification itself.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, warn};

use super::appointment::{
    AmountChange, Appointment, AppointmentDetails, AppointmentStatus, PaymentMethod,
    PaymentStatus, Receipt, VerificationOutcome,
};
use super::authorization::{
    ensure_admin, ensure_agent_or_admin, ensure_assigned_agent_or_admin, ensure_participant,
    is_admin,
};
use super::error::Error;
use super::identity::{AppointmentId, Requester};
use super::ports::{
    AppointmentFilter, AppointmentRepository, AppointmentRepositoryError, ListOrder, Mailer,
    MethodStats, OutboundEmail, OverallStats, PaymentDetails, PaymentStatsReport, Payments,
    PendingPayments, ReceiptView, VerificationDecision,
};

const DEFAULT_REJECTION_REASON: &str = "Payment verification failed";
const DEFAULT_AMOUNT_REASON: &str = "Amount updated by admin";

/// Payment workflow service implementing the [`Payments`] driving port.
#[derive(Clone)]
pub struct PaymentsService {
    repository: Arc<dyn AppointmentRepository>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
}

impl PaymentsService {
    /// Create a new service over the given ports.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AppointmentRepository>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            mailer,
            clock,
        }
    }

    async fn load(&self, id: AppointmentId) -> Result<Appointment, Error> {
        self.repository
            .find_by_id(id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("Appointment not found"))
    }

    async fn notify(&self, email: Option<OutboundEmail>) {
        let Some(email) = email else {
            return;
        };
        if let Err(error) = self.mailer.send(&email).await {
            warn!(recipient = %email.to, %error, "payment notification email failed");
        } else {
            debug!(recipient = %email.to, subject = %email.subject, "payment notification sent");
        }
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

/// Render an amount in minor units as a decimal string, e.g. `100.00`.
fn format_amount(amount_cents: i64) -> String {
    format!("{}.{:02}", amount_cents / 100, (amount_cents % 100).abs())
}

fn receipt_email(appointment: &Appointment) -> Option<OutboundEmail> {
    let to = appointment.payment.customer_email()?.to_owned();
    let receipt = appointment.receipt.as_ref()?;
    let html_body = format!(
        concat!(
            "<h2>Payment Receipt</h2>",
            "<p>Your payment has been verified and your appointment is confirmed.</p>",
            "<ul>",
            "<li>Receipt number: {number}</li>",
            "<li>Property: {address}</li>",
            "<li>Date: {date}</li>",
            "<li>Time: {time}</li>",
            "<li>Amount paid: {amount}</li>",
            "</ul>"
        ),
        number = receipt.receipt_number,
        address = appointment.property_address,
        date = appointment.date,
        time = appointment.time,
        amount = format_amount(appointment.payment.amount_cents),
    );
    Some(OutboundEmail {
        to,
        subject: format!("Payment Receipt - {}", receipt.receipt_number),
        html_body,
    })
}

fn rejection_email(appointment: &Appointment, reason: &str) -> Option<OutboundEmail> {
    let to = appointment.payment.customer_email()?.to_owned();
    let html_body = format!(
        concat!(
            "<h2>Payment Verification Failed</h2>",
            "<p>We could not verify your payment and your appointment has been canceled.</p>",
            "<p>Reason: {reason}</p>",
            "<ul>",
            "<li>Property: {address}</li>",
            "<li>Date: {date}</li>",
            "<li>Time: {time}</li>",
            "</ul>",
            "<p>Please contact us to rebook or resolve the payment.</p>"
        ),
        reason = reason,
        address = appointment.property_address,
        date = appointment.date,
        time = appointment.time,
    );
    Some(OutboundEmail {
        to,
        subject: "Payment Verification Failed".to_owned(),
        html_body,
    })
}

#[async_trait]
impl Payments for PaymentsService {
    async fn verify(
        &self,
        id: AppointmentId,
        decision: VerificationDecision,
        requester: Requester,
    ) -> Result<AppointmentDetails, Error> {
        let mut appointment = self.load(id).await?;

        if appointment.payment.method != PaymentMethod::Qr {
            return Err(Error::invalid_request(
                "This appointment does not use QR payment",
            ));
        }
        ensure_assigned_agent_or_admin(
            &appointment,
            requester,
            "Only the assigned agent or admin can verify payments",
        )?;
        match appointment.payment.status {
            PaymentStatus::Pending => {}
            PaymentStatus::Verified => {
                return Err(Error::conflict("Payment already verified"));
            }
            PaymentStatus::Rejected => {
                return Err(Error::conflict("Payment already rejected"));
            }
        }

        let now = self.clock.utc();
        let notification = if decision.approved {
            appointment.payment.status = PaymentStatus::Verified;
            appointment.payment.outcome = Some(VerificationOutcome::Verified {
                by: requester.id,
                at: now,
                notes: decision.notes.unwrap_or_default(),
            });
            appointment.status = AppointmentStatus::Confirmed;
            let issued = appointment.attach_receipt(Receipt::generate(now));
            debug!(appointment = %appointment.id, issued, "qr payment verified");
            receipt_email(&appointment)
        } else {
            let reason = decision
                .notes
                .filter(|notes| !notes.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_owned());
            appointment.payment.status = PaymentStatus::Rejected;
            appointment.payment.outcome = Some(VerificationOutcome::Rejected {
                by: requester.id,
                at: now,
                reason: reason.clone(),
            });
            appointment.status = AppointmentStatus::Canceled;
            debug!(appointment = %appointment.id, %reason, "qr payment rejected");
            rejection_email(&appointment, &reason)
        };
        appointment.updated_at = now;

        self.repository
            .save(&appointment)
            .await
            .map_err(map_repository_error)?;
        // Email only after the decision is durably recorded.
        self.notify(notification).await;

        match self
            .repository
            .find_details(id)
            .await
            .map_err(map_repository_error)?
        {
            Some(details) => Ok(details),
            None => Ok(AppointmentDetails {
                appointment,
                client_user: None,
                agent_user: None,
                listing: None,
            }),
        }
    }

    async fn details(
        &self,
        id: AppointmentId,
        requester: Requester,
    ) -> Result<PaymentDetails, Error> {
        let appointment = self.load(id).await?;
        ensure_participant(&appointment, requester, "Access denied")?;
        Ok(PaymentDetails {
            payment: appointment.payment.clone(),
            appointment: (&appointment).into(),
        })
    }

    async fn pending(&self, requester: Requester) -> Result<PendingPayments, Error> {
        ensure_agent_or_admin(requester)?;
        let filter = AppointmentFilter {
            // Admins see every pending payment, agents only their own queue.
            agent: (!is_admin(requester)).then_some(requester.id),
            payment_method: Some(PaymentMethod::Qr),
            payment_status: Some(PaymentStatus::Pending),
            ..AppointmentFilter::default()
        };
        let pending_payments = self
            .repository
            .list_all(&filter, ListOrder::CreatedDescending)
            .await
            .map_err(map_repository_error)?;
        let count = pending_payments.len() as u64;
        Ok(PendingPayments {
            pending_payments,
            count,
        })
    }

    async fn stats(&self, requester: Requester) -> Result<PaymentStatsReport, Error> {
        ensure_admin(requester)?;
        let samples = self
            .repository
            .payment_samples()
            .await
            .map_err(map_repository_error)?;

        let mut payment_method_stats = Vec::new();
        for method in [PaymentMethod::Cash, PaymentMethod::Qr] {
            let mut stats = MethodStats {
                method,
                count: 0,
                total_amount_cents: 0,
                verified: 0,
                pending: 0,
                rejected: 0,
            };
            for sample in samples.iter().filter(|sample| sample.method == method) {
                stats.count += 1;
                stats.total_amount_cents += sample.amount_cents;
                match sample.status {
                    PaymentStatus::Verified => stats.verified += 1,
                    PaymentStatus::Pending => stats.pending += 1,
                    PaymentStatus::Rejected => stats.rejected += 1,
                }
            }
            if stats.count > 0 {
                payment_method_stats.push(stats);
            }
        }

        let total_appointments = samples.len() as u64;
        let total_revenue_cents: i64 = samples.iter().map(|sample| sample.amount_cents).sum();
        let average_amount_cents = if total_appointments == 0 {
            0
        } else {
            total_revenue_cents / i64::try_from(total_appointments).unwrap_or(i64::MAX)
        };

        Ok(PaymentStatsReport {
            payment_method_stats,
            overall_stats: OverallStats {
                total_appointments,
                total_revenue_cents,
                average_amount_cents,
            },
        })
    }

    async fn update_amount(
        &self,
        id: AppointmentId,
        amount_cents: i64,
        reason: Option<String>,
        requester: Requester,
    ) -> Result<Appointment, Error> {
        ensure_admin(requester)?;
        if amount_cents <= 0 {
            return Err(Error::invalid_request("Valid amount is required"));
        }

        let mut appointment = self.load(id).await?;
        if appointment.payment.status == PaymentStatus::Verified {
            return Err(Error::conflict("Cannot modify verified payment"));
        }

        let now = self.clock.utc();
        appointment.payment.amount_history.push(AmountChange {
            old_amount_cents: appointment.payment.amount_cents,
            new_amount_cents: amount_cents,
            changed_by: requester.id,
            changed_at: now,
            reason: reason
                .filter(|reason| !reason.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AMOUNT_REASON.to_owned()),
        });
        appointment.payment.amount_cents = amount_cents;
        appointment.updated_at = now;

        self.repository
            .save(&appointment)
            .await
            .map_err(map_repository_error)?;
        Ok(appointment)
    }

    async fn receipt(
        &self,
        id: AppointmentId,
        requester: Requester,
    ) -> Result<ReceiptView, Error> {
        let appointment = self.load(id).await?;
        ensure_participant(&appointment, requester, "Access denied")?;

        if appointment.payment.status != PaymentStatus::Verified {
            return Err(Error::not_found("Receipt is not available"));
        }
        let receipt = appointment
            .receipt
            .clone()
            .filter(|receipt| receipt.downloadable)
            .ok_or_else(|| Error::not_found("Receipt is not available"))?;

        Ok(ReceiptView {
            receipt,
            appointment: (&appointment).into(),
        })
    }
}

#[cfg(test)]
#[path = "payments_tests.rs"]
mod payments_tests;
