//! Behaviour tests for payment verification, reporting, and receipts.

use std::sync::Arc;

use rstest::rstest;

use super::super::appointment::{
    Appointment, AppointmentDetails, AppointmentStatus, PaymentMethod, PaymentStatus, Receipt,
    VerificationOutcome,
};
use super::super::fixtures::{
    cash_payment, fixture_appointment, fixture_clock, fixture_timestamp, pending_qr_payment,
    requester,
};
use super::super::identity::{AppointmentId, Requester, UserId, UserRole};
use super::super::ports::{
    ListOrder, MailerError, MockAppointmentRepository, MockMailer, PaymentSample, Payments,
    VerificationDecision,
};
use super::PaymentsService;
use crate::domain::error::ErrorCode;

fn make_service(repository: MockAppointmentRepository, mailer: MockMailer) -> PaymentsService {
    PaymentsService::new(Arc::new(repository), Arc::new(mailer), fixture_clock())
}

fn details_for(appointment: Appointment) -> AppointmentDetails {
    AppointmentDetails {
        appointment,
        client_user: None,
        agent_user: None,
        listing: None,
    }
}

fn approve() -> VerificationDecision {
    VerificationDecision {
        approved: true,
        notes: Some("Transfer matched".to_owned()),
    }
}

fn reject(notes: Option<&str>) -> VerificationDecision {
    VerificationDecision {
        approved: false,
        notes: notes.map(str::to_owned),
    }
}

fn assigned_agent(appointment: &Appointment) -> Requester {
    Requester {
        id: appointment.agent,
        role: UserRole::Agent,
    }
}

#[tokio::test]
async fn approval_confirms_the_appointment_and_mints_a_receipt() {
    let appointment = fixture_appointment(UserId::random(), UserId::random(), pending_qr_payment());
    let id = appointment.id;
    let agent = assigned_agent(&appointment);

    let mut repository = MockAppointmentRepository::new();
    let stored = appointment.clone();
    repository
        .expect_find_by_id()
        .returning(move |_| Ok(Some(stored.clone())));
    repository
        .expect_save()
        .withf(|saved| {
            saved.payment.status == PaymentStatus::Verified
                && saved.status == AppointmentStatus::Confirmed
                && saved.receipt.is_some()
        })
        .returning(|_| Ok(()));
    repository.expect_find_details().returning(|_| Ok(None));

    let mut mailer = MockMailer::new();
    mailer
        .expect_send()
        .withf(|email| {
            email.to == "customer@example.com" && email.subject.starts_with("Payment Receipt")
        })
        .returning(|_| Ok(()));

    let service = make_service(repository, mailer);
    let details = service
        .verify(id, approve(), agent)
        .await
        .expect("approval succeeds");

    let updated = &details.appointment;
    assert_eq!(updated.payment.status, PaymentStatus::Verified);
    assert_eq!(updated.status, AppointmentStatus::Confirmed);
    let receipt = updated.receipt.as_ref().expect("receipt minted");
    assert!(receipt.receipt_number.starts_with("RCP-"));
    assert_eq!(receipt.generated_date, fixture_timestamp());
    match updated.payment.outcome.as_ref().expect("outcome recorded") {
        VerificationOutcome::Verified { by, notes, .. } => {
            assert_eq!(*by, agent.id);
            assert_eq!(notes, "Transfer matched");
        }
        VerificationOutcome::Rejected { .. } => panic!("expected a verified outcome"),
    }
}

#[tokio::test]
async fn rejection_cancels_with_the_default_reason() {
    let appointment = fixture_appointment(UserId::random(), UserId::random(), pending_qr_payment());
    let id = appointment.id;
    let agent = assigned_agent(&appointment);

    let mut repository = MockAppointmentRepository::new();
    let stored = appointment.clone();
    repository
        .expect_find_by_id()
        .returning(move |_| Ok(Some(stored.clone())));
    repository
        .expect_save()
        .withf(|saved| {
            saved.payment.status == PaymentStatus::Rejected
                && saved.status == AppointmentStatus::Canceled
                && saved.receipt.is_none()
        })
        .returning(|_| Ok(()));
    repository.expect_find_details().returning(|_| Ok(None));

    let mut mailer = MockMailer::new();
    mailer
        .expect_send()
        .withf(|email| email.subject == "Payment Verification Failed")
        .returning(|_| Ok(()));

    let service = make_service(repository, mailer);
    let details = service
        .verify(id, reject(None), agent)
        .await
        .expect("rejection succeeds");

    match details
        .appointment
        .payment
        .outcome
        .as_ref()
        .expect("outcome recorded")
    {
        VerificationOutcome::Rejected { reason, .. } => {
            assert_eq!(reason, "Payment verification failed");
        }
        VerificationOutcome::Verified { .. } => panic!("expected a rejected outcome"),
    }
}

#[tokio::test]
async fn email_failure_never_fails_the_verification() {
    let appointment = fixture_appointment(UserId::random(), UserId::random(), pending_qr_payment());
    let id = appointment.id;
    let agent = assigned_agent(&appointment);

    let mut repository = MockAppointmentRepository::new();
    let stored = appointment.clone();
    repository
        .expect_find_by_id()
        .returning(move |_| Ok(Some(stored.clone())));
    repository.expect_save().returning(|_| Ok(()));
    repository.expect_find_details().returning(|_| Ok(None));

    let mut mailer = MockMailer::new();
    mailer
        .expect_send()
        .returning(|_| Err(MailerError::delivery("relay down")));

    let service = make_service(repository, mailer);
    service
        .verify(id, approve(), agent)
        .await
        .expect("verification survives a dead relay");
}

#[tokio::test]
async fn cash_payments_are_not_verifiable() {
    let appointment = fixture_appointment(UserId::random(), UserId::random(), cash_payment());
    let id = appointment.id;
    let agent = assigned_agent(&appointment);

    let mut repository = MockAppointmentRepository::new();
    repository
        .expect_find_by_id()
        .returning(move |_| Ok(Some(appointment.clone())));
    let service = make_service(repository, MockMailer::new());

    let err = service
        .verify(id, approve(), agent)
        .await
        .expect_err("cash is auto-verified, never manually");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.message(), "This appointment does not use QR payment");
}

#[tokio::test]
async fn unrelated_agents_cannot_verify() {
    let appointment = fixture_appointment(UserId::random(), UserId::random(), pending_qr_payment());
    let id = appointment.id;

    let mut repository = MockAppointmentRepository::new();
    repository
        .expect_find_by_id()
        .returning(move |_| Ok(Some(appointment.clone())));
    let service = make_service(repository, MockMailer::new());

    let err = service
        .verify(id, approve(), requester(UserRole::Agent))
        .await
        .expect_err("unrelated agents are rejected");
    assert_eq!(err.code(), ErrorCode::Forbidden);
    assert_eq!(
        err.message(),
        "Only the assigned agent or admin can verify payments"
    );
}

#[rstest]
#[case::verified(PaymentStatus::Verified, "Payment already verified")]
#[case::rejected(PaymentStatus::Rejected, "Payment already rejected")]
#[tokio::test]
async fn settled_payments_stay_settled(#[case] status: PaymentStatus, #[case] message: &str) {
    let mut appointment =
        fixture_appointment(UserId::random(), UserId::random(), pending_qr_payment());
    appointment.payment.status = status;
    let id = appointment.id;

    let mut repository = MockAppointmentRepository::new();
    repository
        .expect_find_by_id()
        .returning(move |_| Ok(Some(appointment.clone())));
    let service = make_service(repository, MockMailer::new());

    let err = service
        .verify(id, approve(), requester(UserRole::Admin))
        .await
        .expect_err("settled payment is immutable");
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(err.message(), message);
}

#[tokio::test]
async fn payment_details_admit_participants_only() {
    let client = UserId::random();
    let appointment = fixture_appointment(client, UserId::random(), pending_qr_payment());
    let id = appointment.id;

    let mut repository = MockAppointmentRepository::new();
    repository
        .expect_find_by_id()
        .returning(move |_| Ok(Some(appointment.clone())));
    let service = make_service(repository, MockMailer::new());

    let owner = Requester {
        id: client,
        role: UserRole::Client,
    };
    let details = service.details(id, owner).await.expect("owner may read");
    assert_eq!(details.appointment.id, id);
    assert_eq!(details.payment.method, PaymentMethod::Qr);

    let err = service
        .details(id, requester(UserRole::Client))
        .await
        .expect_err("strangers are rejected");
    assert_eq!(err.message(), "Access denied");
}

#[tokio::test]
async fn pending_queue_is_agent_scoped() {
    let agent = requester(UserRole::Agent);
    let queued = fixture_appointment(UserId::random(), agent.id, pending_qr_payment());

    let mut repository = MockAppointmentRepository::new();
    repository
        .expect_list_all()
        .withf(move |filter, order| {
            filter.agent == Some(agent.id)
                && filter.payment_method == Some(PaymentMethod::Qr)
                && filter.payment_status == Some(PaymentStatus::Pending)
                && *order == ListOrder::CreatedDescending
        })
        .returning(move |_, _| Ok(vec![details_for(queued.clone())]));
    let service = make_service(repository, MockMailer::new());

    let pending = service.pending(agent).await.expect("agent queue loads");
    assert_eq!(pending.count, 1);
    assert_eq!(pending.pending_payments.len(), 1);
}

#[tokio::test]
async fn pending_queue_is_unscoped_for_admins_and_closed_to_clients() {
    let mut repository = MockAppointmentRepository::new();
    repository
        .expect_list_all()
        .withf(|filter, _| filter.agent.is_none())
        .returning(|_, _| Ok(Vec::new()));
    let service = make_service(repository, MockMailer::new());
    let pending = service
        .pending(requester(UserRole::Admin))
        .await
        .expect("admin queue loads");
    assert_eq!(pending.count, 0);

    let service = make_service(MockAppointmentRepository::new(), MockMailer::new());
    let err = service
        .pending(requester(UserRole::Client))
        .await
        .expect_err("clients are rejected");
    assert_eq!(err.message(), "Access denied. Agent privileges required.");
}

#[tokio::test]
async fn stats_aggregate_per_method_and_overall() {
    let samples = vec![
        PaymentSample {
            method: PaymentMethod::Cash,
            status: PaymentStatus::Verified,
            amount_cents: 10_000,
        },
        PaymentSample {
            method: PaymentMethod::Cash,
            status: PaymentStatus::Verified,
            amount_cents: 20_000,
        },
        PaymentSample {
            method: PaymentMethod::Qr,
            status: PaymentStatus::Pending,
            amount_cents: 30_000,
        },
        PaymentSample {
            method: PaymentMethod::Qr,
            status: PaymentStatus::Rejected,
            amount_cents: 5_000,
        },
    ];
    let mut repository = MockAppointmentRepository::new();
    repository
        .expect_payment_samples()
        .returning(move || Ok(samples.clone()));
    let service = make_service(repository, MockMailer::new());

    let report = service
        .stats(requester(UserRole::Admin))
        .await
        .expect("stats load");

    let cash = report
        .payment_method_stats
        .iter()
        .find(|stats| stats.method == PaymentMethod::Cash)
        .expect("cash stats present");
    assert_eq!(cash.count, 2);
    assert_eq!(cash.total_amount_cents, 30_000);
    assert_eq!(cash.verified, 2);

    let qr = report
        .payment_method_stats
        .iter()
        .find(|stats| stats.method == PaymentMethod::Qr)
        .expect("qr stats present");
    assert_eq!(qr.count, 2);
    assert_eq!(qr.pending, 1);
    assert_eq!(qr.rejected, 1);

    assert_eq!(report.overall_stats.total_appointments, 4);
    assert_eq!(report.overall_stats.total_revenue_cents, 65_000);
    assert_eq!(report.overall_stats.average_amount_cents, 16_250);
}

#[tokio::test]
async fn stats_on_an_empty_store_are_all_zero() {
    let mut repository = MockAppointmentRepository::new();
    repository.expect_payment_samples().returning(|| Ok(Vec::new()));
    let service = make_service(repository, MockMailer::new());

    let report = service
        .stats(requester(UserRole::Admin))
        .await
        .expect("stats load");
    assert!(report.payment_method_stats.is_empty());
    assert_eq!(report.overall_stats.total_appointments, 0);
    assert_eq!(report.overall_stats.average_amount_cents, 0);

    let err = make_service(MockAppointmentRepository::new(), MockMailer::new())
        .stats(requester(UserRole::Agent))
        .await
        .expect_err("stats are admin only");
    assert_eq!(err.message(), "Admin access required");
}

#[tokio::test]
async fn amount_updates_append_to_the_history() {
    let appointment = fixture_appointment(UserId::random(), UserId::random(), pending_qr_payment());
    let id = appointment.id;

    let mut repository = MockAppointmentRepository::new();
    repository
        .expect_find_by_id()
        .returning(move |_| Ok(Some(appointment.clone())));
    repository.expect_save().returning(|_| Ok(()));
    let service = make_service(repository, MockMailer::new());

    let admin = requester(UserRole::Admin);
    let updated = service
        .update_amount(id, 30_000, None, admin)
        .await
        .expect("admin updates the amount");

    assert_eq!(updated.payment.amount_cents, 30_000);
    let change = updated
        .payment
        .amount_history
        .last()
        .expect("history entry appended");
    assert_eq!(change.old_amount_cents, 25_000);
    assert_eq!(change.new_amount_cents, 30_000);
    assert_eq!(change.changed_by, admin.id);
    assert_eq!(change.reason, "Amount updated by admin");
}

#[tokio::test]
async fn verified_amounts_are_frozen() {
    let appointment = fixture_appointment(UserId::random(), UserId::random(), cash_payment());
    let id = appointment.id;
    let mut repository = MockAppointmentRepository::new();
    repository
        .expect_find_by_id()
        .returning(move |_| Ok(Some(appointment.clone())));
    let service = make_service(repository, MockMailer::new());

    let err = service
        .update_amount(id, 30_000, None, requester(UserRole::Admin))
        .await
        .expect_err("verified payments are immutable");
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(err.message(), "Cannot modify verified payment");
}

#[rstest]
#[case::zero(0)]
#[case::negative(-500)]
#[tokio::test]
async fn non_positive_amounts_are_rejected(#[case] amount_cents: i64) {
    let service = make_service(MockAppointmentRepository::new(), MockMailer::new());
    let err = service
        .update_amount(
            AppointmentId::random(),
            amount_cents,
            None,
            requester(UserRole::Admin),
        )
        .await
        .expect_err("non-positive amount is rejected");
    assert_eq!(err.message(), "Valid amount is required");
}

#[tokio::test]
async fn receipts_require_a_verified_payment() {
    let mut verified = fixture_appointment(UserId::random(), UserId::random(), cash_payment());
    assert!(verified.attach_receipt(Receipt::generate(fixture_timestamp())));
    let id = verified.id;
    let client = verified.client;

    let mut repository = MockAppointmentRepository::new();
    repository
        .expect_find_by_id()
        .returning(move |_| Ok(Some(verified.clone())));
    let service = make_service(repository, MockMailer::new());

    let owner = Requester {
        id: client,
        role: UserRole::Client,
    };
    let view = service.receipt(id, owner).await.expect("receipt loads");
    assert!(view.receipt.receipt_number.starts_with("RCP-"));
    assert_eq!(view.appointment.id, id);

    let err = service
        .receipt(id, requester(UserRole::Client))
        .await
        .expect_err("strangers are rejected");
    assert_eq!(err.message(), "Access denied");
}

#[tokio::test]
async fn unverified_payments_have_no_receipt() {
    let appointment = fixture_appointment(UserId::random(), UserId::random(), pending_qr_payment());
    let id = appointment.id;
    let mut repository = MockAppointmentRepository::new();
    repository
        .expect_find_by_id()
        .returning(move |_| Ok(Some(appointment.clone())));
    let service = make_service(repository, MockMailer::new());

    let err = service
        .receipt(id, requester(UserRole::Admin))
        .await
        .expect_err("pending payment has no receipt");
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(err.message(), "Receipt is not available");
}
