//! Authorization guard: role and ownership predicates.
//!
//! Every mutating or sensitive-read operation runs one of the composed
//! checks before touching state, so a rejected request leaves no partial
//! writes. Predicates take the already-resolved [`Requester`] rather than
//! re-reading role flags from the directory.

use super::appointment::Appointment;
use super::error::Error;
use super::identity::{Requester, UserRole};

/// Whether the requester has admin privileges.
#[must_use]
pub const fn is_admin(requester: Requester) -> bool {
    matches!(requester.role, UserRole::Admin)
}

/// Whether the requester carries the agent role.
#[must_use]
pub const fn is_agent(requester: Requester) -> bool {
    matches!(requester.role, UserRole::Agent)
}

/// Whether the requester is the client who booked this appointment.
#[must_use]
pub fn is_owner_client(appointment: &Appointment, requester: Requester) -> bool {
    appointment.client == requester.id
}

/// Whether the requester is the agent assigned to this appointment.
///
/// Requires both the matching id and the agent role; a demoted user keeps
/// no access to appointments they were assigned while still an agent.
#[must_use]
pub fn is_assigned_agent(appointment: &Appointment, requester: Requester) -> bool {
    appointment.agent == requester.id && is_agent(requester)
}

/// Require admin privileges.
///
/// # Errors
///
/// Returns a forbidden error for non-admins.
pub fn ensure_admin(requester: Requester) -> Result<(), Error> {
    if is_admin(requester) {
        Ok(())
    } else {
        Err(Error::forbidden("Admin access required"))
    }
}

/// Require the agent role or admin privileges (agent-scoped listings).
///
/// # Errors
///
/// Returns a forbidden error for plain clients.
pub fn ensure_agent_or_admin(requester: Requester) -> Result<(), Error> {
    if is_agent(requester) || is_admin(requester) {
        Ok(())
    } else {
        Err(Error::forbidden("Access denied. Agent privileges required."))
    }
}

/// Require the assigned agent or an admin (status updates, verification).
///
/// # Errors
///
/// Returns a forbidden error with the supplied message otherwise.
pub fn ensure_assigned_agent_or_admin(
    appointment: &Appointment,
    requester: Requester,
    message: &str,
) -> Result<(), Error> {
    if is_assigned_agent(appointment, requester) || is_admin(requester) {
        Ok(())
    } else {
        Err(Error::forbidden(message))
    }
}

/// Require any involved party: owning client, assigned agent, or admin.
///
/// # Errors
///
/// Returns a forbidden error with the supplied message otherwise.
pub fn ensure_participant(
    appointment: &Appointment,
    requester: Requester,
    message: &str,
) -> Result<(), Error> {
    if is_owner_client(appointment, requester)
        || is_assigned_agent(appointment, requester)
        || is_admin(requester)
    {
        Ok(())
    } else {
        Err(Error::forbidden(message))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::super::appointment::{
        AppointmentStatus, Payment, PaymentMethod, PaymentStatus,
    };
    use super::super::contact::{ClientInfo, TimeSlot};
    use super::super::identity::{AppointmentId, ListingId, UserId};
    use super::*;

    fn fixture_appointment(client: UserId, agent: UserId) -> Appointment {
        Appointment {
            id: AppointmentId::random(),
            client,
            agent,
            property: ListingId::random(),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date"),
            time: TimeSlot::new("10:00 AM").expect("valid slot"),
            client_info: ClientInfo::new("Jane", "5551234567", "jane@example.com")
                .expect("valid contact"),
            property_address: "12 Elm Street".to_owned(),
            message: String::new(),
            status: AppointmentStatus::Pending,
            payment: Payment {
                method: PaymentMethod::Cash,
                status: PaymentStatus::Verified,
                amount_cents: 10_000,
                qr_details: None,
                outcome: None,
                amount_history: Vec::new(),
            },
            receipt: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn assigned_agent_requires_role_and_identity() {
        let client = UserId::random();
        let agent = UserId::random();
        let appointment = fixture_appointment(client, agent);

        let as_agent = Requester {
            id: agent,
            role: UserRole::Agent,
        };
        let demoted = Requester {
            id: agent,
            role: UserRole::Client,
        };
        let other_agent = Requester {
            id: UserId::random(),
            role: UserRole::Agent,
        };

        assert!(is_assigned_agent(&appointment, as_agent));
        assert!(!is_assigned_agent(&appointment, demoted));
        assert!(!is_assigned_agent(&appointment, other_agent));
    }

    #[test]
    fn participant_check_admits_client_agent_and_admin() {
        let client = UserId::random();
        let agent = UserId::random();
        let appointment = fixture_appointment(client, agent);

        let owner = Requester {
            id: client,
            role: UserRole::Client,
        };
        let admin = Requester {
            id: UserId::random(),
            role: UserRole::Admin,
        };
        let stranger = Requester {
            id: UserId::random(),
            role: UserRole::Client,
        };

        assert!(ensure_participant(&appointment, owner, "Access denied").is_ok());
        assert!(ensure_participant(&appointment, admin, "Access denied").is_ok());
        let err = ensure_participant(&appointment, stranger, "Access denied")
            .expect_err("stranger is rejected");
        assert_eq!(err.message(), "Access denied");
    }

    #[test]
    fn admin_gate_rejects_agents_and_clients() {
        for role in [UserRole::Client, UserRole::Agent] {
            let requester = Requester {
                id: UserId::random(),
                role,
            };
            assert!(ensure_admin(requester).is_err());
        }
        let admin = Requester {
            id: UserId::random(),
            role: UserRole::Admin,
        };
        assert!(ensure_admin(admin).is_ok());
    }
}
