//! Appointment queries and lifecycle transitions.
//!
//! Status machine: `pending → confirmed → completed`, with cancellation from
//! any slot-holding state. `canceled` and `completed` are terminal; nothing
//! transitions out of them, admin included.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use pagination::{Page, PageRequest};
use tracing::debug;

use super::appointment::{AppointmentDetails, AppointmentStatus};
use super::authorization::{
    ensure_admin, ensure_agent_or_admin, ensure_assigned_agent_or_admin, ensure_participant,
};
use super::error::Error;
use super::identity::{AppointmentId, Requester};
use super::ports::{
    AppointmentFilter, AppointmentRepository, AppointmentRepositoryError, Appointments, ListFilter,
    ListOrder,
};

/// Appointment query/lifecycle service implementing the [`Appointments`]
/// driving port.
#[derive(Clone)]
pub struct AppointmentsService {
    repository: Arc<dyn AppointmentRepository>,
    clock: Arc<dyn Clock>,
}

impl AppointmentsService {
    /// Create a new service over the given ports.
    #[must_use]
    pub fn new(repository: Arc<dyn AppointmentRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    async fn load_details(&self, id: AppointmentId) -> Result<AppointmentDetails, Error> {
        self.repository
            .find_details(id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("Appointment not found"))
    }
}

fn map_repository_error(error: AppointmentRepositoryError) -> Error {
    match error {
        AppointmentRepositoryError::Connection { message } => Error::service_unavailable(message),
        AppointmentRepositoryError::Query { message }
        | AppointmentRepositoryError::Corrupt { message } => Error::internal(message),
        // Slot uniqueness only trips on insert; surfacing it here would be a
        // store bug, so keep the conflict wording consistent anyway.
        AppointmentRepositoryError::SlotTaken => {
            Error::conflict("Agent is not available at this time")
        }
    }
}

#[async_trait]
impl Appointments for AppointmentsService {
    async fn list_for_agent(
        &self,
        requester: Requester,
        filter: ListFilter,
        page: PageRequest,
    ) -> Result<Page<AppointmentDetails>, Error> {
        ensure_agent_or_admin(requester)?;
        let filter = AppointmentFilter {
            agent: Some(requester.id),
            status: filter.status,
            payment_status: filter.payment_status,
            date: filter.date,
            ..AppointmentFilter::default()
        };
        self.repository
            .list(&filter, ListOrder::SlotAscending, &page)
            .await
            .map_err(map_repository_error)
    }

    async fn list_for_client(
        &self,
        requester: Requester,
    ) -> Result<Vec<AppointmentDetails>, Error> {
        let filter = AppointmentFilter {
            client: Some(requester.id),
            ..AppointmentFilter::default()
        };
        self.repository
            .list_all(&filter, ListOrder::DateDescending)
            .await
            .map_err(map_repository_error)
    }

    async fn list_all(
        &self,
        requester: Requester,
        filter: ListFilter,
        page: PageRequest,
    ) -> Result<Page<AppointmentDetails>, Error> {
        ensure_admin(requester)?;
        let filter = AppointmentFilter {
            status: filter.status,
            payment_status: filter.payment_status,
            date: filter.date,
            ..AppointmentFilter::default()
        };
        self.repository
            .list(&filter, ListOrder::CreatedDescending, &page)
            .await
            .map_err(map_repository_error)
    }

    async fn get(
        &self,
        id: AppointmentId,
        requester: Requester,
    ) -> Result<AppointmentDetails, Error> {
        let details = self.load_details(id).await?;
        ensure_participant(&details.appointment, requester, "Access denied")?;
        Ok(details)
    }

    async fn update_status(
        &self,
        id: AppointmentId,
        status: AppointmentStatus,
        requester: Requester,
    ) -> Result<AppointmentDetails, Error> {
        let mut appointment = self
            .repository
            .find_by_id(id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("Appointment not found"))?;

        ensure_assigned_agent_or_admin(
            &appointment,
            requester,
            "You can only update your own appointments",
        )?;

        if appointment.status.is_terminal() {
            return Err(Error::conflict(format!(
                "Cannot update a {} appointment",
                appointment.status.as_str()
            )));
        }

        debug!(
            appointment = %appointment.id,
            from = appointment.status.as_str(),
            to = status.as_str(),
            "appointment status transition"
        );
        appointment.status = status;
        appointment.updated_at = self.clock.utc();
        self.repository
            .save(&appointment)
            .await
            .map_err(map_repository_error)?;

        self.load_details(id).await
    }

    async fn cancel(
        &self,
        id: AppointmentId,
        requester: Requester,
    ) -> Result<AppointmentDetails, Error> {
        let mut appointment = self
            .repository
            .find_by_id(id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found("Appointment not found"))?;

        ensure_participant(
            &appointment,
            requester,
            "You can only cancel your own appointments",
        )?;

        if appointment.status == AppointmentStatus::Canceled {
            return Err(Error::conflict("Appointment is already canceled"));
        }
        if appointment.status == AppointmentStatus::Completed {
            return Err(Error::conflict("Cannot cancel a completed appointment"));
        }

        appointment.status = AppointmentStatus::Canceled;
        appointment.updated_at = self.clock.utc();
        self.repository
            .save(&appointment)
            .await
            .map_err(map_repository_error)?;

        self.load_details(id).await
    }

    async fn delete(&self, id: AppointmentId, requester: Requester) -> Result<(), Error> {
        ensure_admin(requester)?;
        let existed = self
            .repository
            .delete(id)
            .await
            .map_err(map_repository_error)?;
        if existed {
            Ok(())
        } else {
            Err(Error::not_found("Appointment not found"))
        }
    }
}

#[cfg(test)]
#[path = "appointments_tests.rs"]
mod appointments_tests;
