//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only depend
//! on domain ports and remain testable without I/O. The directory port sits
//! here too: requester identity is the session subject resolved through it on
//! every request, so role changes take effect immediately.

use std::sync::Arc;

use crate::domain::ports::{Appointments, DirectoryError, Payments, Scheduling, UserDirectory};
use crate::domain::{Error, Requester};
use crate::inbound::http::session::SessionContext;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Appointment creation use-case.
    pub scheduling: Arc<dyn Scheduling>,
    /// Appointment query/lifecycle use-cases.
    pub appointments: Arc<dyn Appointments>,
    /// Payment workflow use-cases.
    pub payments: Arc<dyn Payments>,
    /// Directory used to resolve the session subject into a [`Requester`].
    pub users: Arc<dyn UserDirectory>,
}

impl HttpState {
    /// Resolve the session identity into a requester with its current role.
    ///
    /// # Errors
    ///
    /// Returns an unauthorized error when the session carries no identity or
    /// the subject no longer exists in the directory.
    pub async fn resolve_requester(&self, session: &SessionContext) -> Result<Requester, Error> {
        let user_id = session.require_user_id()?;
        let user = self
            .users
            .find_user(user_id)
            .await
            .map_err(map_directory_error)?
            .ok_or_else(|| Error::unauthorized("User account not found"))?;
        Ok(Requester::from_user(&user))
    }
}

fn map_directory_error(error: DirectoryError) -> Error {
    match error {
        DirectoryError::Connection { message } => Error::service_unavailable(message),
        DirectoryError::Lookup { message } => Error::internal(message),
    }
}
