//! PostgreSQL persistence adapters for the appointment store and directories.

mod diesel_appointment_repository;
mod diesel_directory;
mod error_mapping;
mod models;
pub mod pool;
pub mod schema;

pub use diesel_appointment_repository::DieselAppointmentRepository;
pub use diesel_directory::{DieselListingDirectory, DieselUserDirectory};
pub use pool::{DbPool, PoolConfig, PoolError};
