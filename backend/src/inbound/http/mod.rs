//! HTTP inbound adapter exposing the REST endpoints.

pub mod appointments;
pub mod error;
pub mod health;
pub mod payments;
pub mod session;
pub mod state;
#[cfg(test)]
pub mod test_utils;

pub use error::ApiResult;
