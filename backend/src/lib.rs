//! Doorstep backend: appointment scheduling and payment verification for the
//! property marketplace.
//!
//! The crate is a hexagon: `domain` holds the entities, services, and port
//! traits; `inbound` adapts HTTP onto the driving ports; `outbound` implements
//! the driven ports over PostgreSQL and the mail relay; `server` wires the
//! layers together.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod server;

#[cfg(feature = "test-support")]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
