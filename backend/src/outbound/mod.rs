//! Outbound adapters: PostgreSQL persistence and the mail relay.

pub mod mail;
pub mod persistence;
