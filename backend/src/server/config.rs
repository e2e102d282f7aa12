//! Application settings loaded via OrthoConfig.
//!
//! Settings merge CLI arguments, `DOORSTEP_`-prefixed environment variables,
//! and an optional configuration file. Everything has a workable default for
//! local development except the database URL, which the caller must supply.

use std::net::SocketAddr;
use std::path::PathBuf;

use actix_web::cookie::Key;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use tracing::warn;

use crate::domain::PaymentDefaults;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_SESSION_KEY_FILE: &str = "/var/run/secrets/session_key";
const DEFAULT_MAIL_SENDER: &str = "noreply@doorstep.example";

/// Runtime configuration for the backend process.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "DOORSTEP")]
pub struct AppSettings {
    /// Socket address the HTTP server binds to.
    pub bind_address: Option<String>,
    /// PostgreSQL connection URL. Required.
    pub database_url: Option<String>,
    /// Path to the session signing key file.
    pub session_key_file: Option<PathBuf>,
    /// Mark session cookies `Secure`; disable only behind TLS-less dev setups.
    #[ortho_config(default = true)]
    pub cookie_secure: bool,
    /// Mail relay endpoint; emails are logged and dropped when unset.
    pub mail_relay_url: Option<String>,
    /// Sender address stamped on outbound mail.
    pub mail_sender: Option<String>,
    /// Amount applied to defaulted cash payments, in minor units.
    pub default_amount_cents: Option<i64>,
}

impl AppSettings {
    /// Parse the configured bind address, falling back to `0.0.0.0:8080`.
    ///
    /// # Errors
    ///
    /// Returns [`std::net::AddrParseError`] for a malformed address.
    pub fn bind_address(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.bind_address
            .as_deref()
            .unwrap_or(DEFAULT_BIND_ADDRESS)
            .parse()
    }

    /// The configured database URL, if any.
    #[must_use]
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    /// Sender address for outbound mail.
    #[must_use]
    pub fn mail_sender(&self) -> &str {
        self.mail_sender.as_deref().unwrap_or(DEFAULT_MAIL_SENDER)
    }

    /// Payment defaults handed to the scheduling engine.
    #[must_use]
    pub fn payment_defaults(&self) -> PaymentDefaults {
        match self.default_amount_cents {
            Some(default_amount_cents) => PaymentDefaults {
                default_amount_cents,
            },
            None => PaymentDefaults::default(),
        }
    }

    /// Load the session signing key from the configured file.
    ///
    /// Debug builds fall back to an ephemeral key so local servers start
    /// without secrets; release builds refuse to run without one.
    ///
    /// # Errors
    ///
    /// Returns [`std::io::Error`] in release builds when the key file is
    /// missing or shorter than 32 bytes.
    pub fn session_key(&self) -> std::io::Result<Key> {
        let path = self
            .session_key_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_KEY_FILE));
        let failure = match std::fs::read(&path) {
            Ok(bytes) if bytes.len() >= 32 => return Ok(Key::derive_from(&bytes)),
            Ok(_) => "key file is shorter than 32 bytes".to_owned(),
            Err(error) => error.to_string(),
        };
        if cfg!(debug_assertions) {
            warn!(path = %path.display(), error = %failure, "using ephemeral session key (dev only)");
            Ok(Key::generate())
        } else {
            Err(std::io::Error::other(format!(
                "failed to load session key from {}: {failure}",
                path.display()
            )))
        }
    }
}
