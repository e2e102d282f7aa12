//! Mail delivery adapters.
//!
//! Delivery is best effort by contract: the domain logs mailer failures and
//! never propagates them, so these adapters only need to report honestly.

mod relay_mailer;

pub use relay_mailer::{NoopMailer, RelayMailer};
