//! Mail relay capability.
//!
//! - [`Relay`]: the seam the dispatch engine depends on. Verifies a relay
//!   connection and sends one message.
//! - [`SmtpRelay`]: the production implementation over `lettre`'s async
//!   SMTP transport.

pub mod relay;
pub mod smtp;

pub use mailcast_core::relay::{OutgoingEmail, RelayConnection};
pub use relay::{Relay, RelayError};
pub use smtp::SmtpRelay;
