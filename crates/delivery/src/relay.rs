use async_trait::async_trait;
use mailcast_core::relay::{OutgoingEmail, RelayConnection};

/// Failure reported by a relay.
///
/// The split matters to the dispatch loop: a rejected message only fails
/// that recipient, an unavailable relay ends the whole campaign.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The relay refused this particular message (bad address, SMTP
    /// response error, malformed message).
    #[error("{0}")]
    Rejected(String),

    /// The relay itself cannot be used (connection, TLS, authentication,
    /// timeout).
    #[error("{0}")]
    Unavailable(String),
}

impl RelayError {
    /// Whether this error should abort the remaining recipients.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Asynchronous mail relay capability.
///
/// Both operations may be slow and may fail; callers await them one at a
/// time.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Connect and authenticate without sending anything.
    async fn verify(&self, connection: &RelayConnection) -> Result<(), RelayError>;

    /// Deliver one message.
    async fn send(
        &self,
        connection: &RelayConnection,
        email: &OutgoingEmail,
    ) -> Result<(), RelayError>;
}
