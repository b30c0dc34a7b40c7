//! SMTP relay over `lettre`.
//!
//! A transport is built per call from the campaign's [`RelayConnection`]:
//! port 465 uses implicit TLS, every other port negotiates STARTTLS. The
//! relay is authenticated with the connection's username and password.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use mailcast_core::relay::{OutgoingEmail, RelayConnection};

use crate::relay::{Relay, RelayError};

/// Port conventionally served with implicit TLS (SMTPS).
const IMPLICIT_TLS_PORT: u16 = 465;

/// Default per-command timeout for relay I/O.
pub const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Production [`Relay`] speaking SMTP.
#[derive(Debug, Clone)]
pub struct SmtpRelay {
    timeout: Duration,
}

impl SmtpRelay {
    /// Create a relay whose SMTP commands time out after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn transport(
        &self,
        connection: &RelayConnection,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, RelayError> {
        let builder = if connection.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&connection.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&connection.host)
        }
        .map_err(|e| RelayError::Unavailable(e.to_string()))?;

        Ok(builder
            .port(connection.port)
            .credentials(Credentials::new(
                connection.username.clone(),
                connection.password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build())
    }
}

impl Default for SmtpRelay {
    fn default() -> Self {
        Self::new(DEFAULT_SMTP_TIMEOUT)
    }
}

/// Assemble the MIME message for one recipient.
fn build_message(email: &OutgoingEmail) -> Result<Message, RelayError> {
    let from: Mailbox = email
        .from
        .parse()
        .map_err(|e| RelayError::Rejected(format!("invalid sender address: {e}")))?;
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|e| RelayError::Rejected(format!("invalid recipient address: {e}")))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(email.subject.clone())
        .header(ContentType::TEXT_HTML)
        .body(email.html.clone())
        .map_err(|e| RelayError::Rejected(format!("could not build message: {e}")))
}

/// Reply codes that describe the relay session rather than the message:
/// service closing (421) and authentication failures (454, 530, 534, 535).
const RELAY_LEVEL_CODES: [u16; 5] = [421, 454, 530, 534, 535];

fn is_relay_level(code: u16) -> bool {
    RELAY_LEVEL_CODES.contains(&code)
}

/// Mailbox and message replies concern one recipient; relay-level replies
/// and every non-reply error concern the relay.
fn classify(err: lettre::transport::smtp::Error) -> RelayError {
    match err.status().map(u16::from) {
        Some(code) if !is_relay_level(code) => RelayError::Rejected(err.to_string()),
        _ => RelayError::Unavailable(err.to_string()),
    }
}

#[async_trait]
impl Relay for SmtpRelay {
    async fn verify(&self, connection: &RelayConnection) -> Result<(), RelayError> {
        let transport = self.transport(connection)?;
        match transport.test_connection().await {
            Ok(true) => {
                tracing::debug!(host = %connection.host, port = connection.port, "SMTP relay verified");
                Ok(())
            }
            Ok(false) => Err(RelayError::Unavailable(format!(
                "SMTP relay {}:{} did not accept the connection",
                connection.host, connection.port
            ))),
            Err(e) => Err(RelayError::Unavailable(e.to_string())),
        }
    }

    async fn send(
        &self,
        connection: &RelayConnection,
        email: &OutgoingEmail,
    ) -> Result<(), RelayError> {
        let message = build_message(email)?;
        let transport = self.transport(connection)?;
        transport.send(message).await.map_err(classify)?;

        tracing::debug!(to = %email.to, "Email accepted by relay");
        Ok(())
    }
}
