//! Plain data handed to the relay capability.
//!
//! The capability itself (verification and sending) lives in the delivery
//! crate; these types are shared so validation can produce them without
//! depending on a mail transport.

/// Connection parameters for the caller-supplied mail relay.
#[derive(Clone, PartialEq, Eq)]
pub struct RelayConnection {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for RelayConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One personalized message ready to hand to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Full `From` header, e.g. `Team <team@example.com>`.
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}
