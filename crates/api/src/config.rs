use std::time::Duration;

use mailcast_core::campaign::DEFAULT_MAX_LOG_ENTRIES;
use mailcast_core::submission::SubmissionLimits;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long to wait for in-flight requests on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Maximum request body size for uploads, in bytes (default: 5 MiB).
    pub max_upload_bytes: usize,
    /// Campaign limits, defaults and relay settings.
    pub campaign: CampaignConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `MAX_UPLOAD_BYTES`     | `5242880`                  |
    ///
    /// Campaign settings are documented on [`CampaignConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| (5 * 1024 * 1024).to_string())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let campaign = CampaignConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            max_upload_bytes,
            campaign,
        }
    }
}

/// Campaign limits and relay defaults.
#[derive(Debug, Clone)]
pub struct CampaignConfig {
    /// Largest accepted recipient list.
    pub max_recipients: usize,
    /// Lifetime of a campaign in the store, measured from creation.
    pub ttl_secs: u64,
    /// Delay between recipients when the submission does not set one.
    pub default_delay_ms: u64,
    /// Upper bound for a submitted delay.
    pub max_delay_ms: u64,
    /// Log entries kept per campaign.
    pub max_log_entries: usize,
    /// Relay host when the submission does not set one.
    pub smtp_host: String,
    /// Relay port when the submission does not set one.
    pub smtp_port: u16,
    /// Per-command SMTP timeout.
    pub smtp_timeout_secs: u64,
}

impl CampaignConfig {
    /// Load campaign settings from environment variables with defaults.
    ///
    /// | Env Var                | Default          |
    /// |------------------------|------------------|
    /// | `MAX_RECIPIENTS`       | `500`            |
    /// | `CAMPAIGN_TTL_SECS`    | `3600`           |
    /// | `DEFAULT_SEND_DELAY_MS`| `1000`           |
    /// | `MAX_SEND_DELAY_MS`    | `60000`          |
    /// | `MAX_LOG_ENTRIES`      | `200`            |
    /// | `SMTP_HOST`            | `smtp.gmail.com` |
    /// | `SMTP_PORT`            | `465`            |
    /// | `SMTP_TIMEOUT_SECS`    | `30`             |
    pub fn from_env() -> Self {
        fn parsed<T: std::str::FromStr>(var: &str, default: T) -> T {
            match std::env::var(var) {
                Ok(raw) => raw
                    .trim()
                    .parse()
                    .unwrap_or_else(|_| panic!("{var} has an invalid value: {raw}")),
                Err(_) => default,
            }
        }

        Self {
            max_recipients: parsed("MAX_RECIPIENTS", 500),
            ttl_secs: parsed("CAMPAIGN_TTL_SECS", 3600),
            default_delay_ms: parsed("DEFAULT_SEND_DELAY_MS", 1000),
            max_delay_ms: parsed("MAX_SEND_DELAY_MS", 60_000),
            max_log_entries: parsed("MAX_LOG_ENTRIES", DEFAULT_MAX_LOG_ENTRIES),
            smtp_host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".into()),
            smtp_port: parsed("SMTP_PORT", 465),
            smtp_timeout_secs: parsed("SMTP_TIMEOUT_SECS", 30),
        }
    }

    /// Campaign lifetime as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// SMTP command timeout as a [`Duration`].
    pub fn smtp_timeout(&self) -> Duration {
        Duration::from_secs(self.smtp_timeout_secs)
    }

    /// Limits applied while validating submissions.
    pub fn limits(&self) -> SubmissionLimits {
        SubmissionLimits {
            max_recipients: self.max_recipients,
            default_delay_ms: self.default_delay_ms,
            max_delay_ms: self.max_delay_ms,
            default_smtp_host: self.smtp_host.clone(),
            default_smtp_port: self.smtp_port,
        }
    }
}
