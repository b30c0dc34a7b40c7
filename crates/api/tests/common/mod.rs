#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mailcast_api::config::{CampaignConfig, ServerConfig};
use mailcast_api::engine::{Campaign, CampaignDispatcher, CampaignStore};
use mailcast_api::router::build_app_router;
use mailcast_api::state::AppState;
use mailcast_core::campaign::CampaignSnapshot;
use mailcast_core::relay::{OutgoingEmail, RelayConnection};
use mailcast_core::rows::Row;
use mailcast_core::submission::ValidatedCampaign;
use mailcast_delivery::{Relay, RelayError};
use tokio::sync::Semaphore;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
///
/// At most 3 recipients per campaign, no default delay and a one-minute TTL.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        max_upload_bytes: 1024 * 1024,
        campaign: CampaignConfig {
            max_recipients: 3,
            ttl_secs: 60,
            default_delay_ms: 0,
            max_delay_ms: 5_000,
            max_log_entries: 200,
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 465,
            smtp_timeout_secs: 5,
        },
    }
}

// ---------------------------------------------------------------------------
// Fake relay
// ---------------------------------------------------------------------------

/// In-memory [`Relay`] with scripted outcomes.
#[derive(Default)]
pub struct FakeRelay {
    verify_error: Option<RelayError>,
    failures: HashMap<String, RelayError>,
    panic_on: Option<String>,
    gate: Option<Arc<Semaphore>>,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl FakeRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail verification with `error`.
    pub fn failing_verify(mut self, error: RelayError) -> Self {
        self.verify_error = Some(error);
        self
    }

    /// Fail every send to `address` with `error`.
    pub fn failing_for(mut self, address: &str, error: RelayError) -> Self {
        self.failures.insert(address.to_string(), error);
        self
    }

    /// Panic when asked to send to `address`.
    pub fn panicking_for(mut self, address: &str) -> Self {
        self.panic_on = Some(address.to_string());
        self
    }

    /// Block each send until a permit is added to the returned semaphore.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Recipients of every send attempt, in call order.
    pub fn attempted(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|e| e.to.clone()).collect()
    }

    pub fn emails(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Relay for FakeRelay {
    async fn verify(&self, _connection: &RelayConnection) -> Result<(), RelayError> {
        match &self.verify_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn send(
        &self,
        _connection: &RelayConnection,
        email: &OutgoingEmail,
    ) -> Result<(), RelayError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.panic_on.as_deref() == Some(email.to.as_str()) {
            panic!("relay blew up on {}", email.to);
        }
        self.sent.lock().unwrap().push(email.clone());
        match self.failures.get(&email.to) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Build the full application router and its state around `relay`.
///
/// Uses the same router builder as `main.rs`, so tests exercise the real
/// middleware stack.
pub fn build_test_app_with(relay: Arc<FakeRelay>) -> (Router, AppState) {
    let config = test_config();
    let store = Arc::new(CampaignStore::new(config.campaign.ttl()));
    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        dispatcher: Arc::new(CampaignDispatcher::new(relay)),
    };
    (build_app_router(state.clone(), &config), state)
}

/// Build the application with a relay that accepts everything.
pub fn build_test_app() -> Router {
    build_test_app_with(Arc::new(FakeRelay::new())).0
}

// ---------------------------------------------------------------------------
// Campaign fixtures
// ---------------------------------------------------------------------------

/// A validated campaign for `addresses`. An empty string yields a row
/// whose address is missing.
pub fn validated(addresses: &[&str], delay_ms: u64) -> ValidatedCampaign {
    let recipients = addresses
        .iter()
        .enumerate()
        .map(|(i, address)| {
            let mut row = Row::new();
            row.insert("name".into(), format!("Person {i}").into());
            row.insert("email".into(), address.to_string().into());
            row
        })
        .collect();

    ValidatedCampaign {
        subject: "Hello".to_string(),
        template: "<p>Hi $(name)</p>".to_string(),
        recipients,
        email_column: "email".to_string(),
        columns: vec!["name".to_string(), "email".to_string()],
        relay: RelayConnection {
            host: "smtp.example.com".to_string(),
            port: 465,
            username: "team@example.com".to_string(),
            password: "secret".to_string(),
        },
        sender: "Team <team@example.com>".to_string(),
        delay_ms,
    }
}

pub fn campaign(addresses: &[&str], delay_ms: u64) -> Arc<Campaign> {
    Arc::new(Campaign::new(validated(addresses, delay_ms), 200))
}

/// Poll a campaign until `done` holds for its snapshot.
pub async fn wait_for<F>(campaign: &Campaign, done: F) -> CampaignSnapshot
where
    F: Fn(&CampaignSnapshot) -> bool,
{
    for _ in 0..1000 {
        let snapshot = campaign.snapshot().await;
        if done(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("campaign never reached the expected state");
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn expect_status(response: Response<Body>, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}

const BOUNDARY: &str = "mailcast-test-boundary";

/// Minimal `multipart/form-data` body builder.
#[derive(Default)]
pub struct Form {
    body: Vec<u8>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, contents: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: text/csv\r\n\r\n{contents}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    /// A complete submission for `csv` with every required field set.
    pub fn campaign(csv: &str) -> Self {
        Self::new()
            .file("file", "recipients.csv", csv)
            .text("sender_email", "team@example.com")
            .text("sender_name", "Team")
            .text("smtp_password", "app-password")
            .text("subject", "Hello")
            .text("template", "<p>Hi $(name)</p>")
            .text("delay_ms", "0")
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

pub async fn submit(app: Router, form: Form) -> Response<Body> {
    app.oneshot(form.into_request("/api/v1/campaigns"))
        .await
        .unwrap()
}
