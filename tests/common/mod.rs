#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use boxoffice::config::{
    AppConfig, AuthConfig, BookingConfig, Config, DatabaseConfig, NotificationConfig,
    PaymentConfig,
};
use boxoffice::controllers;
use boxoffice::models::{Booking, Show};
use boxoffice::services::gateway::{CheckoutGateway, CheckoutSession, GatewayError};
use boxoffice::services::notify::Notifier;
use boxoffice::store::memory::MemStore;
use boxoffice::store::BookingStore;
use boxoffice::AppState;

pub const PRIMARY_SECRET: &str = "whsec_test_primary";
pub const ROTATED_SECRET: &str = "whsec_test_rotated";
pub const JWT_SECRET: &str = "test-jwt-secret";

pub fn test_config() -> Config {
    Config {
        app: AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            rust_log: "boxoffice=debug".to_string(),
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            pool_size: 1,
        },
        auth: AuthConfig {
            jwt_secret: JWT_SECRET.to_string(),
        },
        payment: PaymentConfig {
            gateway_url: "https://pay.test".to_string(),
            secret_key: "sk_test_key".to_string(),
            currency: "usd".to_string(),
            success_url: "https://cinema.test/loading/my-bookings".to_string(),
            cancel_url: "https://cinema.test/my-bookings".to_string(),
            webhook_secrets: vec![PRIMARY_SECRET.to_string(), ROTATED_SECRET.to_string()],
            signature_tolerance_secs: 300,
        },
        bookings: BookingConfig {
            hold_minutes: 15,
            sweep_interval_secs: 60,
        },
        notifications: NotificationConfig {
            confirmation_url: None,
        },
    }
}

/// Scripted gateway double. Sessions are handed out sequentially; payment
/// references resolve through an explicit map, like the provider's own
/// session index would.
#[derive(Default)]
pub struct TestGateway {
    fail_create: AtomicBool,
    counter: AtomicU32,
    payments: Mutex<HashMap<String, Uuid>>,
}

impl TestGateway {
    pub fn fail_next_creates(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Registers what the provider would know: this payment reference
    /// belongs to a session created for this booking.
    pub fn map_payment(&self, payment_ref: &str, booking_id: Uuid) {
        self.payments
            .lock()
            .unwrap()
            .insert(payment_ref.to_string(), booking_id);
    }
}

#[async_trait]
impl CheckoutGateway for TestGateway {
    async fn create_session(
        &self,
        booking: &Booking,
        _show: &Show,
    ) -> Result<CheckoutSession, GatewayError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("scripted outage".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let id = format!("cs_test_{n}");
        Ok(CheckoutSession {
            url: Some(format!("https://pay.test/c/{id}")),
            booking_id: Some(booking.id),
            id,
        })
    }

    async fn session_for_payment(
        &self,
        payment_ref: &str,
    ) -> Result<Option<CheckoutSession>, GatewayError> {
        let mapped = self.payments.lock().unwrap().get(payment_ref).copied();
        Ok(mapped.map(|booking_id| CheckoutSession {
            id: format!("cs_for_{payment_ref}"),
            url: None,
            booking_id: Some(booking_id),
        }))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    confirmations: AtomicU32,
}

impl RecordingNotifier {
    pub fn confirmations(&self) -> u32 {
        self.confirmations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn booking_confirmed(&self, _booking: &Booking) {
        self.confirmations.fetch_add(1, Ordering::SeqCst);
    }
}

/// One application instance on the in-memory store, with handles onto the
/// doubles so tests can script and inspect them.
pub struct TestApp {
    pub store: Arc<MemStore>,
    pub gateway: Arc<TestGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemStore::new());
        let gateway = Arc::new(TestGateway::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(
            store.clone(),
            gateway.clone(),
            notifier.clone(),
            test_config(),
        );
        TestApp {
            store,
            gateway,
            notifier,
            state,
        }
    }

    // oneshot consumes the router, so build a fresh one per request.
    pub fn router(&self) -> Router {
        Router::new()
            .nest("/api", controllers::routes())
            .with_state(self.state.clone())
    }

    pub async fn seed_show(&self) -> Show {
        let show = Show {
            id: Uuid::new_v4(),
            movie_title: "Arrival".to_string(),
            starts_at: Utc::now() + chrono::Duration::days(3),
            price_minor: 1500,
            seat_rows: 10,
            seats_per_row: 9,
        };
        self.store.insert_show(show.clone()).await;
        show
    }

    pub async fn booking(&self, booking_id: Uuid) -> Booking {
        self.store
            .booking(booking_id)
            .await
            .unwrap()
            .expect("booking should exist")
    }
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: usize,
}

pub fn bearer_for(user_id: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {token}")
}

pub fn create_booking_request(token: &str, show_id: Uuid, seats: &[&str]) -> Request<Body> {
    let body = serde_json::json!({ "showId": show_id, "selectedSeats": seats }).to_string();
    Request::builder()
        .method("POST")
        .uri("/api/booking/create")
        .header("content-type", "application/json")
        .header("authorization", token)
        .body(Body::from(body))
        .unwrap()
}

pub fn occupied_seats_request(show_id: Uuid) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(format!("/api/booking/seats/{show_id}"))
        .body(Body::empty())
        .unwrap()
}

pub fn my_bookings_request(token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/api/booking/mine")
        .header("authorization", token)
        .body(Body::empty())
        .unwrap()
}

pub fn webhook_request(signature: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/payments/webhook")
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        builder = builder.header("Stripe-Signature", sig);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn signed_header(secret: &str, body: &[u8]) -> String {
    signed_header_at(secret, body, Utc::now().timestamp())
}

pub fn signed_header_at(secret: &str, body: &[u8], timestamp: i64) -> String {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

pub fn checkout_completed_event(event_id: &str, booking_id: Uuid) -> Vec<u8> {
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": format!("cs_for_{event_id}"),
            "metadata": { "bookingId": booking_id }
        } }
    })
    .to_string()
    .into_bytes()
}

pub fn payment_succeeded_event(event_id: &str, payment_ref: &str) -> Vec<u8> {
    serde_json::json!({
        "id": event_id,
        "type": "payment_intent.succeeded",
        "data": { "object": { "id": payment_ref } }
    })
    .to_string()
    .into_bytes()
}
