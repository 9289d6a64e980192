pub mod config;
pub mod controllers;
pub mod error;
pub mod middleware;
pub mod models;
pub mod seatmap;
pub mod services;
pub mod store;

use std::sync::Arc;

use services::gateway::CheckoutGateway;
use services::notify::Notifier;
use services::payments::PaymentEventProcessor;
use services::reservations::ReservationService;
use services::signature::SignatureVerifier;
use store::BookingStore;

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BookingStore>,
    pub reservations: ReservationService,
    pub payments: PaymentEventProcessor,
    pub config: config::Config,
}

impl AppState {
    /// Wires the services onto a store and gateway. The same constructor
    /// serves `main` (Postgres, HTTP gateway) and the integration tests
    /// (in-memory store, scripted gateway).
    pub fn new(
        store: Arc<dyn BookingStore>,
        gateway: Arc<dyn CheckoutGateway>,
        notifier: Arc<dyn Notifier>,
        config: config::Config,
    ) -> Arc<Self> {
        let verifier = SignatureVerifier::new(
            config.payment.webhook_secrets.clone(),
            config.payment.signature_tolerance_secs,
        );
        let reservations = ReservationService::new(store.clone(), gateway.clone());
        let payments = PaymentEventProcessor::new(store.clone(), gateway, notifier, verifier);

        Arc::new(Self {
            store,
            reservations,
            payments,
            config,
        })
    }
}
