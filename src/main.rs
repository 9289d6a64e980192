use axum::{routing::get, Router};
use mimalloc::MiMalloc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boxoffice::{
    config::Config,
    controllers,
    services::{expiry::ExpirySweeper, gateway::HttpCheckoutGateway, notify},
    store::postgres::PgStore,
    AppState,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Boxoffice API");

    // Connect to the database
    let store = PgStore::connect(&config.database.url, config.database.pool_size)
        .await
        .expect("Failed to connect to database");
    info!("Database connected");

    // Run migrations
    store
        .run_migrations()
        .await
        .expect("Failed to run migrations");

    let gateway = Arc::new(HttpCheckoutGateway::from_config(&config.payment));
    let notifier = notify::from_config(&config.notifications);

    // Create the shared application state
    let app_state = AppState::new(Arc::new(store), gateway, notifier, config.clone());

    // --- Start background tasks ---

    // Task to release expired seat holds
    let sweeper = ExpirySweeper::new(app_state.store.clone(), config.bookings.hold_minutes);
    let sweep_interval = Duration::from_secs(config.bookings.sweep_interval_secs);
    task::spawn(async move {
        loop {
            tokio::time::sleep(sweep_interval).await;
            match sweeper.run_once().await {
                Ok(0) => {}
                Ok(n) => info!("Expiry sweep released {} booking(s)", n),
                Err(e) => error!("Expiry sweep failed: {:?}", e),
            }
        }
    });

    // --- Start the web server ---

    // Create the main router
    let app = Router::new()
        .route("/", get(|| async { "Boxoffice API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        // Mount the routes from the controllers module
        .nest("/api", controllers::routes())
        // Pass the application state to the router
        .with_state(app_state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.app.port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app.into_make_service())
        .await
        .unwrap();
}
