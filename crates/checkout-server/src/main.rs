//! PIX Checkout HTTP Server
//!
//! Axum-based server exposing the plan catalog, upsell resolution, checkout
//! sessions with PIX payment polling, and the age gate.

mod config;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_core::{
    AgeGate, Clock, NavigationPolicy, PaymentInitiator, PaymentProvider, PlanCatalog,
    SystemClock, UpsellNegotiator,
};
use checkout_payments::ParadiseClient;

use crate::config::ServerConfig;
use crate::state::{AppState, SWEEP_INTERVAL, SessionRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Initialize payments
    let initiator = match ParadiseClient::from_env() {
        Ok(client) => {
            tracing::info!(base_url = %client.base_url(), "✓ Paradise configured");
            let provider: Arc<dyn PaymentProvider> = Arc::new(client);
            Some(PaymentInitiator::new(
                provider,
                clock.clone(),
                config.initiator.clone(),
            ))
        }
        Err(e) => {
            tracing::warn!(error = %e, "⚠ Paradise not configured - payments disabled");
            tracing::warn!("  Set PARADISE_API_KEY and PARADISE_PRODUCT_HASH in .env");
            None
        }
    };

    let catalog = PlanCatalog::standard();
    tracing::info!(
        plans = catalog.len(),
        default_plan = %catalog.default_plan().id,
        identity = %config.session.identity,
        "Checkout configured"
    );

    let sessions = Arc::new(SessionRegistry::new(clock.clone(), config.expiry));
    sessions.start_sweeper(SWEEP_INTERVAL);
    tracing::info!(
        idle_secs = config.expiry.idle.as_secs(),
        confirmed_grace_secs = config.expiry.confirmed_grace.as_secs(),
        "Session expiry configured"
    );

    // Build application state
    let state = AppState {
        catalog: Arc::new(catalog),
        upsells: Arc::new(UpsellNegotiator::standard()),
        initiator,
        clock,
        session_config: config.session.clone(),
        sessions,
        navigation: Arc::new(NavigationPolicy::default()),
        age_gate: Arc::new(AgeGate::default()),
        brand: config.initiator.brand.clone(),
    };

    let app = routes::app(state, "static");

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 checkout server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                    - Health check");
    tracing::info!("  GET  /api/plans                 - Plan catalog");
    tracing::info!("  GET  /api/plans/{{id}}/upsell     - Upsell offer");
    tracing::info!("  POST /api/plans/{{id}}/select     - Resolve plan choice");
    tracing::info!("  POST /api/checkout              - Open checkout session");
    tracing::info!("  POST /api/checkout/{{id}}/submit  - Request PIX code");
    tracing::info!("  POST /api/pix                   - Create PIX charge");
    tracing::info!("  POST /api/pix/status            - Check PIX status");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
