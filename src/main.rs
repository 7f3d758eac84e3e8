mod auth;
mod colab;
mod config;
mod docs;
mod handlers;
mod models;
mod routes;
mod services;
mod transport;
mod utils;
mod websocket;

use axum::{http::HeaderValue, Router};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use routes::{create_api_routes, create_ws_routes};
use docs::ApiDoc;
use config::Config;
use tracing::{debug, info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use std::panic;
use std::sync::Arc;

use auth::UserCtxCache;
use transport::TransportHub;
use utils::scope_guard::AbortOnDrop;

/// Shared state handed to every route
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: Arc<TransportHub>,
    pub user_cache: UserCtxCache,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let hub = TransportHub::new(config.view_options(), config.channel_capacity);
        Self {
            config: Arc::new(config),
            hub: Arc::new(hub),
            user_cache: UserCtxCache::new(),
        }
    }
}

/// Build the full router: API, websocket and Swagger UI
pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Mount API routes
        .nest("/api", create_api_routes(state.clone()))
        // Mount the realtime endpoint
        .merge(create_ws_routes(state.clone()))
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(&state.config))
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        if config.is_development() {
            return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
        }
        return CorsLayer::new();
    }
    CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
}

/// Sweep stale sessions of every open document on a fixed cadence
fn spawn_sweeper(state: &AppState) -> AbortOnDrop<()> {
    let hub = state.hub.clone();
    let period = state.config.sweep_interval();
    AbortOnDrop(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let report = hub.sweep(Utc::now());
            if report.demoted > 0 || report.expired > 0 {
                debug!("Hub sweep: {} demoted, {} expired", report.demoted, report.expired);
            }
        }
    }))
}

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration first, it decides the default log level
    let loaded = Config::load();
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_filter().into()))
        .init();

    info!("Starting server...");
    match &loaded {
        Ok(_) => info!("✅ Configuration loaded successfully"),
        Err(e) => {
            error!("❌ Failed to load configuration: {}", e);
            warn!("Using default configuration");
        }
    }

    if config.cloud_auth_jwt_secret.is_none() {
        warn!("No JWT secret configured - only development identities are accepted");
    }

    let address = config.server_address();
    let state = AppState::new(config);
    let _sweeper = spawn_sweeper(&state);
    let app = create_app(state);

    // Start the HTTP/API server
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", address, e);
            return;
        }
    };

    info!("🚀 Server running on http://{}", address);
    info!("📡 WebSocket available at ws://{}/ws/{{document}}", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}
