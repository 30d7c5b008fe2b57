//! Backend of a prompt card catalog.
//!
//! # General Infrastructure
//! - Cards come from two Google Sheets, read with a service account on every request
//! - Rows are grouped into cards server side, see [`deck::grouper`]
//! - Clicks, comments and redeem activations live in Redis, see [`database`]
//! - Per-prompt live updates go out as server-sent events, see [`events`]
//!
//!
//!
//! # Routes
//!
//! | method | path                          | notes                                       |
//! |--------|-------------------------------|---------------------------------------------|
//! | GET    | `/api/sheets`                 | raw primary grid                            |
//! | GET    | `/api/sheets/special`         | raw special grid                            |
//! | GET    | `/api/cards`                  | `q`, `page`, `perPage`; primary needs redeem |
//! | GET    | `/api/redeem`                 | activation status                           |
//! | POST   | `/api/redeem`                 | `{ "code": ... }`                           |
//! | POST   | `/api/prompts/{id}/clicks`    | bumps the counter                           |
//! | GET    | `/api/prompts/{id}/stats`     | `null` until the first click                |
//! | GET    | `/api/prompts/{id}/comments`  | newest first                                |
//! | POST   | `/api/prompts/{id}/comments`  | `{ "content": ... }`                        |
//! | GET    | `/api/prompts/{id}/events`    | SSE, `stats` and `comments` events          |
//!
//! Callers identify themselves with the `x-client-id` header.
//!
//!
//!
//! # Errors
//!
//! Every failure is JSON: `{ "error", "message", "details"? }`.
//! Sheet not-found errors are 404, other sheet errors 500. `details` only shows with `APP_ENV=development`.
//!
//!
//!
//! # Setup
//!
//! Run with an in-memory store.
//! ```sh
//! GOOGLE_SERVICE_ACCOUNT_JSON="$(cat service-account.json)" RUST_LOG=info cargo run -p promptdeck
//! ```
//!
//! With Redis.
//! ```sh
//! REDIS_URL=redis://localhost:6379 cargo run -p promptdeck
//! ```
use std::{sync::Arc, time::Duration};

use anyhow::Error;
use axum::{
    Router,
    http::{
        HeaderName, Method,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod redeem;
pub mod routes;
pub mod sheets;
pub mod state;
pub mod utils;

use config::Config;
use routes::{
    add_comment_handler, cards_handler, click_handler, comments_handler, events_handler,
    health_handler, redeem_handler, redeem_status_handler, sheets_handler,
    special_sheets_handler, stats_handler,
};
use state::AppState;
use utils::CLIENT_ID_HEADER;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            CACHE_CONTROL,
            HeaderName::from_static(CLIENT_ID_HEADER),
        ])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/sheets", get(sheets_handler))
        .route("/api/sheets/special", get(special_sheets_handler))
        .route("/api/cards", get(cards_handler))
        .route("/api/redeem", get(redeem_status_handler).post(redeem_handler))
        .route("/api/prompts/{id}/clicks", post(click_handler))
        .route("/api/prompts/{id}/stats", get(stats_handler))
        .route(
            "/api/prompts/{id}/comments",
            get(comments_handler).post(add_comment_handler),
        )
        .route("/api/prompts/{id}/events", get(events_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).await?;

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    let app = router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
