//! The web form service.
//!
//! ```text
//! GET  /        → upload form
//! POST /upload  → multipart(title, author, format, file)
//!                   │
//!                   ├─ parse format        (400 "Formato inválido")
//!                   ├─ store upload        (uploads/<uuid>.docx)
//!                   ├─ wait for a slot     (semaphore, max_concurrent_conversions)
//!                   ├─ convert             (blocking pool, timeout_secs)
//!                   ├─ store output        (output/<uuid>.epub|pdf)
//!                   └─ 200 attachment      (<original name>.epub|pdf)
//! ```

mod error;
mod form;
mod handlers;
mod state;

pub use error::AppError;
pub use form::UPLOAD_FORM;
pub use state::AppState;

use crate::config::ServerConfig;
use crate::error::ConvertError;
use crate::storage::LocalStore;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = match state.config.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/", get(form::index))
        .route("/upload", post(handlers::upload))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the artifact directories, bind `0.0.0.0:<port>` and serve until
/// Ctrl-C or SIGTERM.
pub async fn serve(config: ServerConfig) -> Result<(), ConvertError> {
    let store = LocalStore::new(&config.upload_dir, &config.output_dir).await?;
    let addr = config.bind_addr();
    info!(
        "Storing uploads in {} and output in {}; {} concurrent conversion(s), {}s timeout",
        config.upload_dir.display(),
        config.output_dir.display(),
        config.max_concurrent_conversions,
        config.conversion.timeout_secs
    );

    let state = AppState::new(config, Arc::new(store));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ConvertError::Internal(format!("Failed to bind {addr}: {e}")))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ConvertError::Internal(format!("Server error: {e}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
