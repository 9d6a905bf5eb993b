use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod state;
pub mod upload;

pub use config::ServerConfig;
pub use error::AppError;
pub use state::AppState;

/// Build the application router.
///
/// CORS is wide open: any origin, method and header, with credentials. A
/// literal `*` cannot be combined with credentials, so the request's own
/// origin, method and headers are mirrored back instead.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    axum::Router::new()
        .route("/process-pdf/", post(handlers::process::process_pdf))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(state)
}
