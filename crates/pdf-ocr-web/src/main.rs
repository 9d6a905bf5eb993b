use std::sync::Arc;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

use pdf_ocr_core::Pipeline;
use pdf_ocr_mupdf::MupdfLibrary;
use pdf_ocr_tesseract::TesseractEngine;
use pdf_ocr_web::{AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let config = ServerConfig::from_env()?;

    let engine = TesseractEngine::new(&config.tesseract_cmd);
    match engine.version() {
        Ok(version) => tracing::info!(%version, "OCR engine available"),
        Err(e) => tracing::warn!(
            error = %e,
            "OCR engine unavailable; PDFs with embedded images will fail"
        ),
    }

    let state = Arc::new(AppState {
        pipeline: Pipeline::new(Arc::new(MupdfLibrary::new()), Arc::new(engine)),
    });
    let app = pdf_ocr_web::router(state, config.max_upload_bytes());

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, max_upload_mb = config.max_upload_mb, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
