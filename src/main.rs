mod config;
mod routes;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // A missing .env is the normal case outside local development.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::RelayConfig::from_env().expect("invalid relay configuration");

    let store = services::storage::UploadStore::open(&config.upload_dir)
        .await
        .expect("upload directory init failed");
    tracing::info!(dir = %config.upload_dir.display(), "upload store ready");

    let state = state::AppState::new(store, config.public_url.clone());

    let app = routes::app(state, config.max_upload_bytes);
    let listener = tokio::net::TcpListener::bind((config.bind_addr.as_str(), config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, public_url = %config.public_url, "slidechat relay listening");
    axum::serve(listener, app).await.expect("server failed");
}
