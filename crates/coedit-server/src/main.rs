//! Binary entrypoint for the coedit lock server.
//!
//! Configuration is read from `COEDIT_*` environment variables; see
//! [`coedit_server::config`].

use coedit_server::config::ServerConfig;
use coedit_server::router::build_router;
use coedit_server::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env()?;
    let state = AppState::new(&config);
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(
        "coedit server starting on {} (lock ttl {:?}, sweep every {:?})",
        addr,
        config.lock_ttl,
        config.sweep_interval
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
