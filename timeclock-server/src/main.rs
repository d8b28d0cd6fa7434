//! Timeclock Server - REST API for verified attendance tracking
//!
//! Records geofenced, ceremony-verified clock-ins and clock-outs and serves
//! worked-hours reports.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use timeclock_server::{create_router_with_config, AppState, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("timeclock_server=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let state = AppState::from_env().await?;
    let app = create_router_with_config(state, &config);

    let addr = config.socket_addr();
    tracing::info!(%addr, "timeclock-server listening");
    tracing::info!("API documentation at http://{}/docs", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
