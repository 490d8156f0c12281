/**
 * wazap Server Entry Point
 *
 * Loads configuration, opens the database, starts the background tasks and
 * serves the HTTP API.
 */

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use wazap::backend::server::config::load_config;
    use wazap::backend::server::{build_state, create_app, spawn_background_tasks};

    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let config = load_config()?;

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();
    tracing::info!("[STARTUP] Server initialization started");

    let port = config.server_port;
    let state = build_state(config).await?;
    let background = spawn_background_tasks(&state);
    let app = create_app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("[STARTUP] Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    for task in background {
        task.abort();
    }
    tracing::info!("Server stopped");
    Ok(())
}

#[cfg(not(feature = "ssr"))]
fn main() {
    eprintln!("Server requires the 'ssr' feature to be enabled.");
    eprintln!("Run with: cargo run --bin wazap-server --features ssr");
    std::process::exit(1);
}
