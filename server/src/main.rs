//! tablekit server: serves the tables listed in `TABLES_CONFIG`.
//!
//! Run from repo root: `cargo run -p tablekit-server`

use tablekit::{app, load_from_path, AppState, Settings, TableRegistry};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tablekit=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let config = load_from_path(&settings.tables_config).await?;
    let registry = TableRegistry::connect(&settings, &config).await?;
    let state = AppState::new(registry);

    let router = app(state, &settings);
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("tablekit listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await?;
    Ok(())
}
