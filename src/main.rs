use anyhow::{Context, Result};
use company_insights::analytics::{Dataset, GeoReference};
use company_insights::api::{build_router, AppState};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
struct Config {
    data_path: PathBuf,
    geojson_path: PathBuf,
    host: String,
    port: u16,
}

impl Config {
    fn from_env() -> Result<Self> {
        Ok(Config {
            data_path: env::var("OUTPUT_TABLE")
                .unwrap_or_else(|_| "company_information_full.csv".to_string())
                .into(),
            geojson_path: env::var("AUSTRALIA_GEOJSON")
                .unwrap_or_else(|_| "data/map/australian-states.json".to_string())
                .into(),
            host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("API_PORT")
                .unwrap_or_else(|_| "5050".to_string())
                .parse()
                .context("API_PORT must be a valid port number")?,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("📊 Starting company insights API server...");

    let config = Config::from_env()?;

    info!("📦 Loading company data from {:?}", config.data_path);
    let dataset = Dataset::load(&config.data_path)
        .with_context(|| format!("Failed to load company data from {:?}", config.data_path))?;
    let geo = GeoReference::load(&config.geojson_path)?;
    info!("✅ Loaded {} companies", dataset.len());

    let app = build_router(AppState::new(dataset, geo));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("API_HOST/API_PORT do not form a valid socket address")?;
    info!("🚀 Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
