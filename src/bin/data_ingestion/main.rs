//! Data ingestion orchestrator - runs the enrichment, location and logo jobs

use anyhow::{Context, Result};
use company_insights::ingestion::fetch::{ClientSettings, ProxycurlClient, DEFAULT_BASE_URL};
use company_insights::ingestion::geocode::{
    survey_locations, surveys_to_table, GoogleMapsClient, DEFAULT_MAPS_URL,
};
use company_insights::ingestion::write::is_csv_path;
use company_insights::ingestion::{enrich, parse, IngestionStats};
use std::env;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    info!("Starting data ingestion pipeline");

    // Load configuration from environment
    let config = Config::from_env()?;
    info!("Configuration loaded");

    // Determine which jobs to run (from command line args or run all)
    let args: Vec<String> = env::args().collect();
    let jobs = if args.len() > 1 {
        args[1..].to_vec()
    } else {
        vec![
            "companies".to_string(),
            "logos".to_string(),
            "locations".to_string(),
        ]
    };

    for job in jobs {
        info!("Running job: {}", job);

        let result = match job.as_str() {
            "companies" => run_companies(&config).await,
            "logos" => run_logos(&config).await,
            "locations" => run_locations(&config).await,
            _ => {
                warn!("Unknown job: {}", job);
                continue;
            }
        };

        match result {
            Ok(stats) => info!("✓ {} completed: {}", job, stats),
            Err(e) => error!("✗ {} failed: {:#}", job, e),
        }
    }

    info!("Data ingestion pipeline complete");

    Ok(())
}

/// Look up and fetch every company in the input workbook
async fn run_companies(config: &Config) -> Result<IngestionStats> {
    info!("=== Company Enrichment ===");

    let api_key = config.proxycurl_key()?;
    info!("API Key: {}...", api_key.chars().take(5).collect::<String>());

    info!("Step 1/2: Reading company names...");
    let names = parse::read_company_names(&config.input_workbook, &config.input_sheet)?;
    let names = if config.limit_records > 0 {
        let limit = config.limit_records.min(names.len());
        warn!("Limiting to first {} companies (testing mode)", limit);
        names.into_iter().take(limit).collect()
    } else {
        names
    };

    info!("Step 2/2: Enriching companies...");
    let client = ProxycurlClient::new(ClientSettings {
        base_url: config.proxycurl_url.clone(),
        ..ClientSettings::company_data(api_key)
    })?;
    let (_, stats) = enrich::enrich_companies(&client, &names, &config.output_table).await?;

    info!(
        "Process completed. Final results saved in {:?}",
        config.output_table
    );
    Ok(stats)
}

/// Download profile pictures for every enriched company
async fn run_logos(config: &Config) -> Result<IngestionStats> {
    info!("=== Company Logos ===");

    let api_key = config.proxycurl_key()?;
    let mut table = parse::load_table(&config.output_table)
        .with_context(|| format!("Run the companies job first to create {:?}", config.output_table))?;

    let client = ProxycurlClient::new(ClientSettings {
        base_url: config.proxycurl_url.clone(),
        ..ClientSettings::profile_pictures(api_key)
    })?;
    let stats = enrich::attach_logos(&client, &mut table, &config.image_dir).await?;

    table.save_csv(&config.output_table)?;
    info!("Updated table saved: {:?}", config.output_table);
    Ok(stats)
}

/// Geocode the location survey companies and count nearby places
async fn run_locations(config: &Config) -> Result<IngestionStats> {
    info!("=== Location Survey ===");

    let api_key = config
        .google_api_key
        .clone()
        .context("GOOGLE_API_KEY must be set for the locations job")?;
    let names = parse::read_company_names(&config.locations_input, &config.input_sheet)?;

    let client = GoogleMapsClient::new(config.maps_url.clone(), api_key)?;
    let surveys = survey_locations(&client, &names, config.location_workers).await;

    surveys_to_table(&surveys).save_csv(&config.locations_output)?;
    info!("Location survey saved to {:?}", config.locations_output);

    let mut stats = IngestionStats::new();
    stats.fetched = surveys.len();
    stats.not_found = names.len() - surveys.len();
    Ok(stats)
}

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
struct Config {
    proxycurl_api: Option<String>,
    proxycurl_url: String,
    google_api_key: Option<String>,
    maps_url: String,
    input_workbook: PathBuf,
    input_sheet: String,
    output_table: PathBuf,
    locations_input: PathBuf,
    locations_output: PathBuf,
    location_workers: usize,
    image_dir: PathBuf,
    limit_records: usize, // 0 = no limit
}

impl Config {
    fn from_env() -> Result<Self> {
        let config = Config {
            proxycurl_api: env::var("PROXYCURL_API").ok().filter(|k| !k.is_empty()),
            proxycurl_url: env::var("PROXYCURL_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            google_api_key: env::var("GOOGLE_API_KEY").ok().filter(|k| !k.is_empty()),
            maps_url: env::var("GOOGLE_MAPS_URL").unwrap_or_else(|_| DEFAULT_MAPS_URL.to_string()),

            input_workbook: env::var("INPUT_WORKBOOK")
                .unwrap_or_else(|_| "busa3021.xlsx".to_string())
                .into(),
            input_sheet: env::var("INPUT_SHEET").unwrap_or_else(|_| "Sheet2".to_string()),
            output_table: env::var("OUTPUT_TABLE")
                .unwrap_or_else(|_| "company_information_full.csv".to_string())
                .into(),

            locations_input: env::var("LOCATIONS_INPUT")
                .unwrap_or_else(|_| "location_companies.csv".to_string())
                .into(),
            locations_output: env::var("LOCATIONS_OUTPUT")
                .unwrap_or_else(|_| "company_locations.csv".to_string())
                .into(),
            location_workers: env::var("LOCATION_WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .context("LOCATION_WORKERS must be a valid number")?,

            image_dir: env::var("IMAGE_DIR")
                .unwrap_or_else(|_| "company_images".to_string())
                .into(),

            limit_records: env::var("LIMIT_RECORDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        };

        for (var, path) in [
            ("OUTPUT_TABLE", &config.output_table),
            ("LOCATIONS_OUTPUT", &config.locations_output),
        ] {
            if !is_csv_path(path) {
                anyhow::bail!("{} must name a .csv file, got {:?}", var, path);
            }
        }

        Ok(config)
    }

    fn proxycurl_key(&self) -> Result<String> {
        self.proxycurl_api
            .clone()
            .context("PROXYCURL_API must be set in .env file")
    }
}
