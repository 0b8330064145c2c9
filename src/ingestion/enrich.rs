//! Enrichment jobs - resolve companies, fetch their profiles and logos, fill the table

use crate::ingestion::fetch::ProxycurlClient;
use crate::ingestion::types::{EnrichmentStatus, IngestionStats};
use crate::ingestion::utils::{flatten_json, http_get, image_extension};
use crate::ingestion::write::SheetTable;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const IMAGE_PATH_COLUMN: &str = "Image Path";

fn set_status(table: &mut SheetTable, row: usize, status: EnrichmentStatus, details: Option<String>) {
    table.set(row, "Status", Some(status.to_string()));
    let details = details.or_else(|| status.default_details().map(str::to_string));
    if details.is_some() {
        table.set(row, "Error Details", details);
    }
}

/// Enrich one company into `row`, returning the outcome
async fn enrich_company(
    client: &ProxycurlClient,
    table: &mut SheetTable,
    row: usize,
    company_name: &str,
) -> EnrichmentStatus {
    table.set(row, "Company Name", Some(company_name.to_string()));

    let company_url = match client.lookup_company_url(company_name).await {
        Ok(Some(url)) => url,
        Ok(None) => {
            error!("Could not find LinkedIn URL for {}", company_name);
            set_status(table, row, EnrichmentStatus::UrlNotFound, None);
            return EnrichmentStatus::UrlNotFound;
        }
        Err(e) => {
            error!("LinkedIn URL lookup failed for {}: {}", company_name, e);
            set_status(table, row, EnrichmentStatus::UrlNotFound, None);
            return EnrichmentStatus::UrlNotFound;
        }
    };

    table.set(row, "LinkedIn URL", Some(company_url.clone()));

    match client.fetch_company_profile(&company_url).await {
        Ok(profile) => {
            let flattened = flatten_json(&profile);
            if flattened.is_empty() {
                error!("Empty profile returned for {}", company_name);
                set_status(table, row, EnrichmentStatus::FetchFailed, None);
                return EnrichmentStatus::FetchFailed;
            }

            set_status(table, row, EnrichmentStatus::Fetched, None);
            for (key, value) in flattened {
                table.set(row, &key, value);
            }
            EnrichmentStatus::Fetched
        }
        Err(e) => {
            error!("Could not fetch information for {}: {}", company_name, e);
            let details = format!(
                "{} ({})",
                EnrichmentStatus::FetchFailed.default_details().unwrap_or_default(),
                e
            );
            set_status(table, row, EnrichmentStatus::FetchFailed, Some(details));
            EnrichmentStatus::FetchFailed
        }
    }
}

/// Enrich `company_names` serially, saving the table to `output` after every company
pub async fn enrich_companies(
    client: &ProxycurlClient,
    company_names: &[String],
    output: &Path,
) -> Result<(SheetTable, IngestionStats)> {
    info!("Enriching {} companies", company_names.len());

    let mut table = SheetTable::for_enrichment();
    let mut stats = IngestionStats::new();

    for company_name in company_names {
        info!("Processing: {}", company_name);

        let row = table.push_row();
        let status = enrich_company(client, &mut table, row, company_name).await;
        stats.record(status);

        table
            .save_csv(output)
            .with_context(|| format!("Failed to save progress to {:?}", output))?;
        info!("Updated information for {}", company_name);
    }

    info!("Enrichment complete: {}", stats);
    Ok((table, stats))
}

async fn fetch_logo(
    client: &ProxycurlClient,
    linkedin_url: &str,
    image_dir: &Path,
    row: usize,
) -> Result<Option<PathBuf>> {
    let Some(image_url) = client.fetch_profile_picture_url(linkedin_url).await? else {
        return Ok(None);
    };
    info!("Image URL found for company {}: {}", row, image_url);

    let bytes = http_get(client.http(), &image_url).await?;
    let image_path = image_dir.join(format!("{}{}", row, image_extension(&image_url)));
    fs::write(&image_path, &bytes)
        .with_context(|| format!("Failed to write image {:?}", image_path))?;

    Ok(Some(image_path))
}

/// Download each company's profile picture and record its path in the `Image Path` column
pub async fn attach_logos(
    client: &ProxycurlClient,
    table: &mut SheetTable,
    image_dir: &Path,
) -> Result<IngestionStats> {
    fs::create_dir_all(image_dir)
        .with_context(|| format!("Failed to create image directory {:?}", image_dir))?;
    table.ensure_column(IMAGE_PATH_COLUMN);

    info!("Total companies to process: {}", table.len());
    let mut stats = IngestionStats::new();

    for row in 0..table.len() {
        let Some(linkedin_url) = table.get(row, "LinkedIn URL").map(str::to_string) else {
            stats.skipped += 1;
            continue;
        };

        info!("Processing company {}: {}", row, linkedin_url);

        match fetch_logo(client, &linkedin_url, image_dir, row).await {
            Ok(Some(path)) => {
                info!("Image saved for company {}: {:?}", row, path);
                table.set(row, IMAGE_PATH_COLUMN, Some(path.to_string_lossy().into_owned()));
                stats.fetched += 1;
            }
            Ok(None) => {
                warn!("No image URL found in the response for company {}", row);
                stats.not_found += 1;
            }
            Err(e) => {
                error!("Error processing company {}: {}", row, e);
                stats.failed += 1;
            }
        }
    }

    info!(
        "Images found for {} out of {} companies",
        stats.fetched,
        table.len()
    );
    Ok(stats)
}
