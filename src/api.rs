//! HTTP surface - read-only statistics endpoints over the loaded dataset

use crate::analytics::{geo, stats, Dataset, GeoReference};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::error;

pub const DEFAULT_TOP_N: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub geo: Arc<GeoReference>,
}

impl AppState {
    pub fn new(dataset: Dataset, geo: GeoReference) -> Self {
        Self {
            dataset: Arc::new(dataset),
            geo: Arc::new(geo),
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Company not found")]
    CompanyNotFound,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::CompanyNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Internal(msg) => {
                error!("Request failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Serialize, Deserialize)]
struct ApiResponse {
    message: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct TopQuery {
    n: Option<String>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/api/health", get(health_check))
        .route("/api/company_size_distribution", get(company_size_distribution))
        .route("/api/industry_breakdown", get(industry_breakdown))
        .route("/api/geographical_distribution", get(geographical_distribution))
        .route("/api/follower_count_analysis", get(follower_count_analysis))
        .route("/api/top_companies_by_followers", get(top_companies_by_followers))
        .route("/api/founded_year_timeline", get(founded_year_timeline))
        .route("/api/top_companies_followers", get(top_companies_followers))
        .route("/api/specialties_wordcloud", get(specialties_wordcloud))
        .route("/api/company_type_distribution", get(company_type_distribution))
        .route("/api/funding_analysis", get(funding_analysis))
        .route("/api/employee_follower_correlation", get(employee_follower_correlation))
        .route("/api/company_details/*company_name", get(company_details))
        .route("/api/company_names", get(company_names))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// A panicking handler answers like any other internal failure
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    ApiError::Internal(format!("handler panicked: {}", detail)).into_response()
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse> {
    Json(ApiResponse {
        message: format!("Company insights API serving {} companies", state.dataset.len()),
        status: "ok".to_string(),
    })
}

async fn company_size_distribution(State(state): State<AppState>) -> impl IntoResponse {
    Json(stats::company_size_distribution(&state.dataset))
}

async fn industry_breakdown(State(state): State<AppState>) -> impl IntoResponse {
    Json(stats::industry_breakdown(&state.dataset))
}

async fn geographical_distribution(State(state): State<AppState>) -> Result<Response, ApiError> {
    let distribution = geo::geographical_distribution(&state.dataset, &state.geo);
    let body = serde_json::to_value(&distribution).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(body).into_response())
}

async fn follower_count_analysis(State(state): State<AppState>) -> impl IntoResponse {
    Json(stats::follower_counts(&state.dataset))
}

async fn top_companies_by_followers(State(state): State<AppState>) -> impl IntoResponse {
    Json(stats::top_companies_by_followers(&state.dataset))
}

async fn founded_year_timeline(State(state): State<AppState>) -> impl IntoResponse {
    Json(stats::founded_year_timeline(&state.dataset))
}

/// `?n=` falls back to the default when missing or not an integer; negative means none
async fn top_companies_followers(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> impl IntoResponse {
    let n = query
        .n
        .and_then(|n| n.trim().parse::<i64>().ok())
        .map(|n| n.max(0) as usize)
        .unwrap_or(DEFAULT_TOP_N);
    Json(stats::top_companies_followers(&state.dataset, n))
}

async fn specialties_wordcloud(State(state): State<AppState>) -> impl IntoResponse {
    Json(stats::specialties_wordcloud(&state.dataset))
}

async fn company_type_distribution(State(state): State<AppState>) -> impl IntoResponse {
    Json(stats::company_type_distribution(&state.dataset))
}

async fn funding_analysis(State(state): State<AppState>) -> impl IntoResponse {
    Json(stats::funding_analysis(&state.dataset))
}

async fn employee_follower_correlation(State(state): State<AppState>) -> impl IntoResponse {
    Json(stats::employee_follower_correlation(&state.dataset))
}

async fn company_details(
    State(state): State<AppState>,
    Path(company_name): Path<String>,
) -> Result<Json<stats::CompanyDetails>, ApiError> {
    stats::company_details(&state.dataset, &company_name)
        .map(Json)
        .ok_or(ApiError::CompanyNotFound)
}

async fn company_names(State(state): State<AppState>) -> impl IntoResponse {
    Json(stats::company_names(&state.dataset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    async fn boom() -> StatusCode {
        panic!("bad row")
    }

    #[tokio::test]
    async fn test_panicking_handler_returns_internal_error() {
        let app: Router = Router::new()
            .route("/boom", get(boom))
            .layer(CatchPanicLayer::custom(handle_panic));

        let response = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({ "error": "Internal Server Error" }));
    }

    #[tokio::test]
    async fn test_company_not_found_response() {
        let response = ApiError::CompanyNotFound.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({ "error": "Company not found" }));
    }
}
