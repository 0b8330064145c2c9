//! Integration tests for the statistics API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use company_insights::analytics::{Dataset, GeoReference};
use company_insights::api::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

const COMPANY_TABLE: &str = "\
name,industry,follower_count,company_size_on_linkedin,founded_year,locations,specialities,Image Path
Canva,Software,1500,3000,2012,\"[{\"\"country\"\":\"\"AU\"\",\"\"state\"\":\"\"NSW\"\"},{\"\"country\"\":\"\"US\"\"}]\",\"design, software\",company_images/0.png
Atlassian,Software,3000,10000,2002,\"[{\"\"country\"\":\"\"AU\"\",\"\"state\"\":\"\"New South Wales,\"\"}]\",\"software, collaboration\",company_images/1.png
Café & Co,Hospitality,,20,,,,
";

/// Test helper: load a small company table from disk and build the router over it
fn create_test_app() -> Router {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("companies.csv");
    std::fs::write(&path, COMPANY_TABLE).expect("Failed to write company table");

    let dataset = Dataset::load(&path).expect("Failed to load company table");
    build_router(AppState::new(dataset, GeoReference::builtin()))
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (status, body) = get_json(create_test_app(), "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_company_size_distribution() {
    let (status, body) = get_json(create_test_app(), "/api/company_size_distribution").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"Large (500+)": 2, "Micro (< 30)": 1}));
}

#[tokio::test]
async fn test_geographical_distribution_shape() {
    let (status, body) = get_json(create_test_app(), "/api/geographical_distribution").await;

    assert_eq!(status, StatusCode::OK);

    let countries = body["countries"].as_array().unwrap();
    assert_eq!(countries.len(), 2);
    assert_eq!(
        countries[0],
        json!({
            "country": "Australia",
            "company_count": 2,
            "avg_follower_count": 2250,
            "avg_company_size": 6500,
            "median_founding_year": 2007
        })
    );
    assert_eq!(countries[1]["country"], "United States");
    assert_eq!(countries[1]["company_count"], 1);

    let states = body["australia_states"].as_array().unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0]["state_code"], "1");
    assert_eq!(states[0]["state_name"], "New South Wales");
    assert_eq!(states[0]["company_count"], 2);

    assert_eq!(body["australia_geojson"]["type"], "FeatureCollection");
    assert_eq!(body["australia_geojson"]["features"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_top_companies_followers_query() {
    let (_, body) = get_json(create_test_app(), "/api/top_companies_followers?n=1").await;
    assert_eq!(body, json!([{"name": "Atlassian", "follower_count": 3000}]));

    // Unparseable n falls back to the default of 10
    let (status, body) = get_json(create_test_app(), "/api/top_companies_followers?n=abc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = get_json(create_test_app(), "/api/top_companies_followers?n=-3").await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_company_details_decodes_name() {
    let (status, body) =
        get_json(create_test_app(), "/api/company_details/Caf%C3%A9%20%26%20Co").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Café & Co");
    assert_eq!(body["follower_count"], Value::Null);
    assert_eq!(body["avg_follower_count"], 2250);
    assert_eq!(body["company_size"], 20);
    assert_eq!(body["num_specialties"], 0);
    assert_eq!(body["Image_Path"], Value::Null);
}

#[tokio::test]
async fn test_company_details_not_found() {
    let (status, body) = get_json(create_test_app(), "/api/company_details/Nobody").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Company not found"}));
}

#[tokio::test]
async fn test_company_names_skip_blanks() {
    let (_, body) = get_json(create_test_app(), "/api/company_names").await;

    assert_eq!(body, json!(["Canva", "Atlassian", "Café & Co"]));
}
