//! Quality API client tests against a mock HTTP server
//!
//! Covers the request shape (paths, API key header, JSON body) and how
//! non-2xx answers, unreachable servers and bad bodies surface as errors.

use pallet_worker::analysis::StubAnalyzer;
use pallet_worker::api::client::API_KEY_HEADER;
use pallet_worker::api::{HttpQualityApi, QualityApi};
use pallet_worker::error::ApiError;
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer) -> HttpQualityApi {
    let base = Url::parse(&format!("{}/api/v1", server.uri())).unwrap();
    HttpQualityApi::new(base, "test-api-key".to_string(), None).unwrap()
}

#[tokio::test]
async fn test_fetch_sends_api_key_and_returns_body() {
    let server = MockServer::start().await;
    let data = json!({"images": ["top.jpg", "side.jpg"], "weight_kg": 412.5});

    Mock::given(method("GET"))
        .and(path("/api/v1/pallets/P1/data"))
        .and(header(API_KEY_HEADER, "test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(data.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let fetched = api_for(&server).fetch_pallet_data("P1").await.unwrap();
    assert_eq!(fetched.into_inner(), data);
}

#[tokio::test]
async fn test_fetch_accepts_any_json_value() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pallets/P1/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2, 3])))
        .mount(&server)
        .await;

    let fetched = api_for(&server).fetch_pallet_data("P1").await.unwrap();
    assert_eq!(fetched.as_value(), &json!([1, 2, 3]));
}

#[tokio::test]
async fn test_fetch_not_found_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pallets/P2/data"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = api_for(&server).fetch_pallet_data("P2").await.unwrap_err();

    assert_eq!(err.pallet_id, "P2");
    assert_eq!(err.source.status(), Some(StatusCode::NOT_FOUND));
    assert!(err.to_string().contains("Failed to fetch data for pallet P2"));
}

#[tokio::test]
async fn test_fetch_invalid_json_is_body_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pallets/P1/data"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = api_for(&server).fetch_pallet_data("P1").await.unwrap_err();
    assert!(matches!(err.source, ApiError::InvalidBody { .. }));
}

#[tokio::test]
async fn test_fetch_unreachable_server_is_request_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let base = Url::parse(&format!("http://127.0.0.1:{port}/api/v1")).unwrap();
    let api = HttpQualityApi::new(base, "k".to_string(), Some(Duration::from_secs(2))).unwrap();

    let err = api.fetch_pallet_data("P1").await.unwrap_err();
    assert!(matches!(err.source, ApiError::Request { .. }));
    assert_eq!(err.source.status(), None);
}

#[tokio::test]
async fn test_fetch_timeout_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let base = Url::parse(&server.uri()).unwrap();
    let api =
        HttpQualityApi::new(base, "k".to_string(), Some(Duration::from_millis(200))).unwrap();

    let err = api.fetch_pallet_data("P1").await.unwrap_err();
    assert!(err.source.is_timeout());
}

#[tokio::test]
async fn test_pallet_id_is_a_single_encoded_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pallets/A%2FB%20C/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(api_for(&server).fetch_pallet_data("A/B C").await.is_ok());
}

#[tokio::test]
async fn test_submit_posts_result_json() {
    let server = MockServer::start().await;
    let result = StubAnalyzer::instant().fixed_result();

    Mock::given(method("POST"))
        .and(path("/api/v1/pallets/P1/results"))
        .and(header(API_KEY_HEADER, "test-api-key"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "custom_model_version": "1.2.3",
            "detected_products": [
                {"name": "Industrial Widget A", "quantity": 15, "confidence": 0.95},
                {"name": "Industrial Widget B", "quantity": 10, "confidence": 0.89}
            ],
            "quality_check": {"status": "PASS", "anomalies_detected": 0}
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    api_for(&server).submit_results("P1", &result).await.unwrap();
}

#[tokio::test]
async fn test_submit_server_error_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/pallets/P3/results"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = api_for(&server)
        .submit_results("P3", &StubAnalyzer::instant().fixed_result())
        .await
        .unwrap_err();

    assert_eq!(err.source.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(err.to_string().contains("Failed to submit results for pallet P3"));
}
