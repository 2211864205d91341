//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::OnceLock;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use tower::util::ServiceExt;

use super::*;
use crate::inference::domain::Feature;
use crate::training::domain::{ArtifactBundle, ForestConfig, TrainConfig};
use crate::training::{service::train, synthetic};

const SAMPLE: [(&str, &str); 13] = [
    ("age", "63"),
    ("sex", "1"),
    ("cp", "3"),
    ("trestbps", "145"),
    ("chol", "233"),
    ("fbs", "1"),
    ("restecg", "0"),
    ("thalach", "150"),
    ("exang", "0"),
    ("oldpeak", "2.3"),
    ("slope", "0"),
    ("ca", "0"),
    ("thal", "1"),
];

fn bundle() -> ArtifactBundle {
    static BUNDLE: OnceLock<ArtifactBundle> = OnceLock::new();
    BUNDLE
        .get_or_init(|| {
            let cfg = TrainConfig {
                forest: ForestConfig {
                    n_estimators: 25,
                    ..ForestConfig::default()
                },
                ..TrainConfig::default()
            };
            train(&synthetic::patients(200, 21), &cfg)
                .expect("train")
                .bundle
        })
        .clone()
}

fn ready_app() -> Router {
    let ctx = ServiceContext::from_bundle(bundle()).expect("ready");
    create_router(AppState::new(ctx))
}

fn degraded_app() -> Router {
    create_router(AppState::new(ServiceContext::Degraded {
        reason: "no artifacts".into(),
    }))
}

fn encode(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}={}", v.replace(' ', "+")))
        .collect::<Vec<_>>()
        .join("&")
}

fn form_request(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict_disease")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("request")
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(req).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, body.to_vec())
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder().uri(uri).body(Body::empty()).expect("request");
    let (status, body) = send(app, req).await;
    (status, String::from_utf8(body).expect("utf8"))
}

fn error_of(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorResponse>(body)
        .expect("error json")
        .error
}

#[tokio::test]
async fn test_static_pages_are_served() {
    for (uri, marker) in [
        ("/", "Start a prediction"),
        ("/predict", "name=\"thal\""),
        ("/about", "ensemble of decision trees"),
        ("/result", "predictionResult"),
    ] {
        let (status, body) = get(ready_app(), uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert!(body.contains(marker), "{uri}");
    }
}

#[tokio::test]
async fn test_unknown_route_falls_back_to_landing_page() {
    let (status, body) = get(ready_app(), "/no/such/page").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Start a prediction"));
}

#[tokio::test]
async fn test_health_reports_readiness() {
    let (_, body) = get(ready_app(), "/health").await;
    let health: HealthResponse = serde_json::from_str(&body).expect("json");
    assert!(health.ready);

    let (status, body) = get(degraded_app(), "/health").await;
    let health: HealthResponse = serde_json::from_str(&body).expect("json");
    assert_eq!(status, StatusCode::OK);
    assert!(!health.ready);
    assert_eq!(health.status, "degraded");
}

#[tokio::test]
async fn test_predict_sample_patient() {
    let (status, body) = send(ready_app(), form_request(encode(&SAMPLE))).await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
    let label = json["prediction"].as_u64().expect("prediction");
    assert!(label <= 1);
    let no = json["probability"]["no_disease"].as_f64().expect("no_disease");
    let yes = json["probability"]["disease"].as_f64().expect("disease");
    assert!((no + yes - 100.0).abs() < 1e-6);
    let expected_tier = if label == 1 { "High" } else { "Low" };
    assert_eq!(json["risk_level"], expected_tier);
    assert!(json["message"].as_str().expect("message").len() > 20);
}

#[tokio::test]
async fn test_predict_is_deterministic() {
    let (_, first) = send(ready_app(), form_request(encode(&SAMPLE))).await;
    let (_, second) = send(ready_app(), form_request(encode(&SAMPLE))).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_each_missing_field_is_a_400_naming_it() {
    for feature in Feature::ALL {
        let fields: Vec<_> = SAMPLE
            .iter()
            .copied()
            .filter(|(k, _)| *k != feature.name())
            .collect();
        let (status, body) = send(ready_app(), form_request(encode(&fields))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{feature}");
        assert_eq!(
            error_of(&body),
            format!("Missing required field: {}", feature.name())
        );
    }
}

#[tokio::test]
async fn test_empty_value_counts_as_missing() {
    let mut fields = SAMPLE.to_vec();
    fields[4] = ("chol", "");
    let (status, body) = send(ready_app(), form_request(encode(&fields))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "Missing required field: chol");
}

#[tokio::test]
async fn test_each_non_numeric_field_is_a_400_naming_it() {
    for (idx, feature) in Feature::ALL.into_iter().enumerate() {
        let mut fields = SAMPLE.to_vec();
        fields[idx] = (feature.name(), "twelve");
        let (status, body) = send(ready_app(), form_request(encode(&fields))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{feature}");
        assert_eq!(
            error_of(&body),
            format!("Invalid value for {}. Must be a number.", feature.name())
        );
    }
}

fn multipart_request(fields: &[(&str, &str)]) -> Request<Body> {
    let boundary = "cardio-boundary";
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));

    Request::builder()
        .method("POST")
        .uri("/predict_disease")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request")
}

#[tokio::test]
async fn test_multipart_form_is_scored_like_urlencoded() {
    let (status, multipart) = send(ready_app(), multipart_request(&SAMPLE)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, urlencoded) = send(ready_app(), form_request(encode(&SAMPLE))).await;
    assert_eq!(multipart, urlencoded);
}

#[tokio::test]
async fn test_multipart_missing_field_is_named() {
    let fields: Vec<_> = SAMPLE.iter().copied().filter(|(k, _)| *k != "ca").collect();
    let (status, body) = send(ready_app(), multipart_request(&fields)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "Missing required field: ca");
}

#[tokio::test]
async fn test_repeated_key_keeps_first_value() {
    let body = format!("{}&age=abc", encode(&SAMPLE));
    let (status, _) = send(ready_app(), form_request(body)).await;
    assert_eq!(status, StatusCode::OK);

    let body = format!("age=abc&{}", encode(&SAMPLE));
    let (status, body) = send(ready_app(), form_request(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body), "Invalid value for age. Must be a number.");
}

#[tokio::test]
async fn test_undecodable_body_is_reported_as_such() {
    let req = Request::builder()
        .method("POST")
        .uri("/predict_disease")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"age\": 63}"))
        .expect("request");
    let (status, body) = send(ready_app(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = error_of(&body);
    assert!(error.starts_with("Could not decode form data"), "{error}");
    assert!(!error.contains("Missing required field"));
}

#[tokio::test]
async fn test_degraded_service_always_returns_500() {
    for body in [encode(&SAMPLE), String::new(), "age=abc".to_string()] {
        let (status, resp) = send(degraded_app(), form_request(body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            error_of(&resp),
            "Model not loaded. Please train the model first."
        );
    }
}

#[test]
fn test_internal_errors_are_opaque() {
    let err = ApiError::Score(ScoreError::Internal(
        crate::common::error::CardioError::DimensionMismatch {
            expected: 13,
            got: 12,
        },
    ));
    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_internal_error_body_hides_details() {
    let response = ApiError::Score(ScoreError::Internal(
        crate::common::error::CardioError::NotFitted,
    ))
    .into_response();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(error_of(&body), "Prediction error");
}
