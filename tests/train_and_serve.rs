//! End-to-end: write a CSV, train from it, reload the artefacts from disk and
//! score through the router.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use tower::util::ServiceExt;

use cardiopredict::{
    api::{create_router, AppState},
    common::config::AppCfg,
    inference::{Feature, ServiceContext},
    training::{self, synthetic, ArtifactRepo, FsArtifactRepo},
};

const SAMPLE: &str = "age=63&sex=1&cp=3&trestbps=145&chol=233&fbs=1&restecg=0\
                      &thalach=150&exang=0&oldpeak=2.3&slope=0&ca=0&thal=1";

fn trained_cfg(dir: &std::path::Path) -> AppCfg {
    let data_path = dir.join("heart.csv");
    synthetic::write_csv(&synthetic::patients(240, 5), &data_path).expect("write csv");

    let mut cfg = AppCfg {
        data_path,
        model_dir: dir.join("model"),
        ..AppCfg::default()
    };
    cfg.training.forest.n_estimators = 20;
    cfg
}

async fn predict(ctx: ServiceContext) -> (StatusCode, serde_json::Value) {
    let app = create_router(AppState::new(ctx));
    let req = Request::builder()
        .method("POST")
        .uri("/predict_disease")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(SAMPLE))
        .expect("request");
    let response = app.oneshot(req).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, serde_json::from_slice(&body).expect("json"))
}

#[tokio::test]
async fn trained_artifacts_serve_predictions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = trained_cfg(dir.path());
    let repo = FsArtifactRepo::from_cfg(&cfg);

    let paths = training::service::run(&cfg, &repo).expect("train");
    assert!(paths.model.exists());
    assert!(paths.scaler.exists());
    assert!(paths.features.exists());

    let bundle = repo.load().expect("reload");
    let names: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();
    assert_eq!(bundle.feature_names(), names.as_slice());

    let ctx = ServiceContext::load(&repo);
    assert!(ctx.is_ready());

    let (status, json) = predict(ctx).await;
    assert_eq!(status, StatusCode::OK);
    let disease = json["probability"]["disease"].as_f64().expect("disease");
    assert!((0.0..=100.0).contains(&disease));
}

#[tokio::test]
async fn missing_artifacts_degrade_the_service() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = ServiceContext::load(&FsArtifactRepo::new(dir.path().join("absent")));
    assert!(!ctx.is_ready());

    let (status, json) = predict(ctx).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Model not loaded. Please train the model first.");
}

#[tokio::test]
async fn retraining_overwrites_previous_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = trained_cfg(dir.path());
    let repo = FsArtifactRepo::from_cfg(&cfg);
    training::service::run(&cfg, &repo).expect("first run");

    cfg.training.forest.n_estimators = 7;
    training::service::run(&cfg, &repo).expect("second run");

    let bundle = repo.load().expect("reload");
    assert_eq!(bundle.model.trees().len(), 7);
}
