use super::*;
use crate::model::{LinearModel, LinearModelBundle, ModelMetadata};
use crate::percentile::ReferenceDistribution;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

fn state() -> AppState {
    let bundle = LinearModelBundle {
        coefficients: vec![0.5, 10.0, 100.0],
        intercept: 2.0,
        feature_names: vec![
            "datasets_size".to_string(),
            "auto".to_string(),
            "domain_vision".to_string(),
        ],
        baseline_domain: Some("nlp".to_string()),
        metadata: ModelMetadata::new(10),
    };
    let model = LinearModel::from_bundle(bundle).unwrap();
    let reference = ReferenceDistribution::new(vec![10.0, 20.0, 30.0, 40.0]).unwrap();
    AppState::new(PredictionContext::new(model, reference))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_index_banner() {
    let response = router(state())
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], BANNER.as_bytes());
}

#[tokio::test]
async fn test_health_reports_assets() {
    let response = router(state())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["reference_size"], 4);
    assert_eq!(json["features"][2], "domain_vision");
}

#[tokio::test]
async fn test_predict_numeric_dataset_size() {
    // 0.5 * 30 + 10 + 2 = 27 -> 2 of 4 below -> percentile 50
    let response = router(state())
        .oneshot(post_json(
            "/predict",
            json!({"datasetSize": 30, "domain": "nlp"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    let json = body_json(response).await;
    assert_eq!(json["prediction"], json!([27.0]));
    assert_eq!(json["colour_prediction"], "yellow");
}

#[tokio::test]
async fn test_predict_string_dataset_size() {
    let response = router(state())
        .oneshot(post_json(
            "/predict",
            json!({"datasetSize": "30", "domain": "vision"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["prediction"], json!([127.0]));
    assert_eq!(json["colour_prediction"], "red");
}

#[tokio::test]
async fn test_predict_unknown_domain_is_bad_request() {
    let response = router(state())
        .oneshot(post_json(
            "/predict",
            json!({"datasetSize": 30, "domain": "unknown_category"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("unknown_category"));
}

#[tokio::test]
async fn test_predict_rejects_bad_payloads() {
    for body in [
        json!({"domain": "nlp"}),
        json!({"datasetSize": "lots", "domain": "nlp"}),
        json!({"datasetSize": true, "domain": "nlp"}),
    ] {
        let response = router(state())
            .oneshot(post_json("/predict", body.clone()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let json = body_json(response).await;
        assert!(json["error"].is_string());
    }
}

#[tokio::test]
async fn test_cors_preflight() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/predict")
        .header("origin", "chrome-extension://ecolabel")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = router(state()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
    let methods = headers
        .get("access-control-allow-methods")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(methods.contains("POST"));
    assert!(methods.contains("OPTIONS"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_bare_options_has_empty_body() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/predict")
        .body(Body::empty())
        .unwrap();

    let response = router(state()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_proxy_fetches_content() {
    let upstream = Router::new().route("/page", get(|| async { "<html>co2</html>" }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let response = router(state())
        .oneshot(post_json(
            "/proxy",
            json!({"url": format!("http://{}/page", address)}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["content"], "<html>co2</html>");
}

#[tokio::test]
async fn test_proxy_failure_is_reported_in_band() {
    let response = router(state())
        .oneshot(post_json("/proxy", json!({"url": "not a url"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["error"].is_string());
    assert!(json.get("content").is_none());
}
