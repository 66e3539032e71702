use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use image::{ImageBuffer, ImageFormat, Rgb};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use sustain_ai::adapters::dense::DenseRegressor;
use sustain_ai::adapters::encoder::LabelEncoder;
use sustain_ai::adapters::forecast::TrendForecaster;
use sustain_ai::adapters::gbdt::TreeEnsembleRegressor;
use sustain_ai::adapters::tables::{FeatureColumns, FeatureImportance};
use sustain_ai::config::toml_config::ServerConfig;
use sustain_ai::core::gateway::Slot;
use sustain_ai::domain::model::{ImagePrediction, ImageTensor, SentimentLabel, SentimentResult};
use sustain_ai::domain::ports::Predictor;
use sustain_ai::{build_router, InferenceService, ModelRegistry, Result};
use tower::ServiceExt;

struct FakeImageClassifier;

#[async_trait]
impl Predictor for FakeImageClassifier {
    type Input = ImageTensor;
    type Output = Vec<ImagePrediction>;

    async fn predict(&self, input: &ImageTensor) -> Result<Vec<ImagePrediction>> {
        assert_eq!((input.width, input.height), (224, 224));
        assert_eq!(input.data.len(), 224 * 224 * 3);
        Ok(["banana", "lemon", "orange"]
            .iter()
            .zip([0.7, 0.2, 0.05])
            .map(|(label, confidence)| ImagePrediction {
                description: label.to_string(),
                confidence,
            })
            .collect())
    }
}

struct FixedSentiment(SentimentResult);

#[async_trait]
impl Predictor for FixedSentiment {
    type Input = str;
    type Output = SentimentResult;

    async fn predict(&self, _input: &str) -> Result<SentimentResult> {
        Ok(self.0)
    }
}

fn forecaster() -> TrendForecaster {
    TrendForecaster::from_json_str(
        r#"{
            "history_start": "2024-01-01",
            "history_end": "2024-06-30",
            "y_scale": 40.0,
            "trend": {"k": 0.2, "m": 0.5},
            "seasonalities": [{"name": "weekly", "period": 7.0, "coefficients": [0.05, 0.02]}],
            "sigma": 0.08
        }"#,
    )
    .unwrap()
}

fn traffic_model() -> TreeEnsembleRegressor {
    // 短途預測不到一分鐘，用來驗證 60 秒下限
    TreeEnsembleRegressor::from_json_str(
        r#"{
            "base_score": 0.0,
            "n_features": 5,
            "trees": [{"nodes": [
                {"feature": 1, "threshold": 5.0, "left": 1, "right": 2},
                {"leaf": 0.5},
                {"leaf": 14.0}
            ]}]
        }"#,
    )
    .unwrap()
}

fn food_columns() -> Vec<String> {
    ["Number of Guests", "Quantity of Food", "Type of Food_Meat", "Pricing_High"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn full_registry() -> ModelRegistry {
    ModelRegistry {
        image_classifier: Slot::Loaded(Arc::new(FakeImageClassifier)),
        donation_forecaster: Slot::Loaded(Arc::new(forecaster())),
        request_forecaster: Slot::Loaded(Arc::new(forecaster())),
        traffic_model: Slot::Loaded(Arc::new(traffic_model())),
        weather_encoder: Slot::Loaded(Arc::new(
            LabelEncoder::new(vec!["Clear".into(), "Clouds".into(), "Rain".into()]).unwrap(),
        )),
        vehicle_encoder: Slot::Loaded(Arc::new(
            LabelEncoder::new(vec!["Bike".into(), "Car".into(), "Truck".into()]).unwrap(),
        )),
        food_quantity_model: Slot::Loaded(Arc::new(
            DenseRegressor::from_json_str(
                r#"{"layers": [{"weights": [[2.0], [0.0], [5.0], [1.0]], "bias": [3.0]}]}"#,
            )
            .unwrap(),
        )),
        food_waste_model: Slot::Loaded(Arc::new(
            DenseRegressor::from_json_str(
                r#"{"layers": [{"weights": [[-1.0], [-1.0], [0.0], [0.0]], "bias": [0.0]}]}"#,
            )
            .unwrap(),
        )),
        feature_columns: Slot::Loaded(Arc::new(FeatureColumns::new(food_columns()).unwrap())),
        feature_importance: Slot::Loaded(Arc::new(
            FeatureImportance::from_csv_str("feature,importance\nPricing_High,0.1\nNumber of Guests,0.6\n")
                .unwrap(),
        )),
        ..Default::default()
    }
}

fn router(registry: ModelRegistry) -> Router {
    build_router(InferenceService::new(registry), &ServerConfig::default()).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn food_payload() -> Value {
    json!({
        "Number of Guests": 100,
        "Type of Food": "Meat",
        "Event Type": "Corporate",
        "Storage Conditions": "Refrigerated",
        "Purchase History": "Regular",
        "Seasonality": "All Seasons",
        "Preparation Method": "Buffet",
        "Geographical Location": "Urban",
        "Pricing": "Low"
    })
}

fn multipart_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let boundary = "sustainboundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n").as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn png_bytes() -> Vec<u8> {
    let img = ImageBuffer::from_pixel(32, 16, Rgb([250u8, 220, 40]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
    bytes
}

#[tokio::test]
async fn test_health_reports_artifact_states() {
    let (status, body) = send(&router(ModelRegistry::default()), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["artifacts"]["traffic_model"], "not_configured");

    let (_, body) = send(&router(full_registry()), get("/health")).await;
    assert_eq!(body["artifacts"]["traffic_model"], "loaded");
    assert_eq!(body["artifacts"]["sentiment_classifier"], "not_configured");
}

#[tokio::test]
async fn test_satisfaction_scores() {
    let app = router(ModelRegistry::default());

    let (status, body) = send(&app, post_json("/compute_satisfaction", json!({"rating": 1, "comment": "late"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["satisfactionScore"], 20);

    let registry = ModelRegistry {
        sentiment_classifier: Slot::Loaded(Arc::new(FixedSentiment(SentimentResult {
            label: SentimentLabel::Positive,
            score: 1.0,
        }))),
        ..Default::default()
    };
    let (status, body) = send(
        &router(registry),
        post_json("/compute_satisfaction", json!({"rating": 5, "comment": "Fresh and on time"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["satisfactionScore"], 100);
}

#[tokio::test]
async fn test_satisfaction_rejects_bad_input() {
    let app = router(ModelRegistry::default());

    let (status, body) = send(&app, post_json("/compute_satisfaction", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields: rating, comment");

    for payload in [
        json!({"rating": "5", "comment": "ok"}),
        json!({"rating": true, "comment": "ok"}),
        json!({"rating": 6, "comment": "ok"}),
        json!({"rating": 3, "comment": "   "}),
    ] {
        let (status, body) = send(&app, post_json("/compute_satisfaction", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_malformed_bodies_get_json_errors() {
    let app = router(full_registry());

    let request = Request::builder()
        .method("POST")
        .uri("/predict_duration")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));

    let (status, body) = send(&app, post_json("/predict_duration", json!([1, 2, 3]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Request body must be a JSON object");
}

#[tokio::test]
async fn test_forecast_days_handling() {
    let app = router(full_registry());

    let (status, body) = send(&app, get("/forecast/donations")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 30);
    assert_eq!(rows[0]["ds"], "2024-07-01");
    assert!(rows[0]["yhat_lower"].as_f64().unwrap() <= rows[0]["yhat"].as_f64().unwrap());

    let (status, body) = send(&app, get("/forecast/requests?days=7")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 7);

    for days in ["0", "-3", "abc"] {
        let (status, _) = send(&app, get(&format!("/forecast/donations?days={days}"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "days={days}");
    }
}

#[tokio::test]
async fn test_forecast_unavailable_regardless_of_days() {
    let app = router(ModelRegistry::default());
    for uri in ["/forecast/donations?days=0", "/forecast/donations?days=-1", "/forecast/donations?days=5"] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Donation forecast model not loaded");
    }
}

#[tokio::test]
async fn test_predict_duration() {
    let app = router(full_registry());

    let (status, body) = send(
        &app,
        post_json(
            "/predict_duration",
            json!({"distance": 10, "osrmDuration": 600, "hour": 8, "weather": "clear", "vehicleType": "CAR"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // 10 分鐘 → 第二片葉子 14 分鐘
    assert_eq!(body["predictedDuration"], 840.0);

    let (status, body) = send(
        &app,
        post_json(
            "/predict_duration",
            json!({"distance": "0.4", "osrmDuration": "120", "hour": "23", "weather": "Rain", "vehicleType": "bike"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predictedDuration"], 60.0);
}

#[tokio::test]
async fn test_predict_duration_errors() {
    let app = router(full_registry());

    let (status, body) = send(&app, post_json("/predict_duration", json!({"distance": 3, "hour": 4}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields: osrmDuration, weather, vehicleType");

    let (status, body) = send(
        &app,
        post_json(
            "/predict_duration",
            json!({"distance": 3, "osrmDuration": 300, "hour": 4, "weather": "snow", "vehicleType": "Car"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Snow"));
    assert!(message.contains("Clear, Clouds, Rain"));

    let (status, body) = send(
        &router(ModelRegistry::default()),
        post_json("/predict_duration", json!({"distance": 3})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Traffic prediction model not loaded");
}

#[tokio::test]
async fn test_food_demand_and_waste() {
    let app = router(full_registry());

    let (status, body) = send(&app, post_json("/forecast_food_demand", food_payload())).await;
    assert_eq!(status, StatusCode::OK);
    // 2 * 100 + 5 (Type of Food_Meat) + 3; Pricing_Low is not a known column
    assert_eq!(body["predictedQuantity"], 208.0);

    let mut waste = food_payload();
    waste["Quantity of Food"] = json!(450);
    let (status, body) = send(&app, post_json("/predict_food_waste", waste)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predictedWaste"], 0.0);

    let (status, body) = send(&app, post_json("/predict_food_waste", food_payload())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields: Quantity of Food");

    let mut bad = food_payload();
    bad["Number of Guests"] = json!("many");
    let (status, body) = send(&app, post_json("/forecast_food_demand", bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid numerical inputs"));
}

#[tokio::test]
async fn test_waste_factors() {
    let (status, body) = send(&router(full_registry()), get("/waste-factors")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"Number of Guests": 0.6, "Pricing_High": 0.1}));

    let (status, body) = send(&router(ModelRegistry::default()), get("/waste-factors")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Feature importance data not loaded");
}

#[tokio::test]
async fn test_analyze_image_upload() {
    let app = router(full_registry());

    let (status, body) = send(&app, multipart_request("file", "fruit.png", &png_bytes())).await;
    assert_eq!(status, StatusCode::OK);
    let predictions = body.as_array().unwrap();
    assert_eq!(predictions.len(), 3);
    assert_eq!(predictions[0]["description"], "banana");

    let (status, body) = send(&app, multipart_request("photo", "fruit.png", &png_bytes())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");

    let (status, body) = send(&app, multipart_request("file", "notes.txt", b"plain text")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Failed to process image"));

    let (status, body) = send(&app, post_json("/analyze", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");
}

#[tokio::test]
async fn test_cors_allows_only_configured_origin() {
    let app = router(ModelRegistry::default());

    let preflight = |origin: &str| {
        Request::builder()
            .method("OPTIONS")
            .uri("/compute_satisfaction")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(preflight("http://localhost:5173")).await.unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:5173"
    );

    let response = app.clone().oneshot(preflight("http://evil.example")).await.unwrap();
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
