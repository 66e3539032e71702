use crate::app::server::AppState;
use crate::core::gateway::ArtifactState;
use crate::domain::model::{FoodTarget, ForecastRow, ForecastSeries, ImagePrediction};
use crate::utils::error::ServiceError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

type ApiResult<T> = Result<Json<T>, ServiceError>;

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub days: Option<String>,
}

/// Body rejections become `{"error": ...}` 400s instead of framework text.
fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ServiceError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ServiceError::invalid_input(format!("Invalid JSON body: {}", rejection.body_text())))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let artifacts: BTreeMap<&str, ArtifactState> = state.service.artifact_status().into_iter().collect();
    Json(json!({
        "status": "ok",
        "artifacts": artifacts,
        "max_upload_bytes": state.max_upload_bytes,
    }))
}

pub async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Vec<ImagePrediction>> {
    let no_file = || ServiceError::invalid_input("No file provided");
    let mut multipart = multipart.map_err(|_| no_file())?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::invalid_input(format!("Failed to process image: {}", e)))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServiceError::invalid_input(format!("Failed to process image: {}", e)))?;
            upload = Some(bytes);
            break;
        }
    }

    let bytes = upload.ok_or_else(no_file)?;
    Ok(Json(state.service.analyze_image(&bytes).await?))
}

async fn forecast(state: AppState, series: ForecastSeries, query: ForecastQuery) -> ApiResult<Vec<ForecastRow>> {
    Ok(Json(state.service.forecast(series, query.days.as_deref()).await?))
}

pub async fn forecast_donations(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> ApiResult<Vec<ForecastRow>> {
    forecast(state, ForecastSeries::Donations, query).await
}

pub async fn forecast_requests(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> ApiResult<Vec<ForecastRow>> {
    forecast(state, ForecastSeries::Requests, query).await
}

pub async fn predict_duration(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let payload = json_body(payload)?;
    let seconds = state.service.predict_duration(&payload).await?;
    Ok(Json(json!({ "predictedDuration": seconds })))
}

pub async fn compute_satisfaction(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let payload = json_body(payload)?;
    let score = state.service.compute_satisfaction(&payload).await?;
    Ok(Json(json!({ "satisfactionScore": score })))
}

pub async fn forecast_food_demand(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let payload = json_body(payload)?;
    let quantity = state.service.predict_food(FoodTarget::Quantity, &payload).await?;
    Ok(Json(json!({ "predictedQuantity": quantity })))
}

pub async fn predict_food_waste(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let payload = json_body(payload)?;
    let waste = state.service.predict_food(FoodTarget::Waste, &payload).await?;
    Ok(Json(json!({ "predictedWaste": waste })))
}

pub async fn waste_factors(State(state): State<AppState>) -> ApiResult<BTreeMap<String, f64>> {
    Ok(Json(state.service.waste_factors()?))
}
