//! Request payload validation.
//!
//! Every validator first collects all missing required fields, then checks
//! the remaining fields and reports every offending one together.

use crate::core::normalizer::title_case;
use crate::domain::model::{DurationInput, FoodDemandInput, FoodTarget, SatisfactionInput};
use crate::domain::ports::CategoryEncoder;
use crate::utils::error::{FieldError, Result, ServiceError};
use serde_json::{Map, Value};

pub const DURATION_FIELDS: [&str; 5] = ["distance", "osrmDuration", "hour", "weather", "vehicleType"];

pub const SATISFACTION_FIELDS: [&str; 2] = ["rating", "comment"];

pub const GUESTS_FIELD: &str = "Number of Guests";
pub const QUANTITY_FIELD: &str = "Quantity of Food";

pub const FOOD_CATEGORICAL_FIELDS: [&str; 8] = [
    "Type of Food",
    "Event Type",
    "Storage Conditions",
    "Purchase History",
    "Seasonality",
    "Preparation Method",
    "Geographical Location",
    "Pricing",
];

pub const DEFAULT_FORECAST_DAYS: u32 = 30;
pub const MAX_FORECAST_DAYS: u32 = 3650;

pub fn as_object(payload: &Value) -> Result<&Map<String, Value>> {
    payload
        .as_object()
        .ok_or_else(|| ServiceError::invalid_input("Request body must be a JSON object"))
}

pub fn missing_fields(payload: &Map<String, Value>, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|field| !payload.contains_key(**field))
        .map(|field| field.to_string())
        .collect()
}

pub fn require_fields(payload: &Map<String, Value>, required: &[&str]) -> Result<()> {
    let fields = missing_fields(payload, required);
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::MissingFields { fields })
    }
}

fn finish<T>(errors: Vec<FieldError>, value: impl FnOnce() -> T) -> Result<T> {
    if errors.is_empty() {
        Ok(value())
    } else {
        Err(ServiceError::InvalidFields { errors })
    }
}

/// Accepts JSON numbers and numeric strings.
fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Integers, integer strings, or floats truncated toward zero.
fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn check_category(
    field: &str,
    display: &str,
    raw: &Value,
    encoder: &dyn CategoryEncoder,
    errors: &mut Vec<FieldError>,
) -> String {
    let Some(text) = raw.as_str() else {
        errors.push(FieldError::new(field, "Invalid input format: expected a string"));
        return String::new();
    };

    let label = title_case(text);
    if encoder.encode(&label).is_none() {
        errors.push(FieldError::new(
            field,
            format!(
                "Invalid {} value: \"{}\". Expected one of: {}",
                display,
                label,
                encoder.classes().join(", ")
            ),
        ));
    }
    label
}

pub fn validate_duration(
    payload: &Value,
    weather: &dyn CategoryEncoder,
    vehicle: &dyn CategoryEncoder,
) -> Result<DurationInput> {
    let payload = as_object(payload)?;
    require_fields(payload, &DURATION_FIELDS)?;

    let mut errors = Vec::new();

    let distance = coerce_f64(&payload["distance"]);
    match distance {
        None => errors.push(FieldError::new("distance", "Invalid input format: expected a number")),
        Some(d) if d <= 0.0 => errors.push(FieldError::new("distance", "Distance must be positive")),
        Some(_) => {}
    }

    let osrm = coerce_f64(&payload["osrmDuration"]);
    match osrm {
        None => errors.push(FieldError::new(
            "osrmDuration",
            "Invalid input format: expected a number",
        )),
        Some(d) if d <= 0.0 => errors.push(FieldError::new(
            "osrmDuration",
            "OSRM duration must be positive",
        )),
        Some(_) => {}
    }

    let hour = coerce_int(&payload["hour"]);
    match hour {
        None => errors.push(FieldError::new("hour", "Invalid input format: expected an integer")),
        Some(h) if !(0..=23).contains(&h) => {
            errors.push(FieldError::new("hour", "Hour must be between 0 and 23"))
        }
        Some(_) => {}
    }

    let weather_label = check_category("weather", "weather", &payload["weather"], weather, &mut errors);
    let vehicle_label = check_category(
        "vehicleType",
        "vehicle type",
        &payload["vehicleType"],
        vehicle,
        &mut errors,
    );

    finish(errors, || DurationInput {
        distance_km: distance.unwrap_or_default(),
        osrm_duration_seconds: osrm.unwrap_or_default(),
        hour: hour.unwrap_or_default(),
        weather: weather_label,
        vehicle_type: vehicle_label,
    })
}

pub fn validate_satisfaction(payload: &Value) -> Result<SatisfactionInput> {
    let payload = as_object(payload)?;
    require_fields(payload, &SATISFACTION_FIELDS)?;

    let mut errors = Vec::new();

    // 布林值與字串都不算數字
    let rating = payload["rating"]
        .as_f64()
        .filter(|r| r.is_finite() && (1.0..=5.0).contains(r));
    if rating.is_none() {
        errors.push(FieldError::new(
            "rating",
            "Rating must be a number between 1 and 5",
        ));
    }

    let comment = payload["comment"]
        .as_str()
        .filter(|c| !c.trim().is_empty());
    if comment.is_none() {
        errors.push(FieldError::new("comment", "Comment must be a non-empty string"));
    }

    finish(errors, || SatisfactionInput {
        rating: rating.unwrap_or_default(),
        comment: comment.unwrap_or_default().to_string(),
    })
}

pub fn food_required_fields(target: FoodTarget) -> Vec<&'static str> {
    let mut fields = vec![GUESTS_FIELD];
    if target == FoodTarget::Waste {
        fields.push(QUANTITY_FIELD);
    }
    fields.extend(FOOD_CATEGORICAL_FIELDS);
    fields
}

fn category_value(value: &Value) -> std::result::Result<Option<String>, ()> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(if *b { "True" } else { "False" }.to_string())),
        Value::Array(_) | Value::Object(_) => Err(()),
    }
}

pub fn validate_food(payload: &Value, target: FoodTarget) -> Result<FoodDemandInput> {
    let payload = as_object(payload)?;
    require_fields(payload, &food_required_fields(target))?;

    let mut errors = Vec::new();

    let guests = coerce_f64(&payload[GUESTS_FIELD]);
    if guests.is_none() {
        errors.push(FieldError::new(GUESTS_FIELD, "Invalid numerical inputs"));
    }

    // 需求預測時若附帶數量也一併作為數值欄位
    let quantity = match payload.get(QUANTITY_FIELD) {
        Some(raw) => {
            let parsed = coerce_f64(raw);
            if parsed.is_none() {
                errors.push(FieldError::new(QUANTITY_FIELD, "Invalid numerical inputs"));
            }
            parsed
        }
        None => None,
    };

    let mut categories = Vec::with_capacity(FOOD_CATEGORICAL_FIELDS.len());
    for field in FOOD_CATEGORICAL_FIELDS {
        match category_value(&payload[field]) {
            Ok(value) => categories.push((field.to_string(), value)),
            Err(()) => errors.push(FieldError::new(field, "Expected a scalar category value")),
        }
    }

    finish(errors, || FoodDemandInput {
        guests: guests.unwrap_or_default(),
        quantity,
        categories,
    })
}

/// Parses the `days` query parameter; absent means the default horizon.
pub fn parse_forecast_days(raw: Option<&str>) -> Result<u32> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_FORECAST_DAYS);
    };

    let days = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| ServiceError::invalid_input("Days must be a positive integer"))?;

    if days <= 0 {
        return Err(ServiceError::invalid_input("Days must be a positive integer"));
    }
    if days > MAX_FORECAST_DAYS as i64 {
        return Err(ServiceError::invalid_input(format!(
            "Days must be at most {}",
            MAX_FORECAST_DAYS
        )));
    }

    Ok(days as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::encoder::LabelEncoder;
    use serde_json::json;

    fn encoders() -> (LabelEncoder, LabelEncoder) {
        (
            LabelEncoder::new(vec!["Clear".into(), "Clouds".into(), "Rain".into()]).unwrap(),
            LabelEncoder::new(vec!["Car".into(), "Motorcycle".into()]).unwrap(),
        )
    }

    #[test]
    fn test_missing_duration_fields_are_all_reported() {
        let (weather, vehicle) = encoders();
        let err = validate_duration(&json!({"distance": 3}), &weather, &vehicle).unwrap_err();
        match err {
            ServiceError::MissingFields { fields } => {
                assert_eq!(fields, vec!["osrmDuration", "hour", "weather", "vehicleType"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duration_categories_are_title_cased() {
        let (weather, vehicle) = encoders();
        let input = validate_duration(
            &json!({"distance": 10, "osrmDuration": 600, "hour": 8, "weather": "clear", "vehicleType": "CAR"}),
            &weather,
            &vehicle,
        )
        .unwrap();
        assert_eq!(input.weather, "Clear");
        assert_eq!(input.vehicle_type, "Car");
        assert_eq!(input.hour, 8);
    }

    #[test]
    fn test_duration_range_errors_are_batched() {
        let (weather, vehicle) = encoders();
        let err = validate_duration(
            &json!({"distance": 0, "osrmDuration": -5, "hour": 24, "weather": "Snow", "vehicleType": "Car"}),
            &weather,
            &vehicle,
        )
        .unwrap_err();
        match err {
            ServiceError::InvalidFields { errors } => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["distance", "osrmDuration", "hour", "weather"]);
                assert!(errors[3].reason.contains("Expected one of: Clear, Clouds, Rain"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duration_accepts_numeric_strings() {
        let (weather, vehicle) = encoders();
        let input = validate_duration(
            &json!({"distance": "2.5", "osrmDuration": "300", "hour": 7.9, "weather": "rain", "vehicleType": "motorcycle"}),
            &weather,
            &vehicle,
        )
        .unwrap();
        assert_eq!(input.distance_km, 2.5);
        assert_eq!(input.hour, 7);
    }

    #[test]
    fn test_duration_rejects_non_numeric_distance() {
        let (weather, vehicle) = encoders();
        let err = validate_duration(
            &json!({"distance": "far", "osrmDuration": 60, "hour": 1, "weather": "Clear", "vehicleType": "Car"}),
            &weather,
            &vehicle,
        )
        .unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("Invalid input format"));
    }

    #[test]
    fn test_satisfaction_validation() {
        assert!(validate_satisfaction(&json!({"rating": 4, "comment": "good"})).is_ok());
        assert!(validate_satisfaction(&json!({"rating": 0, "comment": "good"})).is_err());
        assert!(validate_satisfaction(&json!({"rating": 5.5, "comment": "good"})).is_err());
        assert!(validate_satisfaction(&json!({"rating": "4", "comment": "good"})).is_err());
        assert!(validate_satisfaction(&json!({"rating": true, "comment": "good"})).is_err());
        assert!(validate_satisfaction(&json!({"rating": 3, "comment": "   "})).is_err());
        assert!(validate_satisfaction(&json!({"rating": 3, "comment": 12})).is_err());
        assert!(validate_satisfaction(&json!(["rating", "comment"])).is_err());

        let err = validate_satisfaction(&json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: rating, comment");
    }

    #[test]
    fn test_food_validation() {
        let mut payload = json!({
            "Number of Guests": "120",
            "Type of Food": "Meat",
            "Event Type": "Wedding",
            "Storage Conditions": "Refrigerated",
            "Purchase History": "Regular",
            "Seasonality": "Summer",
            "Preparation Method": "Buffet",
            "Geographical Location": "Urban",
            "Pricing": null
        });
        let input = validate_food(&payload, FoodTarget::Quantity).unwrap();
        assert_eq!(input.guests, 120.0);
        assert_eq!(input.quantity, None);
        assert_eq!(input.categories.len(), 8);
        assert_eq!(input.categories[7], ("Pricing".to_string(), None));

        let err = validate_food(&payload, FoodTarget::Waste).unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: Quantity of Food");

        payload["Quantity of Food"] = json!("lots");
        let err = validate_food(&payload, FoodTarget::Waste).unwrap_err();
        assert!(err.to_string().contains("Invalid numerical inputs"));
    }

    #[test]
    fn test_parse_forecast_days() {
        assert_eq!(parse_forecast_days(None).unwrap(), 30);
        assert_eq!(parse_forecast_days(Some("7")).unwrap(), 7);
        assert!(parse_forecast_days(Some("0")).is_err());
        assert!(parse_forecast_days(Some("-3")).is_err());
        assert!(parse_forecast_days(Some("abc")).is_err());
        assert!(parse_forecast_days(Some("999999")).is_err());
    }

    #[test]
    fn test_forecast_days_upper_bound() {
        assert_eq!(parse_forecast_days(Some("3650")).unwrap(), MAX_FORECAST_DAYS);
        let err = parse_forecast_days(Some("3651")).unwrap_err();
        assert_eq!(err.to_string(), "Days must be at most 3650");
    }
}
