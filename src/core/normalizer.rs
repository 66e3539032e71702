//! Deterministic request → feature transforms.

use crate::core::validator::{GUESTS_FIELD, QUANTITY_FIELD};
use crate::domain::model::{DurationFeatures, DurationInput, FoodDemandInput, ImageTensor};
use crate::utils::error::{Result, ServiceError};
use image::imageops::FilterType;
use std::collections::HashMap;

pub const IMAGE_SIZE: u32 = 224;

/// Upper-cases the first letter of every word and lower-cases the rest,
/// where any non-alphabetic character starts a new word ("heavy rain" →
/// "Heavy Rain", "o'neil" → "O'Neil").
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;

    for ch in text.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }

    out
}

pub fn km_to_meters(km: f64) -> f64 {
    km * 1000.0
}

pub fn seconds_to_minutes(seconds: f64) -> f64 {
    seconds / 60.0
}

pub fn normalize_hour(hour: i64) -> f64 {
    hour as f64 / 23.0
}

pub fn duration_features(
    input: &DurationInput,
    weather_code: i64,
    vehicle_code: i64,
) -> DurationFeatures {
    DurationFeatures {
        distance_meters: km_to_meters(input.distance_km),
        osrm_duration_minutes: seconds_to_minutes(input.osrm_duration_seconds),
        hour_normalized: normalize_hour(input.hour),
        weather_code,
        vehicle_code,
    }
}

pub fn one_hot_column(field: &str, value: &str) -> String {
    format!("{}_{}", field, value)
}

/// Builds the tabular feature vector in the canonical column order.
///
/// Numeric columns keep their value, each categorical field becomes a
/// `<field>_<value>` indicator column, and any canonical column that was not
/// produced (including unseen categories) is zero.
pub fn food_feature_vector(input: &FoodDemandInput, columns: &[String]) -> Vec<f64> {
    let mut produced: HashMap<String, f64> = HashMap::new();
    produced.insert(GUESTS_FIELD.to_string(), input.guests);
    if let Some(quantity) = input.quantity {
        produced.insert(QUANTITY_FIELD.to_string(), quantity);
    }

    for (field, value) in &input.categories {
        if let Some(value) = value {
            produced.insert(one_hot_column(field, value), 1.0);
        }
    }

    columns
        .iter()
        .map(|column| produced.get(column).copied().unwrap_or(0.0))
        .collect()
}

/// Decodes an upload, converts it to RGB, resizes to 224x224 and scales
/// pixels to [-1, 1].
pub fn image_tensor_from_bytes(bytes: &[u8]) -> Result<ImageTensor> {
    if bytes.is_empty() {
        return Err(ServiceError::invalid_input(
            "Failed to process image: empty upload",
        ));
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| ServiceError::invalid_input(format!("Failed to process image: {}", e)))?;

    let rgb = decoded.to_rgb8();
    let resized = image::imageops::resize(&rgb, IMAGE_SIZE, IMAGE_SIZE, FilterType::CatmullRom);

    let data = resized
        .pixels()
        .flat_map(|pixel| pixel.0)
        .map(|channel| channel as f32 / 127.5 - 1.0)
        .collect();

    Ok(ImageTensor {
        width: IMAGE_SIZE,
        height: IMAGE_SIZE,
        data,
    })
}
