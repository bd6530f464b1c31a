//! Forward Geocoding
//!
//! Resolves a free-form location string to a coordinate pair via the Google
//! Maps Geocoding API. The forecast tool wants latitude/longitude, so the UI
//! geocodes before calling it.

use anyhow::{Context, Result};
use serde_json::Value;

/// Environment variable carrying the geocoding API key
pub const API_KEY_ENV: &str = "GOOGLE_GEOCODE_API_KEY";

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Resolve a location string to `(latitude, longitude)`
///
/// Returns `Ok(None)` when the API reports anything other than `OK` for the
/// query (unknown place, quota exceeded, bad key). Network and decode
/// failures are real errors.
pub async fn lookup(
    http: &reqwest::Client,
    location: &str,
    api_key: &str,
) -> Result<Option<(f64, f64)>> {
    let response: Value = http
        .get(GEOCODE_URL)
        .query(&[("address", location), ("key", api_key)])
        .send()
        .await
        .context("geocoding request failed")?
        .json()
        .await
        .context("geocoding response was not JSON")?;

    Ok(coordinates_from_response(&response))
}

/// Extract the first result's coordinates from a geocoding API response
fn coordinates_from_response(response: &Value) -> Option<(f64, f64)> {
    if response.get("status").and_then(Value::as_str) != Some("OK") {
        tracing::debug!(
            "Geocoding returned status {:?}",
            response.get("status").and_then(serde_json::Value::as_str)
        );
        return None;
    }

    let location = response
        .get("results")?
        .as_array()?
        .first()?
        .get("geometry")?
        .get("location")?;

    let lat = location.get("lat")?.as_f64()?;
    let lng = location.get("lng")?.as_f64()?;
    Some((lat, lng))
}
