use reqwest::Client;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::domain::Location;
use crate::error::OptimizerError;

/// Fetches a distance (km) and duration (minutes) matrix from an OSRM
/// `table` endpoint. A single attempt; the caller retries with backoff.
pub async fn fetch(
    locations: &[Location],
    base_url: &str,
) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>), OptimizerError> {
    if locations.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let is_public_demo = base_url.contains("router.project-osrm.org");
    let coord_str = locations
        .iter()
        .map(|l| format!("{},{}", l.longitude, l.latitude))
        .collect::<Vec<_>>()
        .join(";");
    let url = format!("{base_url}/{coord_str}?annotations=distance,duration");

    if url.len() > 8000 {
        return Err(OptimizerError::ProviderUnavailable(format!(
            "OSRM URL too long ({} chars); batch the request or self-host OSRM",
            url.len()
        )));
    }

    trace!("OSRM table request: {} locations", locations.len());
    let client = Client::new();
    let mut request = client.get(&url).timeout(std::time::Duration::from_secs(30));
    if is_public_demo {
        request = request.header("User-Agent", "routeopt/1.0 (contact unset)");
    }

    let response = request
        .send()
        .await
        .map_err(|e| OptimizerError::ProviderUnavailable(format!("OSRM request: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(OptimizerError::ProviderUnavailable(format!(
            "OSRM returned HTTP {status}"
        )));
    }

    let text = response
        .text()
        .await
        .map_err(|e| OptimizerError::ProviderUnavailable(format!("OSRM response body: {e}")))?;
    debug!("OSRM response: {} bytes", text.len());

    let json: Value = serde_json::from_str(&text)
        .map_err(|e| OptimizerError::ProviderUnavailable(format!("OSRM JSON parse: {e}")))?;

    let distances = extract_matrix(&json, "distances", 1.0 / 1000.0)?;
    let durations = extract_matrix(&json, "durations", 1.0 / 60.0)?;
    Ok((distances, durations))
}

fn extract_matrix(json: &Value, field: &str, unit_scale: f64) -> Result<Vec<Vec<f64>>, OptimizerError> {
    let rows = json[field].as_array().ok_or_else(|| {
        OptimizerError::ProviderUnavailable(format!("OSRM response missing '{field}' array"))
    })?;

    let matrix = rows
        .iter()
        .map(|row| {
            row.as_array()
                .map(|cells| {
                    cells
                        .iter()
                        .map(|v| match v.as_f64() {
                            Some(raw) => raw * unit_scale,
                            None => {
                                warn!("OSRM '{}' cell is null; treating as unreachable", field);
                                f64::INFINITY
                            }
                        })
                        .collect::<Vec<f64>>()
                })
                .unwrap_or_default()
        })
        .collect();
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_matrix_converts_units_and_nulls() {
        let json = serde_json::json!({
            "distances": [[0.0, 1000.0], [1000.0, serde_json::Value::Null]]
        });
        let m = extract_matrix(&json, "distances", 1.0 / 1000.0).unwrap();
        assert_eq!(m[0][1], 1.0);
        assert!(m[1][1].is_infinite());
    }

    #[test]
    fn extract_matrix_errors_on_missing_field() {
        let json = serde_json::json!({});
        assert!(extract_matrix(&json, "distances", 1.0).is_err());
    }
}
