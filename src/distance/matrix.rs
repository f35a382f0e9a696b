use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::config::{Config, DistanceProvider};
use crate::distance::haversine;
use crate::distance::providers::{google, osrm};
use crate::domain::{Location, Matrix};
use crate::error::OptimizerError;

/// The JSON payload stored under a distance-matrix `cache_key`.
#[derive(Debug, Serialize, Deserialize)]
struct DistanceCacheEntry {
    distance_matrix: Vec<Vec<f64>>,
    time_matrix: Option<Vec<Vec<f64>>>,
    location_ids: Vec<String>,
    created_at: String,
}

/// Builds the distance matrix (and, in API mode, the time matrix) for
/// `locations`, in their input order. `ids` mirrors that order.
///
/// - `use_api = false` (or no key/provider reachable): Haversine only, no
///   `time` matrix.
/// - `use_api = true`: consults the cache under a deterministic key; on a
///   miss, calls the configured provider with retry/backoff, falling back
///   to Haversine (uncached) if every attempt fails.
///
/// Every returned matrix has been sanitized.
pub async fn build(
    locations: &[Location],
    use_api: bool,
    api_key: Option<&str>,
    config: &Config,
    cache: &dyn Cache,
) -> Result<(Matrix, Option<Matrix>, Vec<String>), OptimizerError> {
    let ids: Vec<String> = locations.iter().map(|l| l.id.clone()).collect();

    if !use_api || api_key.is_none() || config.testing {
        debug!("building distance matrix via Haversine ({} locations)", ids.len());
        let points: Vec<(f64, f64)> = locations.iter().map(|l| (l.latitude, l.longitude)).collect();
        let distance = Matrix::new(haversine::build_matrix(&points)).sanitize();
        return Ok((distance, None, ids));
    }

    let api_key = api_key.expect("checked above");
    let cache_key = compute_cache_key(locations);

    if let Some(cached) = cache.get(&cache_key).await {
        if let Ok(entry) = serde_json::from_str::<DistanceCacheEntry>(&cached) {
            info!("distance-matrix cache hit for key {cache_key}");
            let distance = Matrix::new(entry.distance_matrix).sanitize();
            let time = entry.time_matrix.map(|t| Matrix::new(t).sanitize());
            return Ok((distance, time, entry.location_ids));
        }
        warn!("distance-matrix cache entry for {cache_key} failed to deserialize; treating as a miss");
    }

    match fetch_with_retry(locations, api_key, config).await {
        Ok((distance_raw, time_raw)) => {
            let distance = Matrix::new(distance_raw).sanitize();
            let time = Matrix::new(time_raw).sanitize();

            let entry = DistanceCacheEntry {
                distance_matrix: distance.values.clone(),
                time_matrix: Some(time.values.clone()),
                location_ids: ids.clone(),
                created_at: iso_now(),
            };
            if let Ok(serialized) = serde_json::to_string(&entry) {
                let ttl = Duration::from_secs((config.cache_expiry_days.max(0) as u64) * 86_400);
                cache.put(&cache_key, &serialized, ttl).await;
            }
            Ok((distance, Some(time), ids))
        }
        Err(e) => {
            warn!("distance provider unavailable ({e}); falling back to Haversine (not cached)");
            let points: Vec<(f64, f64)> = locations.iter().map(|l| (l.latitude, l.longitude)).collect();
            let distance = Matrix::new(haversine::build_matrix(&points)).sanitize();
            Ok((distance, None, ids))
        }
    }
}

async fn fetch_with_retry(
    locations: &[Location],
    api_key: &str,
    config: &Config,
) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>), OptimizerError> {
    let mut attempt = 0;
    loop {
        let result = match config.distance_provider {
            DistanceProvider::Google => google::fetch(locations, api_key).await,
            DistanceProvider::Osrm => osrm::fetch(locations, &config.osrm_base_url).await,
        };

        match result {
            Ok(matrices) => return Ok(matrices),
            Err(e) if attempt + 1 >= config.max_retries => return Err(e),
            Err(e) => {
                let delay = config.retry_delay.mul_f64(config.backoff_factor.powi(attempt as i32));
                warn!("distance provider attempt {} failed ({e}); retrying in {:?}", attempt + 1, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Deterministic cache key: sha256 of the sorted `(id, lat, lon)` triples,
/// coordinates rounded to 5 decimal places.
fn compute_cache_key(locations: &[Location]) -> String {
    let mut rounded: Vec<(String, i64, i64)> = locations
        .iter()
        .map(|l| {
            (
                l.id.clone(),
                (l.latitude * 100_000.0).round() as i64,
                (l.longitude * 100_000.0).round() as i64,
            )
        })
        .collect();
    rounded.sort();

    let mut hasher = Sha256::new();
    for (id, lat, lon) in &rounded {
        hasher.update(id.as_bytes());
        hasher.update(lat.to_le_bytes());
        hasher.update(lon.to_le_bytes());
    }
    format!("distance_matrix:{:x}", hasher.finalize())
}

fn iso_now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Applies per-pair traffic factors to `matrix`, clamped to `[1.0, 5.0]`.
/// Pure.
pub fn apply_traffic(matrix: &Matrix, traffic: &HashMap<(usize, usize), f64>) -> Matrix {
    matrix.apply_traffic(traffic)
}

/// Converts a sanitized matrix into the adjacency form C1 consumes.
pub fn to_graph(matrix: &Matrix) -> crate::distance::shortest_path::Graph {
    matrix.to_graph()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;

    fn loc(id: &str, lat: f64, lon: f64) -> Location {
        Location {
            id: id.to_string(),
            latitude: lat,
            longitude: lon,
            is_depot: false,
            time_window_start: None,
            time_window_end: None,
            service_time: 0.0,
        }
    }

    #[tokio::test]
    async fn build_without_api_uses_haversine_and_omits_time() {
        let cache = InMemoryCache::new();
        let locations = vec![loc("depot", 0.0, 0.0), loc("a", 0.0, 1.0)];
        let config = Config::default();
        let (distance, time, ids) = build(&locations, false, None, &config, &cache).await.unwrap();
        assert!(time.is_none());
        assert_eq!(ids, vec!["depot".to_string(), "a".to_string()]);
        assert!((distance.get(0, 1) - 111.195).abs() < 1.0);
    }

    #[test]
    fn cache_key_is_order_independent() {
        let a = vec![loc("x", 1.0, 2.0), loc("y", 3.0, 4.0)];
        let b = vec![loc("y", 3.0, 4.0), loc("x", 1.0, 2.0)];
        assert_eq!(compute_cache_key(&a), compute_cache_key(&b));
    }

    #[test]
    fn cache_key_is_sensitive_to_coordinates() {
        let a = vec![loc("x", 1.0, 2.0)];
        let b = vec![loc("x", 1.00001, 2.0)];
        assert_ne!(compute_cache_key(&a), compute_cache_key(&b));
    }
}
