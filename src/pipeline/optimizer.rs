use std::collections::HashMap;
use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{info, info_span, warn};

use crate::cache::Cache;
use crate::config::Config;
use crate::distance::{self, depot};
use crate::domain::{Delivery, Location, Solution, SolutionStatus, TrafficInput, Vehicle};
use crate::error::{OptimizerError, Result};
use crate::pipeline::{annotate, stats};
use crate::solver;

/// Any stage's failure short-circuits straight to `Error`; this enum exists
/// for diagnostics/logging only, the public contract is the returned
/// [`Solution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
enum Stage {
    Init,
    Validated,
    MatrixBuilt,
    DepotResolved,
    Solved,
    Annotated,
    Statted,
}

/// Only malformed input is surfaced as an `Err`; every other failure mode
/// (infeasible model, provider outage, internal error) is folded into the
/// returned [`Solution`]'s `status`/`statistics.error`.
#[allow(clippy::too_many_arguments)]
pub async fn optimize(
    locations: &[Location],
    vehicles: &[Vehicle],
    deliveries: &[Delivery],
    consider_traffic: bool,
    consider_time_windows: bool,
    traffic_data: Option<&TrafficInput>,
    use_api: bool,
    time_limit_seconds: f64,
    config: &Config,
    result_cache: &dyn Cache,
) -> Result<Solution> {
    let span = info_span!("optimize", locations = locations.len(), vehicles = vehicles.len(), deliveries = deliveries.len());
    let _guard = span.enter();
    let start = Instant::now();

    validate_inputs(locations, vehicles, deliveries)?;
    let stage = Stage::Validated;

    let result_cache_key = compute_result_cache_key(
        locations,
        vehicles,
        deliveries,
        consider_traffic,
        consider_time_windows,
        use_api,
    );
    if let Some(cached) = result_cache.get(&result_cache_key).await {
        if let Ok(solution) = serde_json::from_str::<Solution>(&cached) {
            info!("optimizer result-cache hit for key {result_cache_key}");
            return Ok(solution);
        }
        warn!("optimizer result-cache entry for {result_cache_key} failed to deserialize; treating as a miss");
    }

    let api_key = config.google_maps_api_key.as_deref();
    let (distance, time, ids) = match distance::build(locations, use_api, api_key, config, result_cache).await {
        Ok(built) => built,
        Err(e) => return Ok(error_solution(stage, e)),
    };
    let stage = Stage::MatrixBuilt;
    let location_index: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();

    // The Haversine path never returns a time matrix; derive one at a
    // constant nominal speed when VRPTW needs a time dimension anyway.
    let time = if consider_time_windows && time.is_none() {
        Some(distance.derive_time_minutes(config.nominal_speed_kmh))
    } else {
        time
    };

    let normalized_traffic = traffic_data
        .map(|t| t.normalize(&location_index))
        .filter(|_| consider_traffic)
        .unwrap_or_default();

    let distance = if consider_traffic && !consider_time_windows {
        distance.apply_traffic(&normalized_traffic)
    } else {
        distance
    };
    let time = if consider_traffic && consider_time_windows {
        time.map(|t| t.apply_traffic(&normalized_traffic))
    } else {
        time
    };

    let (_depot_location, depot_index) = depot::resolve(locations);
    let stage = Stage::DepotResolved;

    let solve_result = if consider_time_windows {
        match &time {
            Some(time) => solver::solve_with_time_windows(
                &distance,
                time,
                locations,
                vehicles,
                deliveries,
                depot_index,
                time_limit_seconds,
                config,
            ),
            None => Err(OptimizerError::InternalError(
                "time windows requested but no time matrix is available".to_string(),
            )),
        }
    } else {
        solver::solve(
            &distance,
            locations,
            vehicles,
            deliveries,
            depot_index,
            time_limit_seconds,
            config,
        )
    };

    let mut solution = match solve_result {
        Ok(s) => s,
        Err(e) => return Ok(error_solution(stage, e)),
    };
    let stage = Stage::Solved;

    if solution.status != SolutionStatus::NoSolution {
        if let Err(e) = annotate::annotate(&mut solution, locations, vehicles, deliveries, &distance, time.as_ref()) {
            return Ok(error_solution(stage, e));
        }
    }
    let stage = Stage::Annotated;

    let computation_time_ms = start.elapsed().as_millis() as u64;
    if solution.status != SolutionStatus::NoSolution {
        stats::aggregate(&mut solution, vehicles, computation_time_ms);
    }
    let _stage = Stage::Statted;

    if let Ok(serialized) = serde_json::to_string(&solution) {
        result_cache
            .put(&result_cache_key, &serialized, config.optimization_result_cache_timeout)
            .await;
    }

    Ok(solution)
}

/// Non-empty locations/vehicles; every delivery's `location_id` resolves to
/// a non-depot location; every vehicle's start/end location exists.
fn validate_inputs(locations: &[Location], vehicles: &[Vehicle], deliveries: &[Delivery]) -> Result<()> {
    if locations.is_empty() {
        return Err(OptimizerError::InvalidInput("no locations provided".to_string()));
    }
    if vehicles.is_empty() {
        return Err(OptimizerError::InvalidInput("no vehicles provided".to_string()));
    }

    for location in locations {
        location.validate()?;
    }

    let location_ids: std::collections::HashSet<&str> = locations.iter().map(|l| l.id.as_str()).collect();

    for vehicle in vehicles {
        if vehicle.capacity == 0 && vehicle.available {
            continue; // zero-capacity vehicles are legal, just useless
        }
        if !location_ids.contains(vehicle.start_location_id.as_str()) {
            return Err(OptimizerError::InvalidInput(format!(
                "vehicle {}: start_location_id {} not found",
                vehicle.id, vehicle.start_location_id
            )));
        }
        if !location_ids.contains(vehicle.end_location_id.as_str()) {
            return Err(OptimizerError::InvalidInput(format!(
                "vehicle {}: end_location_id {} not found",
                vehicle.id, vehicle.end_location_id
            )));
        }
    }

    let depot_ids: std::collections::HashSet<&str> = locations.iter().filter(|l| l.is_depot).map(|l| l.id.as_str()).collect();

    for delivery in deliveries {
        let Some(location) = locations.iter().find(|l| l.id == delivery.location_id) else {
            return Err(OptimizerError::InvalidInput(format!(
                "delivery {}: location_id {} not found",
                delivery.id, delivery.location_id
            )));
        };
        if location.is_depot || depot_ids.contains(delivery.location_id.as_str()) {
            return Err(OptimizerError::InvalidInput(format!(
                "delivery {}: location_id {} is a depot",
                delivery.id, delivery.location_id
            )));
        }
    }

    Ok(())
}

/// Deterministic key over normalized inputs: sorted vehicle/delivery IDs,
/// location coordinates, and the flags that change the computed solution.
fn compute_result_cache_key(
    locations: &[Location],
    vehicles: &[Vehicle],
    deliveries: &[Delivery],
    consider_traffic: bool,
    consider_time_windows: bool,
    use_api: bool,
) -> String {
    let mut hasher = Sha256::new();

    let mut loc_keys: Vec<String> = locations
        .iter()
        .map(|l| format!("{}:{:.5}:{:.5}", l.id, l.latitude, l.longitude))
        .collect();
    loc_keys.sort();
    for k in &loc_keys {
        hasher.update(k.as_bytes());
    }

    let mut vehicle_ids: Vec<&str> = vehicles.iter().map(|v| v.id.as_str()).collect();
    vehicle_ids.sort_unstable();
    for id in &vehicle_ids {
        hasher.update(id.as_bytes());
    }

    let mut delivery_ids: Vec<&str> = deliveries.iter().map(|d| d.id.as_str()).collect();
    delivery_ids.sort_unstable();
    for id in &delivery_ids {
        hasher.update(id.as_bytes());
    }

    hasher.update([consider_traffic as u8, consider_time_windows as u8, use_api as u8]);

    format!("optimize_result:{:x}", hasher.finalize())
}

fn error_solution(stage: Stage, error: OptimizerError) -> Solution {
    warn!(?stage, %error, "optimize: stage failed, short-circuiting to Error");
    match error {
        OptimizerError::NoSolution(_) | OptimizerError::Timeout => Solution::no_solution(Vec::new()),
        other => Solution::error(other.to_string()),
    }
}
