use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::cache::Cache;
use crate::config::Config;
use crate::domain::{
    Delivery, Location, LocationPairFactor, ReroutingInfo, Solution, StatValue, TrafficInput,
    Vehicle,
};
use crate::error::Result;
use crate::pipeline::optimizer::optimize;

/// The traffic-factor pathway clamps to `[1.0, 5.0]`, so a literal infinite
/// penalty is not representable; the cap itself is used instead. This does
/// not guarantee the blocked edge is dropped from the shortest-path graph
/// (only an already-`MAX_SAFE_DISTANCE` edge would be), but it is enough to
/// make the VRP's local search prefer an alternate arc or drop the stop.
const ROADBLOCK_FACTOR: f64 = 5.0;

/// Computes `remaining = original_deliveries \ completed`, advances each
/// vehicle's `start_location_id` to its last completed stop, and re-solves
/// with `traffic_data` applied.
#[allow(clippy::too_many_arguments)]
pub async fn reroute_for_traffic(
    current_solution: &Solution,
    locations: &[Location],
    vehicles: &[Vehicle],
    original_deliveries: &[Delivery],
    completed_delivery_ids: &[String],
    traffic_data: &TrafficInput,
    time_limit_seconds: f64,
    config: &Config,
    cache: &dyn Cache,
) -> Result<Solution> {
    let completed: HashSet<&str> = completed_delivery_ids.iter().map(String::as_str).collect();
    let remaining: Vec<Delivery> = original_deliveries
        .iter()
        .filter(|d| !completed.contains(d.id.as_str()))
        .cloned()
        .collect();

    let advanced_vehicles = advance_vehicle_positions(current_solution, vehicles, original_deliveries, &completed);

    info!(
        completed = completed.len(),
        remaining = remaining.len(),
        "rerouting for traffic"
    );

    let new_solution = optimize(
        locations,
        &advanced_vehicles,
        &remaining,
        true,
        false,
        Some(traffic_data),
        false,
        time_limit_seconds,
        config,
        cache,
    )
    .await?;

    let mut payload = HashMap::new();
    payload.insert(
        "traffic_factors".to_string(),
        StatValue::Text(format!("{traffic_data:?}")),
    );

    Ok(finish_reroute(
        new_solution,
        "traffic",
        current_solution.total_distance,
        completed.len(),
        remaining.len(),
        payload,
    ))
}

/// Adds `delay_minutes` to each location named in `delayed_location_ids`'s
/// `service_time` and re-solves, forcing VRPTW so the added delay is
/// actually scheduled against.
#[allow(clippy::too_many_arguments)]
pub async fn reroute_for_delay(
    current_solution: &Solution,
    locations: &[Location],
    vehicles: &[Vehicle],
    original_deliveries: &[Delivery],
    completed_delivery_ids: &[String],
    delayed_location_ids: &[String],
    delay_minutes: f64,
    time_limit_seconds: f64,
    config: &Config,
    cache: &dyn Cache,
) -> Result<Solution> {
    let completed: HashSet<&str> = completed_delivery_ids.iter().map(String::as_str).collect();
    let remaining: Vec<Delivery> = original_deliveries
        .iter()
        .filter(|d| !completed.contains(d.id.as_str()))
        .cloned()
        .collect();

    let delayed: HashSet<&str> = delayed_location_ids.iter().map(String::as_str).collect();
    let delayed_locations: Vec<Location> = locations
        .iter()
        .map(|l| {
            let mut l = l.clone();
            if delayed.contains(l.id.as_str()) {
                l.service_time += delay_minutes;
            }
            l
        })
        .collect();

    let advanced_vehicles = advance_vehicle_positions(current_solution, vehicles, original_deliveries, &completed);

    info!(
        delayed = delayed_location_ids.len(),
        delay_minutes,
        "rerouting for delay"
    );

    let new_solution = optimize(
        &delayed_locations,
        &advanced_vehicles,
        &remaining,
        false,
        true,
        None,
        false,
        time_limit_seconds,
        config,
        cache,
    )
    .await?;

    let mut payload = HashMap::new();
    payload.insert("delay_minutes".to_string(), StatValue::Number(delay_minutes));
    payload.insert(
        "delayed_location_ids".to_string(),
        StatValue::Text(delayed_location_ids.join(",")),
    );

    Ok(finish_reroute(
        new_solution,
        "delay",
        current_solution.total_distance,
        completed.len(),
        remaining.len(),
        payload,
    ))
}

/// Synthesizes a traffic factor for each blocked `(from_idx, to_idx)` pair
/// (matrix indices into `locations`) and re-solves.
#[allow(clippy::too_many_arguments)]
pub async fn reroute_for_roadblock(
    current_solution: &Solution,
    locations: &[Location],
    vehicles: &[Vehicle],
    original_deliveries: &[Delivery],
    completed_delivery_ids: &[String],
    blocked_segments: &[(usize, usize)],
    time_limit_seconds: f64,
    config: &Config,
    cache: &dyn Cache,
) -> Result<Solution> {
    let completed: HashSet<&str> = completed_delivery_ids.iter().map(String::as_str).collect();
    let remaining: Vec<Delivery> = original_deliveries
        .iter()
        .filter(|d| !completed.contains(d.id.as_str()))
        .cloned()
        .collect();

    let location_pairs: Vec<LocationPairFactor> = blocked_segments
        .iter()
        .filter_map(|&(from_idx, to_idx)| {
            let from = locations.get(from_idx)?;
            let to = locations.get(to_idx)?;
            Some(LocationPairFactor {
                from: from.id.clone(),
                to: to.id.clone(),
                factor: ROADBLOCK_FACTOR,
            })
        })
        .collect();
    let traffic_data = TrafficInput::LocationPairs { location_pairs };

    let advanced_vehicles = advance_vehicle_positions(current_solution, vehicles, original_deliveries, &completed);

    info!(blocked = blocked_segments.len(), "rerouting for roadblock");

    let new_solution = optimize(
        locations,
        &advanced_vehicles,
        &remaining,
        true,
        false,
        Some(&traffic_data),
        false,
        time_limit_seconds,
        config,
        cache,
    )
    .await?;

    let mut payload = HashMap::new();
    payload.insert(
        "blocked_segments".to_string(),
        StatValue::Text(format!("{blocked_segments:?}")),
    );

    Ok(finish_reroute(
        new_solution,
        "roadblock",
        current_solution.total_distance,
        completed.len(),
        remaining.len(),
        payload,
    ))
}

/// For each vehicle, finds the last stop in its current route whose
/// location was served by a completed delivery, and advances
/// `start_location_id` to it. Vehicles with no completed stop on their
/// route (or absent from the prior solution) are left unchanged,
/// approximating mid-segment progress as "still at the depot".
fn advance_vehicle_positions(
    current_solution: &Solution,
    vehicles: &[Vehicle],
    original_deliveries: &[Delivery],
    completed: &HashSet<&str>,
) -> Vec<Vehicle> {
    let delivery_location: HashMap<&str, &str> = original_deliveries
        .iter()
        .map(|d| (d.id.as_str(), d.location_id.as_str()))
        .collect();

    let completed_locations: HashSet<&str> = completed
        .iter()
        .filter_map(|&id| delivery_location.get(id).copied())
        .collect();

    let route_by_vehicle: HashMap<&str, &Vec<String>> = current_solution
        .detailed_routes
        .iter()
        .map(|r| (r.vehicle_id.as_str(), &r.stops))
        .collect();

    vehicles
        .iter()
        .map(|vehicle| {
            let mut vehicle = vehicle.clone();
            if let Some(stops) = route_by_vehicle.get(vehicle.id.as_str()) {
                if let Some(last_completed) = stops.iter().rev().find(|id| completed_locations.contains(id.as_str())) {
                    vehicle.start_location_id = last_completed.clone();
                }
            }
            vehicle
        })
        .collect()
}

fn finish_reroute(
    mut solution: Solution,
    reason: &str,
    original_total_distance: f64,
    completed_delivery_count: usize,
    rerouted_delivery_count: usize,
    payload: HashMap<String, StatValue>,
) -> Solution {
    let info = ReroutingInfo {
        reason: reason.to_string(),
        original_total_distance,
        new_total_distance: solution.total_distance,
        completed_delivery_count,
        rerouted_delivery_count,
        payload,
    };
    solution = solution.with_rerouting_info(info);
    solution
}
