pub mod construction;
pub mod diversification;
pub mod model;
pub mod neighborhood;
pub mod repair;
pub mod search;
pub mod tabu;

use crate::config::Config;
use crate::domain::{Delivery, Location, Matrix, Solution, SolutionStatus, Vehicle};
use crate::error::{OptimizerError, Result};
use model::{Candidate, Problem};

/// Solves a capacitated VRP with no time dimension. `locations` must cover
/// every `vehicle.start_location_id`/`end_location_id` and
/// `delivery.location_id`.
pub fn solve(
    distance: &Matrix,
    locations: &[Location],
    vehicles: &[Vehicle],
    deliveries: &[Delivery],
    depot_index: usize,
    time_limit_seconds: f64,
    config: &Config,
) -> Result<Solution> {
    solve_inner(distance, None, locations, vehicles, deliveries, depot_index, false, time_limit_seconds, config)
}

/// Solves a VRP with time windows, scheduling stops against `time` (a
/// travel-time matrix) in addition to `distance`.
pub fn solve_with_time_windows(
    distance: &Matrix,
    time: &Matrix,
    locations: &[Location],
    vehicles: &[Vehicle],
    deliveries: &[Delivery],
    depot_index: usize,
    time_limit_seconds: f64,
    config: &Config,
) -> Result<Solution> {
    solve_inner(
        distance,
        Some(time),
        locations,
        vehicles,
        deliveries,
        depot_index,
        true,
        time_limit_seconds,
        config,
    )
}

#[allow(clippy::too_many_arguments)]
fn solve_inner(
    distance: &Matrix,
    time: Option<&Matrix>,
    locations: &[Location],
    vehicles: &[Vehicle],
    deliveries: &[Delivery],
    depot_index: usize,
    consider_time_windows: bool,
    time_limit_seconds: f64,
    config: &Config,
) -> Result<Solution> {
    if vehicles.is_empty() {
        return Err(OptimizerError::InvalidInput("no vehicles provided".to_string()));
    }
    if depot_index >= locations.len() {
        return Err(OptimizerError::InvalidInput(format!(
            "depot_index {} out of bounds for {} locations",
            depot_index,
            locations.len()
        )));
    }

    let problem = Problem::new(
        distance,
        time,
        locations,
        vehicles,
        deliveries,
        depot_index,
        consider_time_windows,
        config,
    );

    if deliveries.is_empty() {
        let candidate = Candidate {
            routes: vehicles.iter().map(|_| model::Route::default()).collect(),
            unassigned: Vec::new(),
            cost: 0.0,
        };
        return Ok(candidate_to_solution(&problem, &candidate));
    }

    let best = search::run(&problem, time_limit_seconds);

    if best.routes.iter().all(|r| r.stops.is_empty()) && best.unassigned.len() == deliveries.len() {
        return Ok(Solution::no_solution(
            deliveries.iter().map(|d| d.id.clone()).collect(),
        ));
    }

    Ok(candidate_to_solution(&problem, &best))
}

fn candidate_to_solution(problem: &Problem, candidate: &Candidate) -> Solution {
    let routes: Vec<Vec<String>> = candidate
        .routes
        .iter()
        .enumerate()
        .map(|(vehicle, route)| {
            let mut ids = vec![problem.locations[problem.vehicle_start[vehicle]].id.clone()];
            ids.extend(route.stops.iter().map(|&d| problem.locations[problem.delivery_location[d]].id.clone()));
            ids.push(problem.locations[problem.vehicle_end[vehicle]].id.clone());
            ids
        })
        .collect();

    let assigned_vehicle_ids: Vec<String> = candidate
        .routes
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.stops.is_empty())
        .map(|(v, _)| problem.vehicles[v].id.clone())
        .collect();

    let unassigned_delivery_ids = candidate
        .unassigned
        .iter()
        .map(|&d| problem.deliveries[d].id.clone())
        .collect();

    let total_distance: f64 = candidate
        .routes
        .iter()
        .enumerate()
        .map(|(v, r)| problem.route_distance_km(v, r))
        .sum();

    let detailed_routes = candidate
        .routes
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.stops.is_empty())
        .map(|(vehicle, route)| {
            let stops: Vec<String> = std::iter::once(problem.locations[problem.vehicle_start[vehicle]].id.clone())
                .chain(route.stops.iter().map(|&d| problem.locations[problem.delivery_location[d]].id.clone()))
                .chain(std::iter::once(problem.locations[problem.vehicle_end[vehicle]].id.clone()))
                .collect();

            let estimated_arrival_minutes = if problem.consider_time_windows {
                problem.route_arrivals_minutes(vehicle, route).unwrap_or_default()
            } else {
                Vec::new()
            };

            let capacity = problem.vehicles[vehicle].capacity as f64;
            let peak_load = problem
                .route_capacity_profile(vehicle, route)
                .and_then(|profile| profile.into_iter().max())
                .unwrap_or(0) as f64
                / problem.config.capacity_scaling_factor;
            let capacity_utilization = if capacity > 0.0 { peak_load / capacity } else { 0.0 };

            crate::domain::DetailedRoute {
                vehicle_id: problem.vehicles[vehicle].id.clone(),
                stops,
                segments: Vec::new(),
                total_distance: problem.route_distance_km(vehicle, route),
                total_time: 0.0,
                capacity_utilization,
                estimated_arrival_minutes,
            }
        })
        .collect();

    Solution {
        status: SolutionStatus::Success,
        routes,
        total_distance,
        total_cost: 0.0,
        assigned_vehicle_ids,
        unassigned_delivery_ids,
        detailed_routes,
        statistics: std::collections::HashMap::new(),
    }
}
