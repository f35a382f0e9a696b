use std::collections::HashMap;

use tracing::warn;

use crate::config::MAX_SAFE_DISTANCE;
use crate::distance::shortest_path;
use crate::domain::{Delivery, Location, Matrix, Solution, Vehicle};
use crate::error::Result;

/// Expands every consecutive stop pair in `solution.detailed_routes` into a
/// `RouteSegment`, accumulating per-vehicle `total_distance`, `total_time`,
/// and `capacity_utilization`. Unreachable pairs get a placeholder segment
/// rather than failing the solve.
pub fn annotate(
    solution: &mut Solution,
    locations: &[Location],
    vehicles: &[Vehicle],
    deliveries: &[Delivery],
    distance: &Matrix,
    time: Option<&Matrix>,
) -> Result<()> {
    let location_index: HashMap<&str, usize> = locations
        .iter()
        .enumerate()
        .map(|(i, l)| (l.id.as_str(), i))
        .collect();
    let graph = distance.to_graph();
    let vehicle_capacity: HashMap<&str, u64> = vehicles.iter().map(|v| (v.id.as_str(), v.capacity)).collect();

    let mut demand_by_location: HashMap<&str, u64> = HashMap::new();
    for delivery in deliveries {
        *demand_by_location.entry(delivery.location_id.as_str()).or_insert(0) += delivery.demand;
    }

    let mut total_distance = 0.0;

    for route in solution.detailed_routes.iter_mut() {
        let mut segments = Vec::new();
        let mut route_distance = 0.0;
        let mut route_time = 0.0;

        for pair in route.stops.windows(2) {
            let (from_id, to_id) = (&pair[0], &pair[1]);
            let (Some(&from), Some(&to)) = (location_index.get(from_id.as_str()), location_index.get(to_id.as_str())) else {
                warn!(from = %from_id, to = %to_id, "annotate: unknown location id, emitting placeholder segment");
                segments.push(placeholder_segment(from_id.clone(), to_id.clone()));
                route_distance += MAX_SAFE_DISTANCE;
                continue;
            };

            let result = shortest_path::shortest_path(&graph, from, to)?;
            if !result.distance.is_finite() {
                warn!(from = %from_id, to = %to_id, "annotate: unreachable pair, emitting placeholder segment");
                let leg_time = time.map(|t| t.get(from, to)).unwrap_or(0.0);
                segments.push(crate::domain::RouteSegment {
                    from: from_id.clone(),
                    to: to_id.clone(),
                    path: vec![from_id.clone(), to_id.clone()],
                    distance: MAX_SAFE_DISTANCE,
                    time: leg_time,
                });
                route_distance += MAX_SAFE_DISTANCE;
                route_time += leg_time;
                continue;
            }

            let path: Vec<String> = result.path.iter().map(|&idx| locations[idx].id.clone()).collect();
            let leg_time = time
                .map(|t| {
                    result
                        .path
                        .windows(2)
                        .map(|w| t.get(w[0], w[1]))
                        .sum::<f64>()
                })
                .unwrap_or(0.0);

            route_distance += result.distance;
            route_time += leg_time;
            segments.push(crate::domain::RouteSegment {
                from: from_id.clone(),
                to: to_id.clone(),
                path,
                distance: result.distance,
                time: leg_time,
            });
        }

        let demand_served: u64 = route
            .stops
            .iter()
            .filter_map(|id| demand_by_location.get(id.as_str()))
            .sum();
        let capacity = *vehicle_capacity.get(route.vehicle_id.as_str()).unwrap_or(&0);
        route.capacity_utilization = if capacity > 0 {
            demand_served as f64 / capacity as f64
        } else {
            0.0
        };

        route.segments = segments;
        route.total_distance = route_distance;
        route.total_time = route_time;
        total_distance += route_distance;
    }

    solution.total_distance = total_distance;
    Ok(())
}

fn placeholder_segment(from: String, to: String) -> crate::domain::RouteSegment {
    crate::domain::RouteSegment {
        path: vec![from.clone(), to.clone()],
        from,
        to,
        distance: MAX_SAFE_DISTANCE,
        time: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DetailedRoute, SolutionStatus};
    use std::collections::BTreeSet;

    fn loc(id: &str) -> Location {
        Location {
            id: id.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            is_depot: id == "depot",
            time_window_start: None,
            time_window_end: None,
            service_time: 0.0,
        }
    }

    fn vehicle(id: &str, capacity: u64) -> Vehicle {
        Vehicle {
            id: id.to_string(),
            capacity,
            start_location_id: "depot".to_string(),
            end_location_id: "depot".to_string(),
            cost_per_distance_unit: 1.0,
            fixed_cost: 0.0,
            max_distance: 1_000.0,
            max_stops: 10,
            available: true,
            skills: BTreeSet::new(),
        }
    }

    fn delivery(id: &str, location_id: &str, demand: u64) -> Delivery {
        Delivery {
            id: id.to_string(),
            location_id: location_id.to_string(),
            demand,
            priority: 0,
            required_skills: BTreeSet::new(),
            is_pickup: false,
        }
    }

    #[test]
    fn expands_route_into_segments_and_computes_utilization() {
        let locations = vec![loc("depot"), loc("a"), loc("b")];
        let vehicles = vec![vehicle("v1", 10)];
        let deliveries = vec![delivery("d1", "a", 3), delivery("d2", "b", 2)];
        let distance = Matrix::new(vec![
            vec![0.0, 1.0, 2.0],
            vec![1.0, 0.0, 1.0],
            vec![2.0, 1.0, 0.0],
        ]);
        let mut solution = Solution {
            status: SolutionStatus::Success,
            routes: vec![vec!["depot".to_string(), "a".to_string(), "b".to_string(), "depot".to_string()]],
            total_distance: 0.0,
            total_cost: 0.0,
            assigned_vehicle_ids: vec!["v1".to_string()],
            unassigned_delivery_ids: vec![],
            detailed_routes: vec![DetailedRoute {
                vehicle_id: "v1".to_string(),
                stops: vec!["depot".to_string(), "a".to_string(), "b".to_string(), "depot".to_string()],
                segments: vec![],
                total_distance: 0.0,
                total_time: 0.0,
                capacity_utilization: 0.0,
                estimated_arrival_minutes: vec![],
            }],
            statistics: Default::default(),
        };

        annotate(&mut solution, &locations, &vehicles, &deliveries, &distance, None).unwrap();

        assert_eq!(solution.detailed_routes[0].segments.len(), 3);
        assert_eq!(solution.detailed_routes[0].total_distance, 4.0);
        assert_eq!(solution.detailed_routes[0].capacity_utilization, 0.5);
        assert_eq!(solution.total_distance, 4.0);
    }

    #[test]
    fn unreachable_pair_gets_placeholder_segment() {
        let locations = vec![loc("depot"), loc("a")];
        let vehicles = vec![vehicle("v1", 10)];
        let distance = Matrix::new(vec![
            vec![0.0, MAX_SAFE_DISTANCE],
            vec![MAX_SAFE_DISTANCE, 0.0],
        ]);
        let mut solution = Solution {
            status: SolutionStatus::Success,
            routes: vec![],
            total_distance: 0.0,
            total_cost: 0.0,
            assigned_vehicle_ids: vec![],
            unassigned_delivery_ids: vec![],
            detailed_routes: vec![DetailedRoute {
                vehicle_id: "v1".to_string(),
                stops: vec!["depot".to_string(), "a".to_string()],
                segments: vec![],
                total_distance: 0.0,
                total_time: 0.0,
                capacity_utilization: 0.0,
                estimated_arrival_minutes: vec![],
            }],
            statistics: Default::default(),
        };

        annotate(&mut solution, &locations, &vehicles, &[], &distance, None).unwrap();

        assert_eq!(solution.detailed_routes[0].segments[0].distance, MAX_SAFE_DISTANCE);
    }
}
