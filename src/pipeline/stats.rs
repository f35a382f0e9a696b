use std::collections::HashMap;

use crate::domain::{Solution, StatValue, Vehicle};

/// Computes `route_cost = fixed_cost + sum(segment.distance) *
/// cost_per_distance_unit` per vehicle and fleet-wide totals, writing them
/// into `solution.statistics` and `solution.total_cost`. Idempotent:
/// re-running on an already-statted solution reproduces the same numbers,
/// since it only reads `detailed_routes` (set once by `annotate`) and
/// overwrites its own prior output.
pub fn aggregate(solution: &mut Solution, vehicles: &[Vehicle], computation_time_ms: u64) {
    let vehicle_by_id: HashMap<&str, &Vehicle> = vehicles.iter().map(|v| (v.id.as_str(), v)).collect();

    let mut total_cost = 0.0;
    let mut total_distance = 0.0;
    let mut per_vehicle_stats: HashMap<String, StatValue> = HashMap::new();

    for route in &solution.detailed_routes {
        let Some(vehicle) = vehicle_by_id.get(route.vehicle_id.as_str()) else {
            continue;
        };

        let route_distance: f64 = route.segments.iter().map(|s| s.distance).sum();
        let route_cost = vehicle.fixed_cost + route_distance * vehicle.cost_per_distance_unit;
        let stops: std::collections::HashSet<&str> = route
            .stops
            .iter()
            .map(String::as_str)
            .filter(|&id| id != vehicle.start_location_id && id != vehicle.end_location_id)
            .collect();

        total_cost += route_cost;
        total_distance += route_distance;

        let mut entry = HashMap::new();
        entry.insert("route_cost".to_string(), StatValue::Number(route_cost));
        entry.insert("stops".to_string(), StatValue::Integer(stops.len() as i64));
        per_vehicle_stats.insert(route.vehicle_id.clone(), StatValue::Nested(entry));
    }

    solution.total_cost = total_cost;
    solution.statistics.insert("total_cost".to_string(), StatValue::Number(total_cost));
    solution.statistics.insert("total_distance".to_string(), StatValue::Number(total_distance));
    solution.statistics.insert(
        "vehicles_used".to_string(),
        StatValue::Integer(solution.assigned_vehicle_ids.len() as i64),
    );
    solution.statistics.insert(
        "deliveries_assigned".to_string(),
        StatValue::Integer(
            (solution
                .detailed_routes
                .iter()
                .map(|r| r.stops.len().saturating_sub(2))
                .sum::<usize>()) as i64,
        ),
    );
    solution.statistics.insert(
        "computation_time_ms".to_string(),
        StatValue::Integer(computation_time_ms as i64),
    );
    solution
        .statistics
        .insert("per_vehicle".to_string(), StatValue::Nested(per_vehicle_stats));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DetailedRoute, RouteSegment, SolutionStatus};
    use std::collections::BTreeSet;

    fn vehicle(id: &str) -> Vehicle {
        Vehicle {
            id: id.to_string(),
            capacity: 10,
            start_location_id: "depot".to_string(),
            end_location_id: "depot".to_string(),
            cost_per_distance_unit: 2.0,
            fixed_cost: 5.0,
            max_distance: 1_000.0,
            max_stops: 10,
            available: true,
            skills: BTreeSet::new(),
        }
    }

    fn solution() -> Solution {
        Solution {
            status: SolutionStatus::Success,
            routes: vec![],
            total_distance: 0.0,
            total_cost: 0.0,
            assigned_vehicle_ids: vec!["v1".to_string()],
            unassigned_delivery_ids: vec![],
            detailed_routes: vec![DetailedRoute {
                vehicle_id: "v1".to_string(),
                stops: vec!["depot".to_string(), "a".to_string(), "depot".to_string()],
                segments: vec![
                    RouteSegment {
                        from: "depot".to_string(),
                        to: "a".to_string(),
                        path: vec!["depot".to_string(), "a".to_string()],
                        distance: 3.0,
                        time: 1.0,
                    },
                    RouteSegment {
                        from: "a".to_string(),
                        to: "depot".to_string(),
                        path: vec!["a".to_string(), "depot".to_string()],
                        distance: 3.0,
                        time: 1.0,
                    },
                ],
                total_distance: 6.0,
                total_time: 2.0,
                capacity_utilization: 0.5,
                estimated_arrival_minutes: vec![],
            }],
            statistics: Default::default(),
        }
    }

    #[test]
    fn computes_route_cost_and_totals() {
        let vehicles = vec![vehicle("v1")];
        let mut solution = solution();
        aggregate(&mut solution, &vehicles, 42);
        assert_eq!(solution.total_cost, 5.0 + 6.0 * 2.0);
        assert_eq!(
            solution.statistics.get("computation_time_ms"),
            Some(&StatValue::Integer(42))
        );
    }

    #[test]
    fn is_idempotent() {
        let vehicles = vec![vehicle("v1")];
        let mut solution = solution();
        aggregate(&mut solution, &vehicles, 10);
        let first = solution.total_cost;
        aggregate(&mut solution, &vehicles, 10);
        assert_eq!(solution.total_cost, first);
    }
}
