use std::collections::BinaryHeap;

use super::construction::cheapest_insertion;
use super::model::{Candidate, Problem};

/// Pops stops off the tail of every infeasible route until it is feasible
/// again, then reinserts the displaced deliveries highest-demand first,
/// dropping any that no vehicle can take.
pub fn destroy_and_recreate(problem: &Problem, mut candidate: Candidate) -> Candidate {
    let mut displaced: BinaryHeap<(u64, usize)> = BinaryHeap::new();

    for vehicle in 0..candidate.routes.len() {
        while !problem.route_feasible(vehicle, &candidate.routes[vehicle]) {
            match candidate.routes[vehicle].stops.pop() {
                Some(delivery) => displaced.push((problem.deliveries[delivery].demand, delivery)),
                None => break,
            }
        }
    }

    while let Some((_, delivery)) = displaced.pop() {
        match cheapest_insertion(problem, &candidate.routes, delivery) {
            Some((vehicle, position)) => candidate.routes[vehicle].stops.insert(position, delivery),
            None => candidate.unassigned.push(delivery),
        }
    }

    candidate.unassigned.sort_unstable();
    candidate.unassigned.dedup();
    candidate.cost = problem.evaluate(&candidate);
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::domain::{Delivery, Location, Matrix, Vehicle};
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
    fn repairs_overloaded_route_by_moving_excess_to_another_vehicle() {
        use super::super::model::Route;

        let locations = vec![loc("depot"), loc("a"), loc("b")];
        let vehicles = vec![vehicle("v1", 5), vehicle("v2", 5)];
        let deliveries = vec![delivery("d1", "a", 5), delivery("d2", "b", 5)];
        let distance = Matrix::new(vec![
            vec![0.0, 1.0, 2.0],
            vec![1.0, 0.0, 1.0],
            vec![2.0, 1.0, 0.0],
        ]);
        let config = Config::default();
        let problem = Problem::new(&distance, None, &locations, &vehicles, &deliveries, 0, false, &config);

        let overloaded = Candidate {
            routes: vec![Route { stops: vec![0, 1] }, Route::default()],
            unassigned: vec![],
            cost: 0.0,
        };
        let repaired = destroy_and_recreate(&problem, overloaded);

        assert!(problem.route_feasible(0, &repaired.routes[0]));
        assert!(problem.route_feasible(1, &repaired.routes[1]));
        let mut placed: Vec<usize> = repaired.routes.iter().flat_map(|r| r.stops.clone()).collect();
        placed.extend(repaired.unassigned.iter().copied());
        placed.sort_unstable();
        assert_eq!(placed, vec![0, 1]);
    }

    #[test]
    fn drops_delivery_no_vehicle_can_take_after_destroy() {
        use super::super::model::Route;

        let locations = vec![loc("depot"), loc("a"), loc("b")];
        let vehicles = vec![vehicle("v1", 5)];
        let deliveries = vec![delivery("d1", "a", 5), delivery("d2", "b", 5)];
        let distance = Matrix::new(vec![
            vec![0.0, 1.0, 2.0],
            vec![1.0, 0.0, 1.0],
            vec![2.0, 1.0, 0.0],
        ]);
        let config = Config::default();
        let problem = Problem::new(&distance, None, &locations, &vehicles, &deliveries, 0, false, &config);

        let overloaded = Candidate {
            routes: vec![Route { stops: vec![0, 1] }],
            unassigned: vec![],
            cost: 0.0,
        };
        let repaired = destroy_and_recreate(&problem, overloaded);

        assert!(problem.route_feasible(0, &repaired.routes[0]));
        assert_eq!(repaired.unassigned.len(), 1);
    }
}
