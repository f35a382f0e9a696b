use rand::seq::IteratorRandom;
use rand_chacha::ChaCha8Rng;

use super::model::{Candidate, Problem};

/// If the last `len_tabu_list * 4` recorded costs show a net-improving
/// trend and `current` has drifted from `best_so_far`, jump back to
/// `best_so_far` to escape a worsening trajectory.
pub fn perform_rollback(
    cost_history: &[f64],
    len_tabu_list: usize,
    current: Candidate,
    best_so_far: &Candidate,
) -> Candidate {
    let needed = len_tabu_list.saturating_mul(4);
    if cost_history.len() < needed + 1 {
        return current;
    }

    let start = cost_history.len() - needed;
    let mut overall_reduction = 0.0;
    for i in (start + 1)..cost_history.len() {
        overall_reduction += cost_history[i - 1] - cost_history[i];
    }

    if overall_reduction > 0.0 && current.routes != best_so_far.routes {
        best_so_far.clone()
    } else {
        current
    }
}

/// Nudges `current` towards `best_so_far`'s vehicle assignment for
/// `num_changes` randomly chosen deliveries from `best_so_far`'s routes:
/// each chosen delivery is relocated (within `current`) onto the vehicle
/// `best_so_far` placed it on, if that vehicle can still take it.
pub fn steer_towards_best(
    problem: &Problem,
    current: &mut Candidate,
    best_so_far: &Candidate,
    num_changes: usize,
    rng: &mut ChaCha8Rng,
) {
    let placed_in_best: Vec<(usize, usize)> = best_so_far
        .routes
        .iter()
        .enumerate()
        .flat_map(|(v, r)| r.stops.iter().map(move |&d| (d, v)))
        .collect();

    for &(delivery, target_vehicle) in placed_in_best.iter().choose_multiple(rng, num_changes) {
        if !problem.vehicle_can_serve(target_vehicle, delivery) {
            continue;
        }
        for route in current.routes.iter_mut() {
            route.stops.retain(|&d| d != delivery);
        }
        let insert_at = current.routes[target_vehicle].stops.len();
        current.routes[target_vehicle].stops.push(delivery);
        if !problem.route_feasible(target_vehicle, &current.routes[target_vehicle]) {
            current.routes[target_vehicle].stops.remove(insert_at);
            current.unassigned.push(delivery);
        }
    }
    current.unassigned.sort_unstable();
    current.unassigned.dedup();
    current.cost = problem.evaluate(current);
}

/// Randomly reverses a segment of one vehicle's route, then (if it still
/// has 3+ stops) performs a 3-opt-style double swap, to diversify a
/// candidate that local search has stopped improving.
pub fn final_mutation(problem: &Problem, candidate: &mut Candidate, rng: &mut ChaCha8Rng) {
    let mutable_vehicles: Vec<usize> = (0..candidate.routes.len())
        .filter(|&v| candidate.routes[v].stops.len() >= 2)
        .collect();
    let Some(&vehicle) = mutable_vehicles.iter().choose(rng) else {
        return;
    };

    let n = candidate.routes[vehicle].stops.len();
    let mut pair: Vec<usize> = (0..n).choose_multiple(rng, 2);
    pair.sort_unstable();
    let (a, b) = (pair[0], pair[1]);
    candidate.routes[vehicle].stops[a..=b].reverse();

    if n >= 3 {
        let mut triple: Vec<usize> = (0..n).choose_multiple(rng, 3);
        triple.sort_unstable();
        let (x, y, z) = (triple[0], triple[1], triple[2]);
        candidate.routes[vehicle].stops.swap(x, y);
        candidate.routes[vehicle].stops.swap(y, z);
    }

    // An infeasible route here is expected and recovered by
    // `solver::repair::destroy_and_recreate` on the next search iteration.
    candidate.cost = problem.evaluate(candidate);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::domain::{Delivery, Location, Matrix, Vehicle};
    use rand::SeedableRng;
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

    fn vehicle(id: &str) -> Vehicle {
        Vehicle {
            id: id.to_string(),
            capacity: 100,
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

    fn delivery(id: &str, location_id: &str) -> Delivery {
        Delivery {
            id: id.to_string(),
            location_id: location_id.to_string(),
            demand: 1,
            priority: 0,
            required_skills: BTreeSet::new(),
            is_pickup: false,
        }
    }

    #[test]
    fn rollback_is_noop_without_enough_history() {
        use super::super::model::Route;
        let current = Candidate {
            routes: vec![Route { stops: vec![0] }],
            unassigned: vec![],
            cost: 5.0,
        };
        let best = current.clone();
        let result = perform_rollback(&[1.0, 2.0], 20, current.clone(), &best);
        assert_eq!(result.routes, current.routes);
    }

    #[test]
    fn final_mutation_keeps_same_stop_set() {
        let locations = vec![loc("depot"), loc("a"), loc("b"), loc("c")];
        let vehicles = vec![vehicle("v1")];
        let deliveries = vec![
            delivery("d1", "a"),
            delivery("d2", "b"),
            delivery("d3", "c"),
        ];
        let distance = Matrix::new(vec![vec![0.0; 4]; 4]);
        let config = Config::default();
        let problem = Problem::new(&distance, None, &locations, &vehicles, &deliveries, 0, false, &config);
        use super::super::model::Route;
        let mut candidate = Candidate {
            routes: vec![Route { stops: vec![0, 1, 2] }],
            unassigned: vec![],
            cost: 0.0,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        final_mutation(&problem, &mut candidate, &mut rng);
        let mut stops = candidate.routes[0].stops.clone();
        stops.sort_unstable();
        assert_eq!(stops, vec![0, 1, 2]);
    }
}
