use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, span, Level};

use super::construction::construct_initial;
use super::diversification::{final_mutation, perform_rollback, steer_towards_best};
use super::model::{Candidate, Problem};
use super::neighborhood::find_neighbours;
use super::repair::destroy_and_recreate;
use super::tabu::{choose_best_candidate, insert_and_adjust_tabu_list};

/// Runs cheapest-arc construction followed by tabu search until
/// `time_limit_seconds` elapses, returning the best candidate found.
pub fn run(problem: &Problem, time_limit_seconds: f64) -> Candidate {
    let span = span!(Level::INFO, "tabu_search");
    let _guard = span.enter();

    let deadline = Duration::from_secs_f64(time_limit_seconds.max(0.0));
    let start = Instant::now();

    let initial = construct_initial(problem);
    info!(cost = initial.cost, "initial solution constructed");

    if problem.deliveries.is_empty() || deadline.is_zero() {
        return initial;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(problem.config.search_seed);
    let mut current = initial.clone();
    let mut best_so_far = initial;
    let mut cost_history: Vec<f64> = Vec::new();

    let mut tabu_list: VecDeque<(usize, usize)> = VecDeque::new();
    let mut tabu_list_len = problem.config.tabu_list_initial_len;
    let mut parent_key: Option<(usize, usize)> = None;

    let mut stagnation = 0usize;
    let mut iteration = 0usize;

    loop {
        if start.elapsed() >= deadline {
            break;
        }
        iteration += 1;

        cost_history.push(current.cost);

        let neighbours = find_neighbours(&current, problem);
        let Some((chosen_cost, chosen_move)) =
            choose_best_candidate(&neighbours, &tabu_list, best_so_far.cost, problem.config.aspiration_threshold, parent_key, &current)
        else {
            break;
        };

        let key = chosen_move.key(&current);
        let mut next = Candidate {
            routes: chosen_move.apply(&current),
            unassigned: current.unassigned.clone(),
            cost: chosen_cost,
        };
        if let super::neighborhood::Move::Relocate { delivery, .. } = chosen_move {
            next.unassigned.retain(|&d| d != delivery);
        }

        insert_and_adjust_tabu_list(&mut tabu_list, key, tabu_list_len);
        parent_key = Some(key);

        if next.cost < best_so_far.cost {
            best_so_far = next.clone();
            debug!(iteration, cost = best_so_far.cost, "new best");
            stagnation = 0;
        } else {
            stagnation += 1;
        }

        if iteration % problem.config.mutate_to_best_period == 0
            && cost_history.len() > tabu_list_len.saturating_mul(4)
        {
            next = perform_rollback(&cost_history, tabu_list_len, next, &best_so_far);
        } else if iteration % problem.config.mutate_steer_best_period == 0 {
            let fraction = rng.gen_range(0.05..0.3);
            let num_changes = ((next.unassigned.len().max(problem.deliveries.len() / 10) as f64) * fraction).ceil() as usize;
            steer_towards_best(problem, &mut next, &best_so_far, num_changes.max(1), &mut rng);
        }

        if iteration % problem.config.mutate_tabu_len_period == 0
            && problem.config.tabu_list_lower_bound < problem.config.tabu_list_upper_bound
        {
            tabu_list_len = rng.gen_range(problem.config.tabu_list_lower_bound..problem.config.tabu_list_upper_bound);
        }

        if rng.gen::<f64>() < 0.1 {
            final_mutation(problem, &mut next, &mut rng);
        }

        let has_defect = next
            .routes
            .iter()
            .enumerate()
            .any(|(v, r)| !problem.route_feasible(v, r));
        if has_defect {
            debug!(iteration, "repairing infeasible candidate");
            next = destroy_and_recreate(problem, next);
        }

        if next.cost < best_so_far.cost {
            best_so_far = next.clone();
            debug!(iteration, cost = best_so_far.cost, "new best after repair");
            stagnation = 0;
        }

        current = next;

        if stagnation >= problem.config.max_stagnant_iterations {
            debug!(iteration, "stopping early: stagnated");
            break;
        }
    }

    info!(iterations = iteration, cost = best_so_far.cost, "search complete");
    best_so_far
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
    fn zero_time_limit_returns_initial_solution() {
        let locations = vec![loc("depot"), loc("a")];
        let vehicles = vec![vehicle("v1", 10)];
        let deliveries = vec![delivery("d1", "a", 1)];
        let distance = Matrix::new(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        let config = Config::default();
        let problem = Problem::new(&distance, None, &locations, &vehicles, &deliveries, 0, false, &config);
        let result = run(&problem, 0.0);
        assert_eq!(result.routes[0].stops, vec![0]);
    }

    #[test]
    fn short_search_improves_or_matches_initial_and_stays_feasible() {
        let locations = vec![loc("depot"), loc("a"), loc("b"), loc("c")];
        let vehicles = vec![vehicle("v1", 3), vehicle("v2", 3)];
        let deliveries = vec![delivery("d1", "a", 1), delivery("d2", "b", 1), delivery("d3", "c", 1)];
        let distance = Matrix::new(vec![
            vec![0.0, 1.0, 2.0, 3.0],
            vec![1.0, 0.0, 1.0, 2.0],
            vec![2.0, 1.0, 0.0, 1.0],
            vec![3.0, 2.0, 1.0, 0.0],
        ]);
        let config = Config::default();
        let problem = Problem::new(&distance, None, &locations, &vehicles, &deliveries, 0, false, &config);
        let result = run(&problem, 0.2);
        for (v, route) in result.routes.iter().enumerate() {
            assert!(problem.route_feasible(v, route));
        }
        let mut placed: Vec<usize> = result.routes.iter().flat_map(|r| r.stops.clone()).collect();
        placed.extend(result.unassigned.iter().copied());
        placed.sort_unstable();
        assert_eq!(placed, vec![0, 1, 2]);
    }
}
