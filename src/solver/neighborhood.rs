use itertools::Itertools;
use rayon::prelude::*;

use super::model::{Candidate, Problem, Route};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Swap {
        a: (usize, usize),
        b: (usize, usize),
    },
    Relocate {
        delivery: usize,
        to_vehicle: usize,
        to_position: usize,
    },
}

impl Move {
    /// A normalized key used for tabu-list membership: the (unordered)
    /// pair of delivery indices the move touches.
    pub fn key(&self, candidate: &Candidate) -> (usize, usize) {
        match *self {
            Move::Swap { a, b } => {
                let da = candidate.routes[a.0].stops[a.1];
                let db = candidate.routes[b.0].stops[b.1];
                if da < db {
                    (da, db)
                } else {
                    (db, da)
                }
            }
            Move::Relocate { delivery, .. } => (delivery, delivery),
        }
    }

    /// Applies this move to a clone of `candidate`'s routes, returning the
    /// resulting route set. The caller re-evaluates feasibility/cost.
    pub fn apply(&self, candidate: &Candidate) -> Vec<Route> {
        let mut routes = candidate.routes.clone();
        match *self {
            Move::Swap { a, b } => {
                if a.0 == b.0 {
                    routes[a.0].stops.swap(a.1, b.1);
                } else {
                    let delivery_a = routes[a.0].stops[a.1];
                    let delivery_b = routes[b.0].stops[b.1];
                    routes[a.0].stops[a.1] = delivery_b;
                    routes[b.0].stops[b.1] = delivery_a;
                }
            }
            Move::Relocate {
                delivery,
                to_vehicle,
                to_position,
            } => {
                for route in routes.iter_mut() {
                    route.stops.retain(|&d| d != delivery);
                }
                let insert_at = to_position.min(routes[to_vehicle].stops.len());
                routes[to_vehicle].stops.insert(insert_at, delivery);
            }
        }
        routes
    }
}

/// Generates swap and relocate moves, scores each by the resulting
/// objective (distance + load-balance span + drop penalties),
/// and returns them sorted best-first.
pub fn find_neighbours(candidate: &Candidate, problem: &Problem) -> Vec<(f64, Move)> {
    let occupied: Vec<(usize, usize)> = candidate
        .routes
        .iter()
        .enumerate()
        .flat_map(|(v, r)| (0..r.stops.len()).map(move |p| (v, p)))
        .collect();

    let swap_pairs: Vec<(usize, usize)> = (0..occupied.len()).tuple_combinations().collect();

    let mut scored: Vec<(f64, Move)> = swap_pairs
        .par_iter()
        .filter_map(|&(i, j)| {
            let mv = Move::Swap {
                a: occupied[i],
                b: occupied[j],
            };
            score_move(problem, candidate, &mv)
        })
        .collect();

    let relocation_targets: Vec<(usize, usize, usize)> = candidate
        .unassigned
        .iter()
        .copied()
        .chain((0..problem.deliveries.len()).filter(|d| {
            candidate
                .routes
                .iter()
                .any(|route| route.stops.contains(d))
        }))
        .flat_map(|delivery| {
            candidate.routes.iter().enumerate().flat_map(move |(v, r)| {
                (0..=r.stops.len()).map(move |p| (delivery, v, p))
            })
        })
        .collect();

    let relocated: Vec<(f64, Move)> = relocation_targets
        .par_iter()
        .filter_map(|&(delivery, to_vehicle, to_position)| {
            let mv = Move::Relocate {
                delivery,
                to_vehicle,
                to_position,
            };
            score_move(problem, candidate, &mv)
        })
        .collect();

    scored.extend(relocated);
    scored.par_sort_by(|a, b| a.0.total_cmp(&b.0));
    scored
}

fn score_move(problem: &Problem, candidate: &Candidate, mv: &Move) -> Option<(f64, Move)> {
    let routes = mv.apply(candidate);
    let affected: Vec<usize> = match *mv {
        Move::Swap { a, b } => vec![a.0, b.0],
        Move::Relocate { to_vehicle, .. } => vec![to_vehicle],
    };
    for vehicle in affected {
        if !problem.route_feasible(vehicle, &routes[vehicle]) {
            return None;
        }
    }

    let mut unassigned = candidate.unassigned.clone();
    if let Move::Relocate { delivery, .. } = *mv {
        unassigned.retain(|&d| d != delivery);
    }

    let trial = Candidate {
        routes,
        unassigned,
        cost: 0.0,
    };
    let cost = problem.evaluate(&trial);
    Some((cost, *mv))
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
    fn finds_a_feasible_swap_between_two_vehicles() {
        let locations = vec![loc("depot"), loc("a"), loc("b")];
        let vehicles = vec![vehicle("v1", 10), vehicle("v2", 10)];
        let deliveries = vec![delivery("d1", "a", 1), delivery("d2", "b", 1)];
        let distance = Matrix::new(vec![
            vec![0.0, 5.0, 1.0],
            vec![5.0, 0.0, 4.0],
            vec![1.0, 4.0, 0.0],
        ]);
        let config = Config::default();
        let problem = Problem::new(&distance, None, &locations, &vehicles, &deliveries, 0, false, &config);
        let candidate = Candidate {
            routes: vec![Route { stops: vec![0] }, Route { stops: vec![1] }],
            unassigned: vec![],
            cost: 0.0,
        };
        let moves = find_neighbours(&candidate, &problem);
        assert!(!moves.is_empty());
    }
}
