use super::model::{Candidate, Problem, Route};

/// Builds an initial candidate by inserting deliveries, highest-priority
/// first, at the cheapest feasible (vehicle, position) found.
pub fn construct_initial(problem: &Problem) -> Candidate {
    let mut routes: Vec<Route> = problem.vehicles.iter().map(|_| Route::default()).collect();
    let mut unassigned = Vec::new();

    let mut order: Vec<usize> = (0..problem.deliveries.len()).collect();
    order.sort_by(|&a, &b| {
        problem.deliveries[b]
            .priority
            .cmp(&problem.deliveries[a].priority)
            .then(problem.deliveries[b].demand.cmp(&problem.deliveries[a].demand))
    });

    for delivery in order {
        match cheapest_insertion(problem, &routes, delivery) {
            Some((vehicle, position)) => routes[vehicle].stops.insert(position, delivery),
            None => unassigned.push(delivery),
        }
    }

    let mut candidate = Candidate {
        routes,
        unassigned,
        cost: 0.0,
    };
    candidate.cost = problem.evaluate(&candidate);
    candidate
}

/// Finds the cheapest feasible insertion point for `delivery` across every
/// vehicle's route, or `None` if no vehicle can take it. Shared with
/// `solver::repair`, which reuses it to reinsert deliveries destroyed from
/// an overloaded route.
pub(super) fn cheapest_insertion(problem: &Problem, routes: &[Route], delivery: usize) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, f64)> = None;

    for (vehicle, route) in routes.iter().enumerate() {
        if !problem.vehicle_can_serve(vehicle, delivery) {
            continue;
        }
        for position in 0..=route.stops.len() {
            let mut candidate_route = route.clone();
            candidate_route.stops.insert(position, delivery);
            if !problem.route_feasible(vehicle, &candidate_route) {
                continue;
            }
            let cost = insertion_cost(problem, vehicle, route, position, delivery);
            if best.map(|(_, _, c)| cost < c).unwrap_or(true) {
                best = Some((vehicle, position, cost));
            }
        }
    }

    best.map(|(vehicle, position, _)| (vehicle, position))
}

/// Marginal distance added by inserting `delivery` at `position` in
/// `route` (before modification).
fn insertion_cost(problem: &Problem, vehicle: usize, route: &Route, position: usize, delivery: usize) -> f64 {
    let prev = if position == 0 {
        problem.vehicle_start[vehicle]
    } else {
        problem.delivery_location[route.stops[position - 1]]
    };
    let next = if position == route.stops.len() {
        problem.vehicle_end[vehicle]
    } else {
        problem.delivery_location[route.stops[position]]
    };
    let node = problem.delivery_location[delivery];

    problem.leg_km(prev, node) + problem.leg_km(node, next) - problem.leg_km(prev, next)
}
