use std::collections::HashMap;

use crate::config::Config;
use crate::domain::{Delivery, Location, Matrix, Vehicle};

/// One vehicle's assigned delivery sequence. Delivery indices refer into
/// `Problem::deliveries`; depot endpoints are implicit (start/end of every
/// vehicle's route) and not stored here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    pub stops: Vec<usize>,
}

/// A candidate solution: one route per vehicle (by index into
/// `Problem::vehicles`) plus deliveries that could not be placed.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub routes: Vec<Route>,
    pub unassigned: Vec<usize>,
    pub cost: f64,
}

/// Read-only view over one solve's inputs, built once by
/// `solver::solve`/`solve_with_time_windows`.
pub struct Problem<'a> {
    pub distance: &'a Matrix,
    pub time: Option<&'a Matrix>,
    pub locations: &'a [Location],
    pub vehicles: &'a [Vehicle],
    pub deliveries: &'a [Delivery],
    pub depot_index: usize,
    pub location_index: HashMap<&'a str, usize>,
    pub vehicle_start: Vec<usize>,
    pub vehicle_end: Vec<usize>,
    pub delivery_location: Vec<usize>,
    pub consider_time_windows: bool,
    pub config: &'a Config,
}

impl<'a> Problem<'a> {
    pub fn new(
        distance: &'a Matrix,
        time: Option<&'a Matrix>,
        locations: &'a [Location],
        vehicles: &'a [Vehicle],
        deliveries: &'a [Delivery],
        depot_index: usize,
        consider_time_windows: bool,
        config: &'a Config,
    ) -> Self {
        let location_index: HashMap<&str, usize> = locations
            .iter()
            .enumerate()
            .map(|(i, l)| (l.id.as_str(), i))
            .collect();

        let vehicle_start = vehicles
            .iter()
            .map(|v| {
                *location_index
                    .get(v.start_location_id.as_str())
                    .unwrap_or(&depot_index)
            })
            .collect();
        let vehicle_end = vehicles
            .iter()
            .map(|v| {
                *location_index
                    .get(v.end_location_id.as_str())
                    .unwrap_or(&depot_index)
            })
            .collect();
        let delivery_location = deliveries
            .iter()
            .map(|d| {
                *location_index
                    .get(d.location_id.as_str())
                    .unwrap_or(&depot_index)
            })
            .collect();

        Self {
            distance,
            time,
            locations,
            vehicles,
            deliveries,
            depot_index,
            location_index,
            vehicle_start,
            vehicle_end,
            delivery_location,
            consider_time_windows,
            config,
        }
    }

    pub fn scaled_demand(&self, demand: u64) -> i64 {
        ((demand as f64) * self.config.capacity_scaling_factor).round() as i64
    }

    pub fn vehicle_distance_bound_km(&self, vehicle: usize) -> f64 {
        self.vehicles[vehicle]
            .max_distance
            .min(self.config.max_route_distance_unscaled)
    }

    pub fn vehicle_time_bound_minutes(&self) -> f64 {
        self.config.max_route_duration_unscaled
    }

    pub fn vehicle_can_serve(&self, vehicle: usize, delivery: usize) -> bool {
        self.vehicles[vehicle].available
            && self.vehicles[vehicle]
                .skills
                .is_superset(&self.deliveries[delivery].required_skills)
    }

    /// Distance (km) between two matrix indices.
    pub fn leg_km(&self, from: usize, to: usize) -> f64 {
        self.distance.get(from, to)
    }

    /// Total route distance (km), depot-to-depot, for `vehicle`'s `route`.
    pub fn route_distance_km(&self, vehicle: usize, route: &Route) -> f64 {
        let mut total = 0.0;
        let mut prev = self.vehicle_start[vehicle];
        for &d in &route.stops {
            let loc = self.delivery_location[d];
            total += self.leg_km(prev, loc);
            prev = loc;
        }
        total += self.leg_km(prev, self.vehicle_end[vehicle]);
        total
    }

    /// Net scaled demand carried after each stop (deliveries add, pickups
    /// release). Returns `None` if the running load would exceed the
    /// vehicle's capacity at any point.
    pub fn route_capacity_profile(&self, vehicle: usize, route: &Route) -> Option<Vec<i64>> {
        let capacity = self.scaled_demand(self.vehicles[vehicle].capacity);
        let mut running = 0i64;
        let mut profile = Vec::with_capacity(route.stops.len());
        for &d in &route.stops {
            let demand = self.scaled_demand(self.deliveries[d].demand);
            running = if self.deliveries[d].is_pickup {
                (running - demand).max(0)
            } else {
                running + demand
            };
            if running > capacity {
                return None;
            }
            profile.push(running);
        }
        Some(profile)
    }

    /// Arrival time (minutes from the implicit epoch) at each stop,
    /// including waiting time (slack) to satisfy a not-yet-open time
    /// window. Returns `None` if a stop is reached after its window closes.
    pub fn route_arrivals_minutes(&self, vehicle: usize, route: &Route) -> Option<Vec<f64>> {
        let time_matrix = self.time?;
        let mut arrivals = Vec::with_capacity(route.stops.len());
        let mut clock = 0.0;
        let mut prev = self.vehicle_start[vehicle];
        for &d in &route.stops {
            let loc = self.delivery_location[d];
            clock += time_matrix.get(prev, loc);
            if let Some((start, end)) = self.locations[loc].time_window() {
                if clock > end {
                    return None;
                }
                if clock < start {
                    clock = start;
                }
            }
            arrivals.push(clock);
            clock += self.locations[loc].service_time;
            prev = loc;
        }
        Some(arrivals)
    }

    /// Whether `route` is feasible for `vehicle`: capacity, distance,
    /// max_stops, skills, and (when `consider_time_windows`) time windows
    /// plus total route duration.
    pub fn route_feasible(&self, vehicle: usize, route: &Route) -> bool {
        if route.stops.len() > self.vehicles[vehicle].max_stops {
            return false;
        }
        if route
            .stops
            .iter()
            .any(|&d| !self.vehicle_can_serve(vehicle, d))
        {
            return false;
        }
        if self.route_capacity_profile(vehicle, route).is_none() {
            return false;
        }
        let distance_bound = self.vehicle_distance_bound_km(vehicle);
        if self.route_distance_km(vehicle, route) > distance_bound + 1e-6 {
            return false;
        }
        if self.consider_time_windows {
            match self.route_arrivals_minutes(vehicle, route) {
                None => return false,
                Some(arrivals) => {
                    if self.route_duration_minutes(vehicle, route, &arrivals) > self.vehicle_time_bound_minutes() + 1e-6
                    {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Total elapsed time (minutes) from the vehicle's start to its return,
    /// given the arrival times already computed for each stop.
    fn route_duration_minutes(&self, vehicle: usize, route: &Route, arrivals: &[f64]) -> f64 {
        let Some(time_matrix) = self.time else {
            return 0.0;
        };
        let Some(&last_stop) = route.stops.last() else {
            return 0.0;
        };
        let last_loc = self.delivery_location[last_stop];
        let last_departure = arrivals.last().copied().unwrap_or(0.0) + self.locations[last_loc].service_time;
        last_departure + time_matrix.get(last_loc, self.vehicle_end[vehicle])
    }

    /// Penalty charged for leaving `delivery` unassigned: proportional to
    /// its priority so higher-priority deliveries are fought harder for.
    pub fn drop_penalty(&self, delivery: usize) -> f64 {
        let priority = self.deliveries[delivery].priority.max(0) as f64;
        (priority + 1.0) * self.config.max_route_distance_unscaled
    }

    /// The search objective: total route distance, plus a global span term
    /// penalizing the max-minus-min per-vehicle cumulative distance (load
    /// balance), plus drop penalties for unassigned deliveries.
    pub fn evaluate(&self, candidate: &Candidate) -> f64 {
        let mut total_distance = 0.0;
        let mut min_cumulative = f64::INFINITY;
        let mut max_cumulative = 0.0_f64;

        for (vehicle, route) in candidate.routes.iter().enumerate() {
            let dist = self.route_distance_km(vehicle, route);
            total_distance += dist;
            if !route.stops.is_empty() {
                min_cumulative = min_cumulative.min(dist);
                max_cumulative = max_cumulative.max(dist);
            }
        }
        if !min_cumulative.is_finite() {
            min_cumulative = 0.0;
        }

        let span = (max_cumulative - min_cumulative).max(0.0);
        let balance_penalty =
            span * (self.config.cost_coefficient_for_load_balance as f64) / self.config.distance_scaling_factor;

        let drop_penalty: f64 = candidate.unassigned.iter().map(|&d| self.drop_penalty(d)).sum();

        total_distance + balance_penalty + drop_penalty
    }
}
