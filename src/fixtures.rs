use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::domain::{Delivery, Location, Vehicle};

const DEFAULT_SEED: u64 = 64;
const DEFAULT_VEHICLE_CAPACITIES: &[u64] = &[20, 20, 15];

/// A randomly generated but reproducible request: one depot, `num_locations`
/// customer locations scattered within `radius_km` of it, a delivery at
/// each customer location, and one vehicle per entry in
/// `DEFAULT_VEHICLE_CAPACITIES`.
pub struct SampleInstance {
    pub locations: Vec<Location>,
    pub vehicles: Vec<Vehicle>,
    pub deliveries: Vec<Delivery>,
}

/// Generates a `SampleInstance` seeded by `seed`, so repeated calls with
/// the same arguments always produce the same request.
pub fn generate(num_locations: usize, center: (f64, f64), radius_km: f64, seed: u64) -> SampleInstance {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut locations = Vec::with_capacity(num_locations + 1);
    locations.push(Location {
        id: "depot".to_string(),
        latitude: center.0,
        longitude: center.1,
        is_depot: true,
        time_window_start: None,
        time_window_end: None,
        service_time: 0.0,
    });

    for i in 0..num_locations {
        let (lat, lon) = jitter(center, radius_km, &mut rng);
        locations.push(Location {
            id: format!("loc-{i}"),
            latitude: lat,
            longitude: lon,
            is_depot: false,
            time_window_start: None,
            time_window_end: None,
            service_time: 5.0,
        });
    }

    let vehicles = DEFAULT_VEHICLE_CAPACITIES
        .iter()
        .enumerate()
        .map(|(i, &capacity)| Vehicle {
            id: format!("vehicle-{i}"),
            capacity,
            start_location_id: "depot".to_string(),
            end_location_id: "depot".to_string(),
            cost_per_distance_unit: 1.0,
            fixed_cost: 10.0,
            max_distance: 500.0,
            max_stops: 25,
            available: true,
            skills: BTreeSet::new(),
        })
        .collect();

    let deliveries = (0..num_locations)
        .map(|i| Delivery {
            id: format!("delivery-{i}"),
            location_id: format!("loc-{i}"),
            demand: rng.gen_range(1..=5),
            priority: rng.gen_range(1..=10),
            required_skills: BTreeSet::new(),
            is_pickup: false,
        })
        .collect();

    SampleInstance {
        locations,
        vehicles,
        deliveries,
    }
}

/// Uses `default_seed` for reproducible demo output.
pub fn generate_default(num_locations: usize) -> SampleInstance {
    generate(num_locations, (1.3521, 103.8198), 15.0, DEFAULT_SEED)
}

/// Offsets `center` by a random bearing and distance up to `radius_km`,
/// treating degrees as locally flat (fine at demo scale; not used by the
/// solver itself, which always measures via Haversine/the matrix).
fn jitter(center: (f64, f64), radius_km: f64, rng: &mut ChaCha8Rng) -> (f64, f64) {
    const KM_PER_DEGREE_LAT: f64 = 111.0;
    let bearing = rng.gen_range(0.0..std::f64::consts::TAU);
    let distance = rng.gen_range(0.0..radius_km);
    let dlat = (distance * bearing.cos()) / KM_PER_DEGREE_LAT;
    let km_per_degree_lon = KM_PER_DEGREE_LAT * center.0.to_radians().cos().max(0.1);
    let dlon = (distance * bearing.sin()) / km_per_degree_lon;
    (center.0 + dlat, center.1 + dlon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_is_deterministic_for_the_same_seed() {
        let a = generate(5, (1.0, 103.0), 10.0, 42);
        let b = generate(5, (1.0, 103.0), 10.0, 42);
        assert_eq!(a.locations.len(), b.locations.len());
        for (la, lb) in a.locations.iter().zip(b.locations.iter()) {
            assert_eq!(la.id, lb.id);
            assert_eq!(la.latitude, lb.latitude);
            assert_eq!(la.longitude, lb.longitude);
        }
    }

    #[test]
    fn generate_produces_one_depot_and_n_customers() {
        let sample = generate(10, (1.0, 103.0), 10.0, 1);
        assert_eq!(sample.locations.len(), 11);
        assert_eq!(sample.locations.iter().filter(|l| l.is_depot).count(), 1);
        assert_eq!(sample.deliveries.len(), 10);
    }

    #[test]
    fn generated_locations_are_within_valid_coordinate_ranges() {
        let sample = generate(20, (1.0, 103.0), 10.0, 7);
        for location in &sample.locations {
            assert!(location.validate().is_ok());
        }
    }
}
