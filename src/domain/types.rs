use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::OptimizerError;

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_depot: bool,
    pub time_window_start: Option<f64>,
    pub time_window_end: Option<f64>,
    pub service_time: f64,
}

impl Location {
    pub fn validate(&self) -> Result<(), OptimizerError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(OptimizerError::InvalidInput(format!(
                "location {}: latitude {} out of range",
                self.id, self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(OptimizerError::InvalidInput(format!(
                "location {}: longitude {} out of range",
                self.id, self.longitude
            )));
        }
        if let (Some(start), Some(end)) = (self.time_window_start, self.time_window_end) {
            if start > end {
                return Err(OptimizerError::InvalidInput(format!(
                    "location {}: time window start {} after end {}",
                    self.id, start, end
                )));
            }
        }
        Ok(())
    }

    pub fn time_window(&self) -> Option<(f64, f64)> {
        match (self.time_window_start, self.time_window_end) {
            (Some(s), Some(e)) => Some((s, e)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub id: String,
    pub capacity: u64,
    pub start_location_id: String,
    pub end_location_id: String,
    pub cost_per_distance_unit: f64,
    pub fixed_cost: f64,
    pub max_distance: f64,
    pub max_stops: usize,
    pub available: bool,
    pub skills: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub id: String,
    pub location_id: String,
    pub demand: u64,
    pub priority: i64,
    pub required_skills: BTreeSet<String>,
    pub is_pickup: bool,
}

/// A geographic location's position in the fixed matrix ordering.
pub type MatrixIndex = usize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationPairFactor {
    pub from: String,
    pub to: String,
    pub factor: f64,
}

/// The two wire shapes traffic data may arrive in: an explicit list of
/// `(from, to, factor)` triples, or a map keyed by `"id_a:id_b"`. Both
/// normalize to the index-pair -> factor form `apply_traffic` consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrafficInput {
    LocationPairs { location_pairs: Vec<LocationPairFactor> },
    Segments { segments: HashMap<String, f64> },
}

impl TrafficInput {
    /// Resolves location IDs against `location_index` into matrix-index
    /// pairs. Entries naming an unknown location ID are dropped rather than
    /// failing the whole solve.
    pub fn normalize(&self, location_index: &HashMap<&str, usize>) -> HashMap<(usize, usize), f64> {
        let mut out = HashMap::new();
        match self {
            TrafficInput::LocationPairs { location_pairs } => {
                for entry in location_pairs {
                    if let (Some(&from), Some(&to)) = (
                        location_index.get(entry.from.as_str()),
                        location_index.get(entry.to.as_str()),
                    ) {
                        out.insert((from, to), entry.factor);
                    }
                }
            }
            TrafficInput::Segments { segments } => {
                for (key, &factor) in segments {
                    if let Some((from_id, to_id)) = key.split_once(':') {
                        if let (Some(&from), Some(&to)) =
                            (location_index.get(from_id), location_index.get(to_id))
                        {
                            out.insert((from, to), factor);
                        }
                    }
                }
            }
        }
        out
    }
}
