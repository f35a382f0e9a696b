use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolutionStatus {
    Success,
    NoSolution,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSegment {
    pub from: String,
    pub to: String,
    pub path: Vec<String>,
    pub distance: f64,
    pub time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedRoute {
    pub vehicle_id: String,
    pub stops: Vec<String>,
    pub segments: Vec<RouteSegment>,
    pub total_distance: f64,
    pub total_time: f64,
    pub capacity_utilization: f64,
    pub estimated_arrival_minutes: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StatValue {
    Number(f64),
    Integer(i64),
    Text(String),
    Nested(HashMap<String, StatValue>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReroutingInfo {
    pub reason: String,
    pub original_total_distance: f64,
    pub new_total_distance: f64,
    pub completed_delivery_count: usize,
    pub rerouted_delivery_count: usize,
    pub payload: HashMap<String, StatValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub status: SolutionStatus,
    pub routes: Vec<Vec<String>>,
    pub total_distance: f64,
    pub total_cost: f64,
    pub assigned_vehicle_ids: Vec<String>,
    pub unassigned_delivery_ids: Vec<String>,
    pub detailed_routes: Vec<DetailedRoute>,
    pub statistics: HashMap<String, StatValue>,
}

impl Solution {
    pub fn error(message: impl Into<String>) -> Self {
        let mut statistics = HashMap::new();
        statistics.insert("error".to_string(), StatValue::Text(message.into()));
        Self {
            status: SolutionStatus::Error,
            routes: Vec::new(),
            total_distance: 0.0,
            total_cost: 0.0,
            assigned_vehicle_ids: Vec::new(),
            unassigned_delivery_ids: Vec::new(),
            detailed_routes: Vec::new(),
            statistics,
        }
    }

    pub fn no_solution(unassigned_delivery_ids: Vec<String>) -> Self {
        Self {
            status: SolutionStatus::NoSolution,
            routes: Vec::new(),
            total_distance: 0.0,
            total_cost: 0.0,
            assigned_vehicle_ids: Vec::new(),
            unassigned_delivery_ids,
            detailed_routes: Vec::new(),
            statistics: HashMap::new(),
        }
    }

    /// Attaches `rerouting_info` under `statistics["rerouting_info"]`.
    pub fn with_rerouting_info(mut self, info: ReroutingInfo) -> Self {
        let mut nested = HashMap::new();
        nested.insert(
            "reason".to_string(),
            StatValue::Text(info.reason.clone()),
        );
        nested.insert(
            "original_total_distance".to_string(),
            StatValue::Number(info.original_total_distance),
        );
        nested.insert(
            "new_total_distance".to_string(),
            StatValue::Number(info.new_total_distance),
        );
        nested.insert(
            "completed_delivery_count".to_string(),
            StatValue::Integer(info.completed_delivery_count as i64),
        );
        nested.insert(
            "rerouted_delivery_count".to_string(),
            StatValue::Integer(info.rerouted_delivery_count as i64),
        );
        for (k, v) in info.payload {
            nested.insert(k, v);
        }
        self.statistics
            .insert("rerouting_info".to_string(), StatValue::Nested(nested));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_solution_has_error_status_and_message() {
        let s = Solution::error("boom");
        assert_eq!(s.status, SolutionStatus::Error);
        assert_eq!(
            s.statistics.get("error"),
            Some(&StatValue::Text("boom".to_string()))
        );
    }

    #[test]
    fn no_solution_carries_unassigned_ids() {
        let s = Solution::no_solution(vec!["d1".to_string(), "d2".to_string()]);
        assert_eq!(s.status, SolutionStatus::NoSolution);
        assert_eq!(s.unassigned_delivery_ids.len(), 2);
    }

    #[test]
    fn serde_round_trip_preserves_equality() {
        let s = Solution::no_solution(vec!["d1".to_string()]);
        let json = serde_json::to_string(&s).expect("serialize");
        let back: Solution = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.status, s.status);
        assert_eq!(back.unassigned_delivery_ids, s.unassigned_delivery_ids);
    }
}
