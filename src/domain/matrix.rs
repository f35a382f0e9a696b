use crate::config::MAX_SAFE_DISTANCE;

/// A square `n x n` matrix of non-negative reals, indexed by a fixed
/// ordering of location IDs that travels alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub values: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn new(values: Vec<Vec<f64>>) -> Self {
        Self { values }
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }

    /// Sanitizes every entry:
    /// 1. non-finite -> `MAX_SAFE_DISTANCE`
    /// 2. negative -> 0 on the diagonal, else `MAX_SAFE_DISTANCE`
    /// 3. > `MAX_SAFE_DISTANCE` -> `MAX_SAFE_DISTANCE`
    /// 4. diagonal forced to 0
    pub fn sanitize(&self) -> Matrix {
        let n = self.values.len();
        let mut out = vec![vec![0.0; n]; n];
        for (i, row) in self.values.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                let mut v = value;
                if !v.is_finite() {
                    v = MAX_SAFE_DISTANCE;
                } else if v < 0.0 {
                    v = if i == j { 0.0 } else { MAX_SAFE_DISTANCE };
                } else if v > MAX_SAFE_DISTANCE {
                    v = MAX_SAFE_DISTANCE;
                }
                out[i][j] = v;
            }
            out[i][i] = 0.0;
        }
        Matrix::new(out)
    }

    /// Applies per-pair traffic factors, clamped to `[1.0, 5.0]`. Pure: does
    /// not mutate `self`.
    pub fn apply_traffic(&self, traffic: &std::collections::HashMap<(usize, usize), f64>) -> Matrix {
        let mut out = self.values.clone();
        for (&(i, j), &factor) in traffic {
            if i < out.len() && j < out[i].len() {
                let clamped = factor.clamp(1.0, 5.0);
                out[i][j] *= clamped;
            }
        }
        Matrix::new(out)
    }

    /// Converts to the node -> neighbor -> weight adjacency ShortestPath
    /// consumes. Entries equal to `MAX_SAFE_DISTANCE` are treated as "no
    /// edge" and omitted.
    pub fn to_graph(&self) -> std::collections::HashMap<usize, std::collections::HashMap<usize, f64>> {
        let mut graph = std::collections::HashMap::new();
        for (i, row) in self.values.iter().enumerate() {
            let mut neighbors = std::collections::HashMap::new();
            for (j, &weight) in row.iter().enumerate() {
                if i != j && weight < MAX_SAFE_DISTANCE {
                    neighbors.insert(j, weight);
                }
            }
            graph.insert(i, neighbors);
        }
        graph
    }

    /// Derives a travel-time matrix (minutes) from this distance matrix
    /// (kilometers) at a constant `speed_kmh`, for when time windows are
    /// requested but no provider-backed time matrix is available.
    pub fn derive_time_minutes(&self, speed_kmh: f64) -> Matrix {
        let values = self
            .values
            .iter()
            .map(|row| row.iter().map(|&km| km / speed_kmh * 60.0).collect())
            .collect();
        Matrix::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_non_finite_and_negative_entries() {
        let m = Matrix::new(vec![
            vec![0.0, f64::NAN, -1.0],
            vec![f64::INFINITY, 0.0, 2.0],
            vec![-5.0, 3.0, 0.0],
        ]);
        let s = m.sanitize();
        assert_eq!(s.get(0, 0), 0.0);
        assert_eq!(s.get(0, 1), MAX_SAFE_DISTANCE);
        assert_eq!(s.get(0, 2), MAX_SAFE_DISTANCE);
        assert_eq!(s.get(1, 0), MAX_SAFE_DISTANCE);
        assert_eq!(s.get(2, 0), 0.0); // diagonal forced to 0 regardless of input
        assert_eq!(s.get(1, 1), 0.0);
    }

    #[test]
    fn sanitize_caps_overlarge_entries() {
        let m = Matrix::new(vec![vec![0.0, MAX_SAFE_DISTANCE * 10.0], vec![1.0, 0.0]]);
        let s = m.sanitize();
        assert_eq!(s.get(0, 1), MAX_SAFE_DISTANCE);
    }

    #[test]
    fn sanitize_is_idempotent() {
        let m = Matrix::new(vec![vec![0.0, -1.0], vec![f64::NAN, 0.0]]);
        let once = m.sanitize();
        let twice = once.sanitize();
        assert_eq!(once, twice);
    }

    #[test]
    fn apply_traffic_never_decreases_and_is_pure() {
        let m = Matrix::new(vec![vec![0.0, 10.0], vec![10.0, 0.0]]);
        let mut traffic = std::collections::HashMap::new();
        traffic.insert((0, 1), 0.5); // clamped up to 1.0
        traffic.insert((1, 0), 3.0);
        let result = m.apply_traffic(&traffic);
        assert_eq!(result.get(0, 1), 10.0);
        assert_eq!(result.get(1, 0), 30.0);
        assert_eq!(m.get(0, 1), 10.0); // original untouched
    }

    #[test]
    fn derive_time_minutes_matches_nominal_speed() {
        let m = Matrix::new(vec![vec![0.0, 50.0], vec![50.0, 0.0]]);
        let time = m.derive_time_minutes(50.0);
        assert_eq!(time.get(0, 1), 60.0);
    }

    #[test]
    fn apply_traffic_with_empty_map_is_identity() {
        let m = Matrix::new(vec![vec![0.0, 5.0], vec![5.0, 0.0]]);
        let result = m.apply_traffic(&std::collections::HashMap::new());
        assert_eq!(result, m);
    }

    #[test]
    fn to_graph_omits_max_safe_distance_entries() {
        let m = Matrix::new(vec![
            vec![0.0, MAX_SAFE_DISTANCE, 4.0],
            vec![MAX_SAFE_DISTANCE, 0.0, 1.0],
            vec![4.0, 1.0, 0.0],
        ]);
        let graph = m.to_graph();
        assert!(!graph[&0].contains_key(&1));
        assert_eq!(graph[&0][&2], 4.0);
    }
}
