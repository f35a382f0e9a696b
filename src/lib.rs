pub mod cache;
pub mod config;
pub mod distance;
pub mod domain;
pub mod error;
pub mod fixtures;
pub mod pipeline;
pub mod solver;

pub use domain::{Delivery, Location, Solution, Vehicle};
pub use error::{OptimizerError, Result};
pub use pipeline::optimizer::optimize;
pub use pipeline::rerouter::{reroute_for_delay, reroute_for_roadblock, reroute_for_traffic};

/// Trivial by design: the core holds no process-wide state beyond
/// configuration and the cache handle, neither of which this check touches.
pub fn health() -> &'static str {
    "healthy"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_reports_healthy() {
        assert_eq!(health(), "healthy");
    }
}
