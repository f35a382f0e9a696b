pub mod matrix;
pub mod solution;
pub mod types;

pub use matrix::Matrix;
pub use solution::{DetailedRoute, ReroutingInfo, RouteSegment, Solution, SolutionStatus, StatValue};
pub use types::{Delivery, Location, LocationPairFactor, MatrixIndex, TrafficInput, Vehicle};
