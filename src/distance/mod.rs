pub mod depot;
pub mod haversine;
pub mod matrix;
pub mod providers;
pub mod shortest_path;

pub use depot::resolve as resolve_depot;
pub use matrix::build;
pub use shortest_path::{all_pairs, shortest_path, Graph, PathResult};
