use crate::domain::Location;

/// Returns the first location with `is_depot = true`, or `locations[0]` if
/// none is marked. Stateless.
pub fn resolve(locations: &[Location]) -> (&Location, usize) {
    match locations.iter().position(|l| l.is_depot) {
        Some(idx) => (&locations[idx], idx),
        None => (&locations[0], 0),
    }
}
