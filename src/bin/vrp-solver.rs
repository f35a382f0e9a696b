use std::error::Error;

use routeopt::cache::InMemoryCache;
use routeopt::config::Config;
use routeopt::{fixtures, optimize};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOCATION_COUNT: usize = 20;
const TIME_LIMIT_SECONDS: f64 = 5.0;

#[tokio::main]
#[tracing::instrument(name = "VRP Solver", level = "info")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_span_events(fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE).compact())
        .init();

    let config = Config::from_env();
    let cache = InMemoryCache::new();

    info!("Generating sample request with {} locations", LOCATION_COUNT);
    let sample = fixtures::generate_default(LOCATION_COUNT);

    let solution = optimize(
        &sample.locations,
        &sample.vehicles,
        &sample.deliveries,
        false,
        false,
        None,
        false,
        TIME_LIMIT_SECONDS,
        &config,
        &cache,
    )
    .await?;

    info!("status: {:?}", solution.status);
    info!("total_distance: {:.2} km", solution.total_distance);
    info!("total_cost: {:.2}", solution.total_cost);
    info!("vehicles used: {:?}", solution.assigned_vehicle_ids);
    info!("unassigned deliveries: {:?}", solution.unassigned_delivery_ids);

    for route in &solution.detailed_routes {
        println!(
            "{}: {} ({:.2} km, {:.0}% utilization)",
            route.vehicle_id,
            route.stops.join(" -> "),
            route.total_distance,
            route.capacity_utilization * 100.0
        );
    }

    Ok(())
}
