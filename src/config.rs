use std::env;
use std::time::Duration;

/// Large finite sentinel standing in for "unreachable"/"invalid" distances.
pub const MAX_SAFE_DISTANCE: f64 = 1.0e7;

/// Which external distance/time provider `distance::matrix::build` dispatches
/// to in API mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceProvider {
    Google,
    Osrm,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `None` disables the Google Distance Matrix provider.
    pub google_maps_api_key: Option<String>,
    pub distance_provider: DistanceProvider,
    /// OSRM table endpoint (self-hosted or the public demo server).
    pub osrm_base_url: String,
    /// Whether `Optimizer::optimize` should default to API-backed distances
    /// when the caller does not explicitly set `use_api`.
    pub use_api_by_default: bool,
    pub max_retries: u32,
    pub backoff_factor: f64,
    pub retry_delay: Duration,
    pub cache_expiry_days: i64,
    pub optimization_result_cache_timeout: Duration,
    /// When true, providers never hit the network and deterministically fall
    /// back to Haversine; used by tests and CI.
    pub testing: bool,

    /// Fallback travel speed (km/h) used to derive a time matrix from
    /// distances when time windows are requested but no time matrix was
    /// returned (the Haversine path never produces one).
    pub nominal_speed_kmh: f64,

    pub distance_scaling_factor: f64,
    pub capacity_scaling_factor: f64,

    pub max_route_distance_unscaled: f64,
    pub max_route_duration_unscaled: f64,

    pub cost_coefficient_for_load_balance: i64,

    pub search_seed: u64,
    pub aspiration_threshold: f64,
    pub tabu_list_initial_len: usize,
    pub tabu_list_lower_bound: usize,
    pub tabu_list_upper_bound: usize,
    pub mutate_to_best_period: usize,
    pub mutate_steer_best_period: usize,
    pub mutate_tabu_len_period: usize,
    pub max_stagnant_iterations: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            google_maps_api_key: None,
            distance_provider: DistanceProvider::Google,
            osrm_base_url: "https://router.project-osrm.org/table/v1/driving".to_string(),
            use_api_by_default: false,
            max_retries: 3,
            backoff_factor: 2.0,
            retry_delay: Duration::from_secs(1),
            cache_expiry_days: 7,
            optimization_result_cache_timeout: Duration::from_secs(300),
            testing: false,
            nominal_speed_kmh: 50.0,
            distance_scaling_factor: 100.0,
            capacity_scaling_factor: 1.0,
            max_route_distance_unscaled: 1_000.0,
            max_route_duration_unscaled: 24.0 * 60.0,
            cost_coefficient_for_load_balance: 100,
            search_seed: 64,
            aspiration_threshold: 20.0,
            tabu_list_initial_len: 20,
            tabu_list_lower_bound: 11,
            tabu_list_upper_bound: 29,
            mutate_to_best_period: 50,
            mutate_steer_best_period: 40,
            mutate_tabu_len_period: 20,
            max_stagnant_iterations: 500,
        }
    }
}

impl Config {
    /// Loads configuration from the environment, falling back to
    /// [`Config::default`] for anything unset or unparsable.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        Self {
            google_maps_api_key: env::var("GOOGLE_MAPS_API_KEY").ok(),
            distance_provider: match env::var("DISTANCE_PROVIDER").ok().as_deref() {
                Some("osrm") => DistanceProvider::Osrm,
                _ => defaults.distance_provider,
            },
            osrm_base_url: env::var("OSRM_BASE_URL").unwrap_or(defaults.osrm_base_url),
            use_api_by_default: parse_bool_env("USE_API_BY_DEFAULT", defaults.use_api_by_default),
            max_retries: parse_env("MAX_RETRIES", defaults.max_retries),
            backoff_factor: parse_env("BACKOFF_FACTOR", defaults.backoff_factor),
            retry_delay: Duration::from_secs_f64(parse_env(
                "RETRY_DELAY_SECONDS",
                defaults.retry_delay.as_secs_f64(),
            )),
            cache_expiry_days: parse_env("CACHE_EXPIRY_DAYS", defaults.cache_expiry_days),
            optimization_result_cache_timeout: Duration::from_secs_f64(parse_env(
                "OPTIMIZATION_RESULT_CACHE_TIMEOUT",
                defaults.optimization_result_cache_timeout.as_secs_f64(),
            )),
            testing: parse_bool_env("TESTING", defaults.testing),
            ..defaults
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_bool_env(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.distance_scaling_factor, 100.0);
        assert_eq!(cfg.capacity_scaling_factor, 1.0);
        assert!(!cfg.use_api_by_default);
        assert!(!cfg.testing);
    }

    #[test]
    fn parse_bool_env_accepts_common_truthy_forms() {
        std::env::set_var("ROUTEOPT_TEST_BOOL", "TRUE");
        assert!(parse_bool_env("ROUTEOPT_TEST_BOOL", false));
        std::env::remove_var("ROUTEOPT_TEST_BOOL");
    }
}
