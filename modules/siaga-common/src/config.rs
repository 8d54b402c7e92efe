use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // HERE geocoding
    pub here_api_key: String,
    pub here_lang: String,

    // Proximity defaults
    pub default_radius_km: f64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            here_api_key: required_env("HERE_API_KEY"),
            here_lang: env::var("HERE_LANG").unwrap_or_else(|_| "id".to_string()),
            default_radius_km: env::var("SIAGA_DEFAULT_RADIUS_KM")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("SIAGA_DEFAULT_RADIUS_KM must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
