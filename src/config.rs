use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use tracing::{info, warn};

pub struct Config {
    pub redis_url: String,
    pub meili_url: String,
    pub meili_key: String,
    pub weather_url: String,
    pub weather_api_key: String,
    pub weather_timeout: Duration,
    pub bloom_capacity: u64,
    pub bloom_error_rate: f64,
}

impl Config {
    pub fn load() -> Self {
        Self {
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379"),
            meili_url: try_load("MEILI_URL", "http://127.0.0.1:7700"),
            meili_key: read_secret("MEILI_ADMIN_KEY"),
            weather_url: try_load("WEATHER_URL", "https://api.openweathermap.org"),
            weather_api_key: read_secret("WEATHER_API_KEY"),
            weather_timeout: Duration::from_millis(try_load("WEATHER_TIMEOUT_MS", "3000")),
            bloom_capacity: try_load("BLOOM_CAPACITY", "1000000"),
            bloom_error_rate: try_load("BLOOM_ERROR_RATE", "0.0001"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

fn read_secret(secret_name: &str) -> String {
    // Environment wins over the mounted secret file so local runs need no
    // secrets directory.
    if let Ok(value) = env::var(secret_name) {
        return value;
    }

    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
        })
        .expect("Secrets misconfigured!")
}
