//! # Weather
//!
//! TTL-bound cache in front of the geolocation weather provider. A cache
//! hit returns the stored payload unchanged; a miss fetches with a bounded
//! timeout and stores the payload for one hour. Every provider failure
//! surfaces as an explicit upstream error, transient failures marked
//! retryable.

use std::time::Duration;

use redis::{AsyncCommands, aio::ConnectionManager};
use serde_json::Value;
use tracing::info;

use crate::{
    config::Config,
    error::{Error, Result},
    keys,
    utils::split_coordinates,
};

pub const WEATHER_TTL_SECS: u64 = 60 * 60;

pub struct WeatherProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl WeatherProvider {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.weather_url.clone(),
            config.weather_api_key.clone(),
            config.weather_timeout,
        )
    }

    /// Current conditions at the coordinates, in imperial units.
    pub async fn fetch(&self, lat: &str, lng: &str) -> Result<Value> {
        let url = format!("{}/data/2.5/weather", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("units", "imperial"),
                ("lat", lat),
                ("lon", lng),
                ("appid", self.api_key.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Upstream {
                retryable: e.is_timeout() || e.is_connect(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream {
                retryable: status.is_server_error(),
                message: format!("weather provider returned {status}"),
            });
        }

        response.json().await.map_err(|e| Error::Upstream {
            retryable: false,
            message: format!("unreadable weather payload: {e}"),
        })
    }
}

pub struct WeatherCache {
    conn: ConnectionManager,
    provider: WeatherProvider,
}

impl WeatherCache {
    pub fn new(conn: ConnectionManager, provider: WeatherProvider) -> Self {
        Self { conn, provider }
    }

    /// Weather for a restaurant, cached per restaurant id. Absent or
    /// expired entries refetch from the provider.
    pub async fn for_restaurant(&self, restaurant_id: &str) -> Result<Value> {
        let mut conn = self.conn.clone();
        let cache_key = keys::weather(restaurant_id);

        let cached: Option<String> = conn.get(&cache_key).await?;
        if let Some(raw) = cached {
            return serde_json::from_str(&raw).map_err(|e| {
                Error::Consistency(format!("corrupt weather cache for {restaurant_id}: {e}"))
            });
        }

        let location: Option<String> = conn
            .hget(keys::restaurant(restaurant_id), "location")
            .await?;
        let location =
            location.ok_or_else(|| Error::NotFound(format!("restaurant {restaurant_id}")))?;
        let (lat, lng) = split_coordinates(&location)?;

        let payload = self.provider.fetch(lat, lng).await?;

        let _: () = conn
            .set_ex(&cache_key, payload.to_string(), WEATHER_TTL_SECS)
            .await?;
        info!("cached weather for {restaurant_id}");

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn provider(base_url: String) -> WeatherProvider {
        WeatherProvider::new(base_url, "test-key".into(), Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_fetch_success_returns_payload() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("units", "imperial"))
            .and(query_param("lat", "40.42"))
            .and(query_param("lon", "-86.91"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"main": {"temp": 71.2}})))
            .mount(&server)
            .await;

        let payload = provider(server.uri()).fetch("40.42", "-86.91").await.unwrap();
        assert_eq!(payload["main"]["temp"], json!(71.2));
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = provider(server.uri()).fetch("0", "0").await.unwrap_err();
        assert!(err.is_retryable(), "got {err}");
    }

    #[tokio::test]
    async fn test_client_error_is_permanent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = provider(server.uri()).fetch("0", "0").await.unwrap_err();
        assert!(matches!(err, Error::Upstream { retryable: false, .. }), "got {err}");
    }

    #[tokio::test]
    async fn test_timeout_is_retryable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = provider(server.uri()).fetch("0", "0").await.unwrap_err();
        assert!(err.is_retryable(), "got {err}");
    }
}
