//! Weather sources and the cache-checked fetch wrapper.

use std::time::Duration;

use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::Client;
use tracing::instrument;

use crate::cache::{CacheLookup, WeatherCache};
use crate::types::{EntityState, OneCallResponse, Weather, WeatherError};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// A provider that can produce a normalized weather snapshot.
///
/// One implementation per upstream payload shape, selected by configuration.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch(&self) -> Result<Weather, WeatherError>;

    /// Cache key for this source's coordinates or entity.
    fn cache_key(&self) -> String;
}

/// OpenWeatherMap One Call 3.0 client.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    latitude: f64,
    longitude: f64,
    tz: Tz,
}

impl OpenWeatherClient {
    const API_BASE: &'static str = "https://api.openweathermap.org";

    pub fn new(api_key: &str, latitude: f64, longitude: f64, tz: Tz) -> Result<Self, WeatherError> {
        Ok(Self {
            client: build_client()?,
            base_url: Self::API_BASE.to_string(),
            api_key: api_key.to_string(),
            latitude,
            longitude,
            tz,
        })
    }

    #[cfg(test)]
    pub fn new_with_base_url(
        api_key: &str,
        latitude: f64,
        longitude: f64,
        tz: Tz,
        base_url: &str,
    ) -> Result<Self, WeatherError> {
        let mut client = Self::new(api_key, latitude, longitude, tz)?;
        client.base_url = base_url.to_string();
        Ok(client)
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    #[instrument(skip(self), level = "info")]
    async fn fetch(&self) -> Result<Weather, WeatherError> {
        let url = format!("{}/data/3.0/onecall", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", self.latitude.to_string()),
                ("lon", self.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "imperial".to_string()),
                ("exclude", "minutely".to_string()),
            ])
            .send()
            .await?;

        let payload: OneCallResponse = handle_response(response).await?;
        Weather::from_one_call(&payload, self.tz)
    }

    fn cache_key(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

/// Home Assistant weather entity client.
#[derive(Debug, Clone)]
pub struct EntityStateClient {
    client: Client,
    base_url: String,
    token: String,
    entity_id: String,
    tz: Tz,
}

impl EntityStateClient {
    pub fn new(base_url: &str, token: &str, entity_id: &str, tz: Tz) -> Result<Self, WeatherError> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            entity_id: entity_id.to_string(),
            tz,
        })
    }
}

#[async_trait]
impl WeatherSource for EntityStateClient {
    #[instrument(skip(self), level = "info")]
    async fn fetch(&self) -> Result<Weather, WeatherError> {
        let url = format!("{}/api/states/{}", self.base_url, self.entity_id);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;

        let payload: EntityState = handle_response(response).await?;
        Weather::from_entity_state(&payload, self.tz)
    }

    fn cache_key(&self) -> String {
        self.entity_id.clone()
    }
}

fn build_client() -> Result<Client, WeatherError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?)
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, WeatherError> {
    let status = response.status();
    if status.is_success() {
        response
            .json()
            .await
            .map_err(|e| WeatherError::Parse(format!("JSON parse error: {e}")))
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(WeatherError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Fetch a snapshot through the cache.
///
/// A fresh entry short-circuits the network call. On a miss the provider
/// error propagates; when a stale entry exists it is served as a fallback
/// after a failed refresh.
pub async fn fetch_cached(
    source: &dyn WeatherSource,
    cache: &WeatherCache,
) -> Result<Weather, WeatherError> {
    let key = source.cache_key();
    match cache.load(&key) {
        CacheLookup::Fresh(weather) => {
            tracing::debug!("weather cache hit for {}", key);
            Ok(weather)
        }
        CacheLookup::Stale(stale) => match source.fetch().await {
            Ok(weather) => {
                cache.save(&key, &weather);
                Ok(weather)
            }
            Err(e) => {
                tracing::warn!("serving stale weather for {} after fetch failure: {}", key, e);
                Ok(stale)
            }
        },
        CacheLookup::Miss => {
            let weather = source.fetch().await?;
            cache.save(&key, &weather);
            Ok(weather)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tz() -> Tz {
        chrono_tz::America::New_York
    }

    fn one_call_body() -> serde_json::Value {
        serde_json::json!({
            "current": {"temp": 61.8, "weather": [{"id": 800}]},
            "hourly": [
                {"dt": 1_717_416_000, "temp": 58.2, "weather": [{"id": 800}]},
                {"dt": 1_717_419_600, "temp": 60.1, "weather": [{"id": 801}]}
            ],
            "daily": [
                {"dt": 1_717_416_000, "temp": {"min": 50.9, "max": 70.2}, "weather": [{"id": 800}]},
                {"dt": 1_717_502_400, "temp": {"min": 48.0, "max": 65.5}, "weather": [{"id": 500}]}
            ]
        })
    }

    #[tokio::test]
    async fn open_weather_fetch_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .and(query_param("appid", "test_key"))
            .and(query_param("units", "imperial"))
            .and(query_param("exclude", "minutely"))
            .respond_with(ResponseTemplate::new(200).set_body_json(one_call_body()))
            .mount(&server)
            .await;

        let client =
            OpenWeatherClient::new_with_base_url("test_key", 40.7, -74.0, tz(), &server.uri())
                .unwrap();
        let weather = client.fetch().await.unwrap();

        assert_eq!(weather.temperature, 61);
        assert_eq!(weather.high_temp, 70);
        assert_eq!(weather.forecasts.len(), 1);
        assert_eq!(weather.hourly.len(), 2);
    }

    #[tokio::test]
    async fn open_weather_http_error_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client =
            OpenWeatherClient::new_with_base_url("nope", 40.7, -74.0, tz(), &server.uri()).unwrap();
        match client.fetch().await {
            Err(WeatherError::Status { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn entity_state_fetch_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/states/weather.home"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "state": "rainy",
                "attributes": {
                    "temperature": 55.0,
                    "forecast": [
                        {"datetime": "2024-06-03T00:00:00-04:00", "temperature": 70.0, "templow": 50.0, "condition": "sunny"},
                        {"datetime": "2024-06-04T00:00:00-04:00", "temperature": 65.0, "templow": 48.0, "condition": "rainy"}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = EntityStateClient::new(&server.uri(), "secret", "weather.home", tz()).unwrap();
        let weather = client.fetch().await.unwrap();

        assert_eq!(weather.temperature, 55);
        assert_eq!(weather.condition, "Sunny");
        assert_eq!(weather.forecasts.len(), 1);
    }

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
        inner: Weather,
    }

    #[async_trait]
    impl WeatherSource for CountingSource {
        async fn fetch(&self) -> Result<Weather, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(WeatherError::MissingField("daily forecast"))
            } else {
                Ok(self.inner.clone())
            }
        }

        fn cache_key(&self) -> String {
            "test".to_string()
        }
    }

    fn sample_weather(temperature: i32) -> Weather {
        Weather {
            temperature,
            high_temp: 70,
            low_temp: 50,
            condition: "Clear".to_string(),
            weather_class: "wi wi-day-sunny".to_string(),
            forecasts: Vec::new(),
            hourly: Vec::new(),
        }
    }

    #[tokio::test]
    async fn fresh_cache_skips_the_network() {
        let cache = WeatherCache::memory(Duration::from_secs(600));
        cache.save("test", &sample_weather(42));

        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail: true,
            inner: sample_weather(0),
        };
        let weather = fetch_cached(&source, &cache).await.unwrap();
        assert_eq!(weather.temperature, 42);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn miss_fetches_and_saves() {
        let cache = WeatherCache::memory(Duration::from_secs(600));
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail: false,
            inner: sample_weather(61),
        };

        let weather = fetch_cached(&source, &cache).await.unwrap();
        assert_eq!(weather.temperature, 61);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(cache.load("test"), CacheLookup::Fresh(_)));
    }

    #[tokio::test]
    async fn stale_entry_serves_as_fallback_on_failure() {
        let cache = WeatherCache::memory(Duration::ZERO);
        cache.save("test", &sample_weather(42));

        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail: true,
            inner: sample_weather(0),
        };
        let weather = fetch_cached(&source, &cache).await.unwrap();
        assert_eq!(weather.temperature, 42);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn miss_propagates_fetch_errors() {
        let cache = WeatherCache::memory(Duration::from_secs(600));
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            fail: true,
            inner: sample_weather(0),
        };
        assert!(matches!(
            fetch_cached(&source, &cache).await,
            Err(WeatherError::MissingField(_))
        ));
    }
}
