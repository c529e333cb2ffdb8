//! OpenWeatherMap current-conditions client.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::provider::WeatherProvider;
use crate::types::{ConfigurationError, ProviderError, WeatherCondition, WeatherSnapshot};

const OWM_API_BASE: &str = "https://api.openweathermap.org";
const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct OwmResponse {
    dt: i64,
    main: Option<OwmMain>,
    clouds: Option<OwmClouds>,
    rain: Option<OwmPrecipitation>,
    snow: Option<OwmPrecipitation>,
    #[serde(default)]
    weather: Vec<OwmWeather>,
    sys: Option<OwmSys>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: Option<f64>,
    pressure: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmClouds {
    all: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwmPrecipitation {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmWeather {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct OwmSys {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

/// Rain plus snow over the shortest period either block reports.
fn precipitation(
    rain: Option<&OwmPrecipitation>,
    snow: Option<&OwmPrecipitation>,
) -> (Option<f64>, Option<u32>) {
    let blocks: Vec<&OwmPrecipitation> = rain.into_iter().chain(snow).collect();

    if blocks.iter().any(|b| b.one_hour.is_some()) {
        let total: f64 = blocks.iter().filter_map(|b| b.one_hour).sum();
        (Some(total), Some(1))
    } else if blocks.iter().any(|b| b.three_hours.is_some()) {
        let total: f64 = blocks.iter().filter_map(|b| b.three_hours).sum();
        (Some(total), Some(3))
    } else {
        (None, None)
    }
}

impl OwmResponse {
    fn into_snapshot(self) -> WeatherSnapshot {
        let (sunrise, sunset) = self
            .sys
            .as_ref()
            .map(|s| (s.sunrise, s.sunset))
            .unwrap_or((None, None));

        let daylight = matches!(
            (sunrise, sunset),
            (Some(rise), Some(set)) if rise <= self.dt && self.dt < set
        );

        let condition = self
            .weather
            .first()
            .map(|w| WeatherCondition::from_owm_code(w.id, daylight))
            .unwrap_or_default();

        let (precipitation, precipitation_period) =
            precipitation(self.rain.as_ref(), self.snow.as_ref());

        WeatherSnapshot {
            time: self.dt as f64,
            sunrise,
            sunset,
            temperature: self.main.as_ref().and_then(|m| m.temp),
            pressure: self.main.as_ref().and_then(|m| m.pressure),
            humidity: self.main.as_ref().and_then(|m| m.humidity),
            cloudiness: self.clouds.as_ref().and_then(|c| c.all),
            precipitation,
            precipitation_period,
            condition,
            source: OpenWeatherMapProvider::SOURCE_NAME.to_string(),
        }
    }
}

/// Current-conditions client for api.openweathermap.org.
pub struct OpenWeatherMapProvider {
    client: Client,
    api_key: String,
    base_url: String,
    latest: RwLock<Option<WeatherSnapshot>>,
}

impl OpenWeatherMapProvider {
    /// Registry identifier
    pub const ID: &'static str = "openweathermap";
    /// Name reported in observations
    pub const SOURCE_NAME: &'static str = "OpenWeatherMap";

    pub fn new(api_key: &str) -> Result<Self, ConfigurationError> {
        Self::with_base_url(api_key, OWM_API_BASE)
    }

    /// Client against a different host (proxy or mock server).
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, ConfigurationError> {
        Self::with_timeout(api_key, base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Client with a custom whole-request timeout.
    pub fn with_timeout(
        api_key: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigurationError::ClientInit(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            latest: RwLock::new(None),
        })
    }

    #[instrument(skip(self), level = "info")]
    async fn request(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherSnapshot, ProviderError> {
        let url = format!("{}/data/2.5/weather", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?;

        let body: OwmResponse = Self::handle_response(response).await?;
        Ok(body.into_snapshot())
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();

        if status.is_success() {
            let text = response.text().await?;
            serde_json::from_str(&text)
                .map_err(|e| ProviderError::Parse(format!("JSON parse error: {}", e)))
        } else if status.as_u16() == 401 {
            Err(ProviderError::Unauthorized)
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(ProviderError::RateLimited(retry_after))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapProvider {
    fn source_name(&self) -> &str {
        Self::SOURCE_NAME
    }

    async fn fetch_current(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherSnapshot, ProviderError> {
        let snapshot = self.request(latitude, longitude).await?;
        *self.latest.write() = Some(snapshot.clone());
        Ok(snapshot)
    }

    fn latest(&self) -> Option<WeatherSnapshot> {
        self.latest.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: serde_json::Value) -> WeatherSnapshot {
        let response: OwmResponse = serde_json::from_value(json).unwrap();
        response.into_snapshot()
    }

    #[test]
    fn test_full_response() {
        let snapshot = parse(serde_json::json!({
            "dt": 1_700_000_000,
            "main": {"temp": 15.2, "pressure": 1012, "humidity": 80},
            "clouds": {"all": 75},
            "rain": {"1h": 0.4},
            "weather": [{"id": 500, "main": "Rain", "description": "light rain"}],
            "sys": {"sunrise": 1_699_990_000, "sunset": 1_700_020_000}
        }));

        assert_eq!(snapshot.time, 1_700_000_000.0);
        assert_eq!(snapshot.temperature, Some(15.2));
        assert_eq!(snapshot.pressure, Some(1012.0));
        assert_eq!(snapshot.humidity, Some(80.0));
        assert_eq!(snapshot.cloudiness, Some(75.0));
        assert_eq!(snapshot.precipitation, Some(0.4));
        assert_eq!(snapshot.precipitation_period, Some(1));
        assert_eq!(snapshot.condition, WeatherCondition::Rainy);
        assert_eq!(snapshot.sunrise, Some(1_699_990_000));
        assert_eq!(snapshot.source, "OpenWeatherMap");
    }

    #[test]
    fn test_minimal_response() {
        let snapshot = parse(serde_json::json!({"dt": 10}));
        assert_eq!(snapshot.temperature, None);
        assert_eq!(snapshot.precipitation, None);
        assert_eq!(snapshot.precipitation_period, None);
        assert_eq!(snapshot.condition, WeatherCondition::Unknown);
    }

    #[test]
    fn test_rain_and_snow_are_summed() {
        let rain = OwmPrecipitation { one_hour: None, three_hours: Some(1.5) };
        let snow = OwmPrecipitation { one_hour: None, three_hours: Some(0.5) };
        assert_eq!(precipitation(Some(&rain), Some(&snow)), (Some(2.0), Some(3)));
    }

    #[test]
    fn test_hourly_precipitation_preferred() {
        let rain = OwmPrecipitation { one_hour: Some(0.2), three_hours: Some(1.0) };
        assert_eq!(precipitation(Some(&rain), None), (Some(0.2), Some(1)));
    }

    #[test]
    fn test_clear_sky_at_night() {
        let snapshot = parse(serde_json::json!({
            "dt": 1_700_030_000,
            "weather": [{"id": 800}],
            "sys": {"sunrise": 1_699_990_000, "sunset": 1_700_020_000}
        }));
        assert_eq!(snapshot.condition, WeatherCondition::Clear);
    }

    #[test]
    fn test_clear_sky_in_daylight() {
        let snapshot = parse(serde_json::json!({
            "dt": 1_700_000_000,
            "weather": [{"id": 800}],
            "sys": {"sunrise": 1_699_990_000, "sunset": 1_700_020_000}
        }));
        assert_eq!(snapshot.condition, WeatherCondition::Sunny);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider =
            OpenWeatherMapProvider::with_base_url("k", "http://localhost:1234/").unwrap();
        assert_eq!(provider.base_url, "http://localhost:1234");
    }
}
