//! Integration tests for OpenWeatherMapProvider against a mock server.

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wxpoll_weather::{OpenWeatherMapProvider, ProviderError, WeatherCondition, WeatherProvider};

/// Helper to create a current-weather response body
fn current_weather(dt: i64, temp: f64, condition_id: u32) -> serde_json::Value {
    serde_json::json!({
        "coord": {"lon": 4.3, "lat": 52.0},
        "weather": [{
            "id": condition_id,
            "main": "Clouds",
            "description": "scattered clouds",
            "icon": "03d"
        }],
        "main": {"temp": temp, "feels_like": temp - 1.0, "pressure": 1015, "humidity": 72},
        "clouds": {"all": 40},
        "dt": dt,
        "sys": {"sunrise": 1_699_990_000, "sunset": 1_700_020_000},
        "name": "Den Haag"
    })
}

async fn provider_for(server: &MockServer) -> OpenWeatherMapProvider {
    OpenWeatherMapProvider::with_base_url("test-key", &server.uri()).unwrap()
}

#[tokio::test]
async fn test_fetch_current_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", "test-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(current_weather(1_700_000_000, 11.5, 802)),
        )
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let snapshot = provider.fetch_current(52.0, 4.3).await.unwrap();

    assert_eq!(snapshot.time, 1_700_000_000.0);
    assert_eq!(snapshot.temperature, Some(11.5));
    assert_eq!(snapshot.pressure, Some(1015.0));
    assert_eq!(snapshot.humidity, Some(72.0));
    assert_eq!(snapshot.cloudiness, Some(40.0));
    assert_eq!(snapshot.condition, WeatherCondition::Cloudy);
    assert_eq!(provider.latest(), Some(snapshot));
}

#[tokio::test]
async fn test_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401,
            "message": "Invalid API key"
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let result = provider.fetch_current(52.0, 4.3).await;
    assert!(matches!(result, Err(ProviderError::Unauthorized)));
}

#[tokio::test]
async fn test_rate_limited_reads_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "120"))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let result = provider.fetch_current(52.0, 4.3).await;
    assert!(matches!(result, Err(ProviderError::RateLimited(120))));
}

#[tokio::test]
async fn test_rate_limited_default_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let result = provider.fetch_current(52.0, 4.3).await;
    assert!(matches!(result, Err(ProviderError::RateLimited(60))));
}

#[tokio::test]
async fn test_server_error_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let result = provider.fetch_current(52.0, 4.3).await;
    assert!(matches!(
        result,
        Err(ProviderError::Status { status: 500, ref body }) if body == "boom"
    ));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(current_weather(1_700_000_000, 9.0, 800))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let provider =
        OpenWeatherMapProvider::with_timeout("test-key", &server.uri(), Duration::from_millis(200))
            .unwrap();
    let result = provider.fetch_current(52.0, 4.3).await;

    assert!(matches!(&result, Err(ProviderError::Network(e)) if e.is_timeout()));
    assert!(result.is_err_and(|e| e.is_transient()));
    assert!(provider.latest().is_none());
}

#[tokio::test]
async fn test_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let result = provider.fetch_current(52.0, 4.3).await;
    assert!(matches!(result, Err(ProviderError::Parse(_))));
}

#[tokio::test]
async fn test_failure_leaves_latest_snapshot_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(current_weather(1_700_000_000, 9.0, 800)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = provider_for(&server).await;
    let first = provider.fetch_current(52.0, 4.3).await.unwrap();
    assert_eq!(first.condition, WeatherCondition::Sunny);

    let second = provider.fetch_current(52.0, 4.3).await;
    assert!(matches!(second, Err(ProviderError::Status { status: 503, .. })));
    assert_eq!(provider.latest(), Some(first));
}
