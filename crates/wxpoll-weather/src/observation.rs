use serde::{Deserialize, Serialize};

use crate::types::{ProviderKind, WeatherCondition, WeatherSnapshot};

/// Topic local weather observations are emitted on
pub const LOCAL_WEATHER_TOPIC: &str = "android_local_weather";

/// One emitted local weather record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Provider's observation time, epoch seconds
    pub time: f64,
    /// When this record was assembled, epoch seconds
    pub time_received: f64,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub cloudiness: Option<f64>,
    pub precipitation: Option<f64>,
    pub precipitation_period: Option<u32>,
    pub weather_condition: WeatherCondition,
    pub source: String,
    pub location_type: ProviderKind,
}

/// Combine a fresh snapshot with provenance and capture time.
///
/// Takes the snapshot by value so a record can only be built from the
/// result of the fetch that produced it.
pub fn build(
    snapshot: WeatherSnapshot,
    captured_at: f64,
    provider_kind: ProviderKind,
) -> Observation {
    Observation {
        time: snapshot.time,
        time_received: captured_at,
        sunrise: snapshot.sunrise,
        sunset: snapshot.sunset,
        temperature: snapshot.temperature,
        pressure: snapshot.pressure,
        humidity: snapshot.humidity,
        cloudiness: snapshot.cloudiness,
        precipitation: snapshot.precipitation,
        precipitation_period: snapshot.precipitation_period,
        weather_condition: snapshot.condition,
        source: snapshot.source,
        location_type: provider_kind,
    }
}

/// Wall-clock seconds with millisecond precision
pub fn capture_timestamp() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
