use serde::{Deserialize, Serialize};

/// Provider id of the satellite positioning service
pub const GPS_PROVIDER: &str = "gps";
/// Provider id of the cell/wifi positioning service
pub const NETWORK_PROVIDER: &str = "network";

/// How a position was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderKind {
    Gps,
    Network,
    Other,
}

impl ProviderKind {
    /// Classify a location provider id. Total over all strings; matching is exact.
    pub fn from_provider_id(provider_id: &str) -> Self {
        match provider_id {
            GPS_PROVIDER => Self::Gps,
            NETWORK_PROVIDER => Self::Network,
            _ => Self::Other,
        }
    }
}

/// A raw fix as reported by a location provider
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    /// Id of the provider that produced this fix
    pub provider: String,
}

/// Last known position of the device, read fresh every cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub provider_kind: ProviderKind,
}

impl From<Fix> for Position {
    fn from(fix: Fix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            provider_kind: ProviderKind::from_provider_id(&fix.provider),
        }
    }
}

/// Qualitative weather condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeatherCondition {
    Sunny,
    Clear,
    Cloudy,
    Rainy,
    Drizzle,
    Freezing,
    Hail,
    Thunder,
    Snowy,
    Foggy,
    Misty,
    Sandstorm,
    Other,
    #[default]
    Unknown,
}

impl WeatherCondition {
    /// Convert an OpenWeatherMap condition id.
    /// See: https://openweathermap.org/weather-conditions
    ///
    /// `daylight` separates a sunny sky from a clear night for id 800.
    pub fn from_owm_code(code: u32, daylight: bool) -> Self {
        match code {
            200..=299 => Self::Thunder,
            300..=399 => Self::Drizzle,
            511 => Self::Freezing, // Freezing rain
            500..=599 => Self::Rainy,
            611..=616 => Self::Freezing, // Sleet
            600..=699 => Self::Snowy,
            701 | 711 | 721 => Self::Misty,
            741 => Self::Foggy,
            731 | 751 | 761 => Self::Sandstorm,
            700..=799 => Self::Other,
            800 if daylight => Self::Sunny,
            800 => Self::Clear,
            801..=804 => Self::Cloudy,
            906 => Self::Hail,
            _ => Self::Unknown,
        }
    }
}

/// Fields reported by a weather provider for one fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Provider's own observation time, epoch seconds
    pub time: f64,
    /// Local sunrise, epoch seconds
    pub sunrise: Option<i64>,
    /// Local sunset, epoch seconds
    pub sunset: Option<i64>,
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// hPa
    pub pressure: Option<f64>,
    /// Relative humidity, percent
    pub humidity: Option<f64>,
    /// Cloud cover, percent
    pub cloudiness: Option<f64>,
    /// Millimetres over `precipitation_period`
    pub precipitation: Option<f64>,
    /// Hours
    pub precipitation_period: Option<u32>,
    pub condition: WeatherCondition,
    /// Human-readable name of the provider
    pub source: String,
}

/// Location access errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location error: {0}")]
    Other(String),
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Unauthorized - API key may be invalid")]
    Unauthorized,
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
    #[error("API error: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Whether the next scheduled cycle has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Unauthorized | Self::Parse(_) => false,
        }
    }
}

/// Provider selection and construction errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("The weather api '{0}' is not recognised")]
    UnknownSource(String),
    #[error("Failed to initialise weather client: {0}")]
    ClientInit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_gps() {
        assert_eq!(ProviderKind::from_provider_id("gps"), ProviderKind::Gps);
    }

    #[test]
    fn test_provider_kind_network() {
        assert_eq!(ProviderKind::from_provider_id("network"), ProviderKind::Network);
    }

    #[test]
    fn test_provider_kind_other_is_catch_all() {
        for id in ["fused", "passive", "", "GPS", "Network", " gps"] {
            assert_eq!(ProviderKind::from_provider_id(id), ProviderKind::Other, "id {:?}", id);
        }
    }

    #[test]
    fn test_position_from_fix() {
        let fix = Fix {
            latitude: 52.1,
            longitude: 4.4,
            provider: NETWORK_PROVIDER.to_string(),
        };
        let position = Position::from(fix);
        assert_eq!(position.provider_kind, ProviderKind::Network);
        assert_eq!(position.latitude, 52.1);
    }

    #[test]
    fn test_owm_code_thunder() {
        assert_eq!(WeatherCondition::from_owm_code(200, true), WeatherCondition::Thunder);
        assert_eq!(WeatherCondition::from_owm_code(232, false), WeatherCondition::Thunder);
    }

    #[test]
    fn test_owm_code_rain_and_freezing() {
        assert_eq!(WeatherCondition::from_owm_code(300, true), WeatherCondition::Drizzle);
        assert_eq!(WeatherCondition::from_owm_code(500, true), WeatherCondition::Rainy);
        assert_eq!(WeatherCondition::from_owm_code(531, true), WeatherCondition::Rainy);
        assert_eq!(WeatherCondition::from_owm_code(511, true), WeatherCondition::Freezing);
        assert_eq!(WeatherCondition::from_owm_code(611, true), WeatherCondition::Freezing);
    }

    #[test]
    fn test_owm_code_snow() {
        assert_eq!(WeatherCondition::from_owm_code(600, true), WeatherCondition::Snowy);
        assert_eq!(WeatherCondition::from_owm_code(622, true), WeatherCondition::Snowy);
    }

    #[test]
    fn test_owm_code_atmosphere() {
        assert_eq!(WeatherCondition::from_owm_code(701, true), WeatherCondition::Misty);
        assert_eq!(WeatherCondition::from_owm_code(741, true), WeatherCondition::Foggy);
        assert_eq!(WeatherCondition::from_owm_code(751, true), WeatherCondition::Sandstorm);
        assert_eq!(WeatherCondition::from_owm_code(781, true), WeatherCondition::Other);
    }

    #[test]
    fn test_owm_code_clear_depends_on_daylight() {
        assert_eq!(WeatherCondition::from_owm_code(800, true), WeatherCondition::Sunny);
        assert_eq!(WeatherCondition::from_owm_code(800, false), WeatherCondition::Clear);
    }

    #[test]
    fn test_owm_code_clouds_and_hail() {
        assert_eq!(WeatherCondition::from_owm_code(801, true), WeatherCondition::Cloudy);
        assert_eq!(WeatherCondition::from_owm_code(804, false), WeatherCondition::Cloudy);
        assert_eq!(WeatherCondition::from_owm_code(906, true), WeatherCondition::Hail);
    }

    #[test]
    fn test_owm_code_unknown() {
        assert_eq!(WeatherCondition::from_owm_code(0, true), WeatherCondition::Unknown);
        assert_eq!(WeatherCondition::from_owm_code(999, true), WeatherCondition::Unknown);
    }

    #[test]
    fn test_provider_error_transience() {
        assert!(ProviderError::RateLimited(60).is_transient());
        assert!(ProviderError::Status { status: 503, body: String::new() }.is_transient());
        assert!(!ProviderError::Status { status: 404, body: String::new() }.is_transient());
        assert!(!ProviderError::Unauthorized.is_transient());
        assert!(!ProviderError::Parse("x".into()).is_transient());
    }

    #[test]
    fn test_configuration_error_names_source() {
        let err = ConfigurationError::UnknownSource("unknown-provider".into());
        assert!(err.to_string().contains("unknown-provider"));
    }
}
