//! Weather provider capability and the registry that selects one by id.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::openweathermap::OpenWeatherMapProvider;
use crate::types::{ConfigurationError, ProviderError, WeatherSnapshot};

/// One external weather data source.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Human-readable provider name, used in logs and observations.
    fn source_name(&self) -> &str;

    /// Fetch current conditions at a position.
    ///
    /// The returned snapshot belongs to this call alone; callers must not
    /// fall back to an earlier one when this fails.
    async fn fetch_current(&self, latitude: f64, longitude: f64)
        -> Result<WeatherSnapshot, ProviderError>;

    /// Most recent successful snapshot, for diagnostics.
    fn latest(&self) -> Option<WeatherSnapshot> {
        None
    }
}

type ProviderFactory =
    Box<dyn Fn(&str) -> Result<Box<dyn WeatherProvider>, ConfigurationError> + Send + Sync>;

/// Maps provider identifiers to constructors.
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with every built-in provider.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(OpenWeatherMapProvider::ID, |api_key| {
            let provider = OpenWeatherMapProvider::new(api_key)?;
            Ok(Box::new(provider) as Box<dyn WeatherProvider>)
        });
        registry
    }

    /// Register (or replace) the constructor for `id`.
    pub fn register<F>(&mut self, id: &str, factory: F)
    where
        F: Fn(&str) -> Result<Box<dyn WeatherProvider>, ConfigurationError> + Send + Sync + 'static,
    {
        self.factories.insert(id.to_string(), Box::new(factory));
    }

    /// Build the provider for `id`. Matching is exact and case-sensitive.
    pub fn create(
        &self,
        id: &str,
        api_key: &str,
    ) -> Result<Box<dyn WeatherProvider>, ConfigurationError> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| ConfigurationError::UnknownSource(id.to_string()))?;
        factory(api_key)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
