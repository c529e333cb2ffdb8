//! Last-known position lookup over ranked location providers.

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{Fix, LocationError, Position, GPS_PROVIDER, NETWORK_PROVIDER};

/// Platform location service, queried one provider id at a time.
///
/// Lookups may wait on system I/O, so they are async.
#[async_trait]
pub trait PositionProvider: Send + Sync {
    /// Last fix recorded by `provider_id`, or `None` when it has none yet.
    async fn last_known_position(&self, provider_id: &str) -> Result<Option<Fix>, LocationError>;
}

/// Reads the best available last-known position.
pub struct LocationSource {
    provider: Arc<dyn PositionProvider>,
    ranking: Vec<String>,
}

impl LocationSource {
    /// GPS first, then network.
    pub fn new(provider: Arc<dyn PositionProvider>) -> Self {
        Self::with_ranking(provider, &[GPS_PROVIDER, NETWORK_PROVIDER])
    }

    pub fn with_ranking(provider: Arc<dyn PositionProvider>, ranking: &[&str]) -> Self {
        Self {
            provider,
            ranking: ranking.iter().map(|id| id.to_string()).collect(),
        }
    }

    /// The first fix in ranking order.
    ///
    /// Permission denial and "no fix yet" both come back as `None`; the
    /// only sensible reaction for a caller is to skip the cycle.
    pub async fn last_known_location(&self) -> Option<Position> {
        for provider_id in &self.ranking {
            match self.provider.last_known_position(provider_id).await {
                Ok(Some(fix)) => {
                    tracing::debug!("Location fix from provider '{}'", fix.provider);
                    return Some(Position::from(fix));
                }
                Ok(None) => {
                    tracing::debug!("No last known position from '{}'", provider_id);
                }
                Err(LocationError::PermissionDenied) => {
                    tracing::warn!("Location permission denied for provider '{}'", provider_id);
                }
                Err(e) => {
                    tracing::warn!("Location provider '{}' failed: {}", provider_id, e);
                }
            }
        }
        None
    }
}

/// Reports a fixed, configured position under a single provider id.
#[derive(Debug, Clone)]
pub struct FixedPositionProvider {
    provider_id: String,
    latitude: f64,
    longitude: f64,
}

impl FixedPositionProvider {
    pub fn new(provider_id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            provider_id: provider_id.into(),
            latitude,
            longitude,
        }
    }
}

#[async_trait]
impl PositionProvider for FixedPositionProvider {
    async fn last_known_position(&self, provider_id: &str) -> Result<Option<Fix>, LocationError> {
        if provider_id != self.provider_id {
            return Ok(None);
        }
        Ok(Some(Fix {
            latitude: self.latitude,
            longitude: self.longitude,
            provider: self.provider_id.clone(),
        }))
    }
}

/// Position provider with no fixes at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPositionProvider;

#[async_trait]
impl PositionProvider for NoPositionProvider {
    async fn last_known_position(&self, _provider_id: &str) -> Result<Option<Fix>, LocationError> {
        Ok(None)
    }
}
