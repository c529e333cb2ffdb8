//! One periodic collection cycle: locate, fetch, assemble, emit.

use std::sync::Arc;

use async_trait::async_trait;

use crate::location::LocationSource;
use crate::observation::{self, LOCAL_WEATHER_TOPIC};
use crate::provider::WeatherProvider;
use crate::scheduler::Job;
use crate::sink::RecordSink;

/// States a single cycle moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    LocatingAwaitingFix,
    Fetching,
    Assembling,
    Emitted,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    LocationUnavailable,
    ProviderFailed,
}

/// How a cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Emitted,
    Skipped(SkipReason),
}

impl CycleOutcome {
    pub fn state(&self) -> CycleState {
        match self {
            Self::Emitted => CycleState::Emitted,
            Self::Skipped(_) => CycleState::Skipped,
        }
    }
}

/// Periodic job collecting local weather observations.
pub struct CollectionJob {
    location: LocationSource,
    provider: Box<dyn WeatherProvider>,
    sink: Arc<dyn RecordSink>,
    topic: String,
}

impl CollectionJob {
    pub const NAME: &'static str = "local-weather";

    pub fn new(
        location: LocationSource,
        provider: Box<dyn WeatherProvider>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Self {
            location,
            provider,
            sink,
            topic: LOCAL_WEATHER_TOPIC.to_string(),
        }
    }

    /// Emit on a different topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn provider(&self) -> &dyn WeatherProvider {
        self.provider.as_ref()
    }

    fn transition(&self, state: CycleState) {
        tracing::debug!("Collection cycle -> {:?}", state);
    }

    /// Run one cycle to completion. Every failure ends the cycle as skipped.
    pub async fn run_cycle(&self) -> CycleOutcome {
        self.transition(CycleState::Idle);

        self.transition(CycleState::LocatingAwaitingFix);
        let Some(position) = self.location.last_known_location().await else {
            tracing::warn!("No last known location, skipping weather update");
            self.transition(CycleState::Skipped);
            return CycleOutcome::Skipped(SkipReason::LocationUnavailable);
        };

        self.transition(CycleState::Fetching);
        let snapshot = match self
            .provider
            .fetch_current(position.latitude, position.longitude)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    "Failed to fetch weather from {}, retrying next cycle: {}",
                    self.provider.source_name(),
                    e
                );
                self.transition(CycleState::Skipped);
                return CycleOutcome::Skipped(SkipReason::ProviderFailed);
            }
            Err(e) => {
                tracing::error!(
                    "Failed to fetch weather from {}: {}",
                    self.provider.source_name(),
                    e
                );
                self.transition(CycleState::Skipped);
                return CycleOutcome::Skipped(SkipReason::ProviderFailed);
            }
        };

        self.transition(CycleState::Assembling);
        let captured_at = observation::capture_timestamp();
        let record = observation::build(snapshot, captured_at, position.provider_kind);

        tracing::info!(
            "Weather from {} at {:?} location: {:?} C, {:?}",
            record.source,
            record.location_type,
            record.temperature,
            record.weather_condition
        );
        self.sink.emit(&self.topic, record);
        self.transition(CycleState::Emitted);
        CycleOutcome::Emitted
    }
}

#[async_trait]
impl Job for CollectionJob {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn run(&self) {
        self.run_cycle().await;
    }
}
