//! Lifecycle wrapper owning the collection job's scheduler registration.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::job::CollectionJob;
use crate::location::{LocationSource, PositionProvider};
use crate::provider::ProviderRegistry;
use crate::scheduler::{clamp_interval, Job, Scheduler, SchedulerError};
use crate::sink::RecordSink;
use crate::status::{DeviceStatus, StatusListener};
use crate::types::ConfigurationError;

/// Services the manager needs from its host process.
#[derive(Clone)]
pub struct HostContext {
    pub positions: Arc<dyn PositionProvider>,
    pub sink: Arc<dyn RecordSink>,
    pub status: Arc<dyn StatusListener>,
    pub query_interval_secs: u64,
}

pub struct WeatherManager {
    name: String,
    job: Arc<CollectionJob>,
    scheduler: Arc<dyn Scheduler>,
    status_listener: Arc<dyn StatusListener>,
    status: Mutex<DeviceStatus>,
    interval_secs: AtomicU64,
}

impl WeatherManager {
    pub const DEVICE_NAME: &'static str = "local_weather";

    /// Build the manager with the built-in providers.
    ///
    /// Fails when `source` is not a recognised provider id; nothing is
    /// registered with the scheduler in that case.
    pub fn new(
        host: HostContext,
        scheduler: Arc<dyn Scheduler>,
        source: &str,
        api_key: &str,
    ) -> Result<Self, ConfigurationError> {
        Self::with_registry(host, scheduler, &ProviderRegistry::with_defaults(), source, api_key)
    }

    pub fn with_registry(
        host: HostContext,
        scheduler: Arc<dyn Scheduler>,
        registry: &ProviderRegistry,
        source: &str,
        api_key: &str,
    ) -> Result<Self, ConfigurationError> {
        let provider = registry.create(source, api_key).map_err(|e| {
            tracing::error!("{}", e);
            e
        })?;

        tracing::info!(
            "Weather manager created for {} with interval {} s",
            provider.source_name(),
            host.query_interval_secs
        );

        let job = CollectionJob::new(LocationSource::new(host.positions), provider, host.sink);

        Ok(Self {
            name: Self::DEVICE_NAME.to_string(),
            job: Arc::new(job),
            scheduler,
            status_listener: host.status,
            status: Mutex::new(DeviceStatus::Disconnected),
            interval_secs: AtomicU64::new(clamp_interval(host.query_interval_secs)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> DeviceStatus {
        *self.status.lock()
    }

    pub fn interval(&self) -> u64 {
        self.interval_secs.load(Ordering::SeqCst)
    }

    fn set_status(&self, status: DeviceStatus) {
        *self.status.lock() = status;
        self.status_listener.update_status(&self.name, status);
    }

    /// Register the job and start the scheduler.
    pub fn start(&self, acceptable_source_ids: &HashSet<String>) -> Result<(), SchedulerError> {
        tracing::debug!("Starting {} (acceptable sources: {:?})", self.name, acceptable_source_ids);
        self.set_status(DeviceStatus::Ready);

        let job: Arc<dyn Job> = Arc::clone(&self.job) as Arc<dyn Job>;
        self.scheduler.register(self.interval(), job, true)?;
        self.scheduler.start()?;

        self.set_status(DeviceStatus::Connected);
        Ok(())
    }

    /// Change the polling interval, effective from the next trigger computation.
    ///
    /// Values outside 1 s to 30 days are clamped into that range.
    pub fn set_interval(&self, seconds: u64) {
        let seconds = clamp_interval(seconds);
        self.interval_secs.store(seconds, Ordering::SeqCst);
        self.scheduler.set_interval(seconds);
    }

    /// Stop future triggers. Safe to call whether or not `start` succeeded.
    pub fn close(&self) {
        self.scheduler.close();
        if self.status() != DeviceStatus::Disconnected {
            self.set_status(DeviceStatus::Disconnected);
        }
        tracing::info!("{} closed", self.name);
    }
}
