//! Local weather collection for wxpoll
//!
//! Periodically reads the last known position, fetches current conditions
//! from a weather provider and emits one observation per successful cycle.

pub mod types;
pub mod location;
pub mod provider;
pub mod openweathermap;
pub mod observation;
pub mod sink;
pub mod status;
pub mod scheduler;
pub mod job;
pub mod manager;

pub use types::*;
pub use location::{FixedPositionProvider, LocationSource, NoPositionProvider, PositionProvider};
pub use provider::{ProviderRegistry, WeatherProvider};
pub use openweathermap::OpenWeatherMapProvider;
pub use observation::{Observation, LOCAL_WEATHER_TOPIC};
pub use sink::{ChannelSink, Emitted, LogSink, RecordSink};
pub use status::{DeviceStatus, LogStatusListener, StatusListener};
pub use scheduler::{IntervalScheduler, Job, Scheduler, SchedulerError};
pub use job::{CollectionJob, CycleOutcome, CycleState, SkipReason};
pub use manager::{HostContext, WeatherManager};
