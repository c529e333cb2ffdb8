use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use wxpoll_core::{AppError, Config};
use wxpoll_weather::{
    FixedPositionProvider, HostContext, IntervalScheduler, LogSink, LogStatusListener,
    NoPositionProvider, OpenWeatherMapProvider, PositionProvider, ProviderRegistry,
    WeatherManager, WeatherProvider,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    wxpoll_core::init()?;

    let (config, _validation) = Config::load_validated().map_err(AppError::from)?;
    tracing::info!("Configuration loaded from {}", config.config_dir.display());

    let positions: Arc<dyn PositionProvider> = match config.location.coordinates() {
        Some((latitude, longitude)) => Arc::new(FixedPositionProvider::new(
            config.location.provider.clone(),
            latitude,
            longitude,
        )),
        None => {
            tracing::warn!("No coordinates configured; every cycle will be skipped");
            Arc::new(NoPositionProvider)
        }
    };

    let mut registry = ProviderRegistry::with_defaults();
    if let Some(base_url) = config.weather.base_url.clone() {
        registry.register(OpenWeatherMapProvider::ID, move |api_key| {
            let provider = OpenWeatherMapProvider::with_base_url(api_key, &base_url)?;
            Ok(Box::new(provider) as Box<dyn WeatherProvider>)
        });
    }

    let mut scheduler = IntervalScheduler::new();
    if config.scheduler.persist {
        scheduler = scheduler.with_state_file(config.scheduler_state_path());
    }

    let host = HostContext {
        positions,
        sink: Arc::new(LogSink),
        status: Arc::new(LogStatusListener),
        query_interval_secs: config.weather.interval_seconds,
    };

    let api_key = config.weather.resolved_api_key().unwrap_or_default();
    let manager = WeatherManager::with_registry(
        host,
        Arc::new(scheduler),
        &registry,
        &config.weather.source,
        &api_key,
    )
    .map_err(|e| AppError::Startup(e.to_string()))?;

    let sources: HashSet<String> = registry.ids().map(str::to_string).collect();
    if let Err(e) = manager.start(&sources) {
        manager.close();
        return Err(AppError::Startup(e.to_string()).into());
    }

    tracing::info!("wxpoll running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await.map_err(AppError::from)?;

    // Graceful shutdown
    manager.close();
    tracing::info!("wxpoll stopped");

    Ok(())
}
