use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use weather_sensor_core::config::AppConfig;
use weather_sensor_core::http_client::{HttpClient, ReqwestHttpClient};
use weather_sensor_core::proxy::WeatherProxy;
use weather_sensor_core::running::RunningFlag;
use weather_sensor_core::scheduler::{ScheduledEvent, Scheduler};
use weather_sensor_core::time::{Clock, SystemClock};
use weather_sensor_core::weather::Location;

/// How often `fetch_current` is retried. Short, since current conditions
/// change quickly and the remote short-circuits unchanged timestamps (P6).
const FETCH_CURRENT_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// How often `fetch_daily` is retried. Long, since sunrise/sunset changes
/// once a day.
const FETCH_DAILY_INTERVAL: Duration = Duration::from_secs(60 * 60);

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_sensor_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    let location = Location::new(config.latitude, config.longitude);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new(&config.api_host, config.api_port));
    let proxy = Arc::new(WeatherProxy::new(location, http, clock.clone(), config.lock_wait_budget()));
    let scheduler = Arc::new(Scheduler::new(clock.clone()));
    let running = RunningFlag::new();

    schedule_daily_fetch(&scheduler, &proxy, &clock);
    schedule_current_fetch(&scheduler, &proxy, &clock);

    tracing::info!(host = %config.api_host, port = config.api_port, "weather sensor core started");

    while running.is_running() {
        if let Some(event) = scheduler.wait_next(&running) {
            event.fire();
        }
    }
}

/// Fetches the daily snapshot, then reschedules itself — the scheduler has
/// no built-in notion of a recurring event, so the trigger re-adds itself.
fn schedule_daily_fetch(scheduler: &Arc<Scheduler>, proxy: &Arc<WeatherProxy>, clock: &Arc<dyn Clock>) {
    let scheduler_inner = scheduler.clone();
    let proxy_inner = proxy.clone();
    let clock_inner = clock.clone();
    let when = clock.now() + FETCH_DAILY_INTERVAL;
    scheduler.add(ScheduledEvent::new(when, move || {
        if proxy_inner.fetch_daily() {
            tracing::debug!("daily snapshot refreshed");
        }
        schedule_daily_fetch(&scheduler_inner, &proxy_inner, &clock_inner);
    }));
}

/// Fetches the current-conditions snapshot, then reschedules itself.
fn schedule_current_fetch(scheduler: &Arc<Scheduler>, proxy: &Arc<WeatherProxy>, clock: &Arc<dyn Clock>) {
    let scheduler_inner = scheduler.clone();
    let proxy_inner = proxy.clone();
    let clock_inner = clock.clone();
    let when = clock.now() + FETCH_CURRENT_INTERVAL;
    scheduler.add(ScheduledEvent::new(when, move || {
        if proxy_inner.fetch_current() {
            tracing::debug!("current snapshot refreshed");
        }
        schedule_current_fetch(&scheduler_inner, &proxy_inner, &clock_inner);
    }));
}
