//! Weather proxy / cache (§4.2): owns the canonical snapshot, drives fetches
//! against the HTTP collaborator, and serializes access to the snapshot and
//! its two watermarks under a single bounded reader/writer lock.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::decode::decode_object;
use crate::errors::{CoreError, DecodeError, JsonPath};
use crate::http_client::HttpClient;
use crate::time::{Clock, Date, Timestamp};
use crate::weather::{summarize_current, CurrentExtended, CurrentTimecheck, DailyFirstEntry, Location, WeatherSnapshot};

/// `forecast_days` is always 1 in this system (§4.2, §9 Open Questions) —
/// the URL builders accept a count but nothing here drives a larger one.
const FORECAST_DAYS: u32 = 1;

struct State {
    snapshot: WeatherSnapshot,
    last_day: Option<Date>,
    last_weather: Option<Timestamp>,
}

/// Owns the most-recent weather snapshot plus the two "last fetched"
/// watermarks, guarded by one multiple-reader/single-writer lock with
/// bounded try-acquire (§4.2, §5).
pub struct WeatherProxy {
    location: Location,
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    lock_wait_budget: Duration,
    state: RwLock<State>,
}

impl WeatherProxy {
    pub fn new(location: Location, http: Arc<dyn HttpClient>, clock: Arc<dyn Clock>, lock_wait_budget: Duration) -> Self {
        WeatherProxy {
            location,
            http,
            clock,
            lock_wait_budget,
            state: RwLock::new(State {
                snapshot: WeatherSnapshot::default(),
                last_day: None,
                last_weather: None,
            }),
        }
    }

    /// Refreshes sunrise/sunset for today, if not already installed (§4.2).
    pub fn fetch_daily(&self) -> bool {
        let today = self.clock.local_today();

        match self.state.try_read_for(self.lock_wait_budget) {
            Some(guard) => {
                if guard.last_day.is_some_and(|last| last >= today) {
                    tracing::debug!(%today, "fetch_daily: already up to date, skipping");
                    return false;
                }
            }
            None => {
                let err = CoreError::LockTimeout(self.lock_wait_budget);
                tracing::warn!(error = %err, "fetch_daily: reader lock timed out while checking watermark");
                return false;
            }
        }

        let entry = match self.fetch_daily_entry() {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "fetch_daily: fetch or decode failed");
                return false;
            }
        };

        if entry.date != today {
            tracing::debug!(returned = %entry.date, %today, "fetch_daily: returned date is not today, no install");
            return false;
        }

        let mut guard = match self.state.try_write_for(self.lock_wait_budget) {
            Some(guard) => guard,
            None => {
                let err = CoreError::LockTimeout(self.lock_wait_budget);
                tracing::warn!(error = %err, "fetch_daily: writer lock timed out, no state change");
                return false;
            }
        };
        if guard.last_day.is_some_and(|last| last >= today) {
            return false;
        }
        guard.snapshot.sunrise = entry.sunrise;
        guard.snapshot.sunset = entry.sunset;
        guard.last_day = Some(today);
        true
    }

    fn fetch_daily_entry(&self) -> Result<DailyFirstEntry, CoreError> {
        let body = self.http.get(&daily_path(self.location, FORECAST_DAYS))?;
        let value = parse_json(&body)?;
        Ok(decode_object(&value)?)
    }

    /// Refreshes the current-conditions fields, short-circuiting on an
    /// unchanged remote timestamp (§4.2, P6).
    pub fn fetch_current(&self) -> bool {
        let timecheck = match self.fetch_timecheck() {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "fetch_current: timecheck fetch or decode failed");
                return false;
            }
        };

        match self.state.try_read_for(self.lock_wait_budget) {
            Some(guard) => {
                if guard.last_weather.is_some_and(|last| timecheck.time <= last) {
                    return false;
                }
            }
            None => {
                let err = CoreError::LockTimeout(self.lock_wait_budget);
                tracing::warn!(error = %err, "fetch_current: reader lock timed out while checking watermark");
                return false;
            }
        }

        let extended = match self.fetch_extended() {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "fetch_current: extended fetch or decode failed");
                return false;
            }
        };

        let summary = summarize_current(&extended);

        let mut guard = match self.state.try_write_for(self.lock_wait_budget) {
            Some(guard) => guard,
            None => {
                let err = CoreError::LockTimeout(self.lock_wait_budget);
                tracing::warn!(error = %err, "fetch_current: writer lock timed out, no state change");
                return false;
            }
        };
        if guard.last_weather.is_some_and(|last| extended.time <= last) {
            return false;
        }
        guard.snapshot.temperature_c = extended.temperature_2m;
        guard.snapshot.surface_pressure_hpa = extended.surface_pressure;
        guard.snapshot.relative_humidity_pct = extended.relative_humidity_2m;
        guard.snapshot.precipitation_mm = extended.precipitation;
        guard.snapshot.wind_speed_kmh = extended.windspeed_10m;
        guard.snapshot.wind_direction_deg = extended.winddirection_10m;
        guard.snapshot.cloud_cover_pct = extended.cloudcover;
        guard.snapshot.uv_index = extended.uv_index;
        guard.snapshot.weather_code = extended.weather_code;
        guard.snapshot.summary = Some(summary);
        guard.last_weather = Some(extended.time);
        true
    }

    fn fetch_timecheck(&self) -> Result<CurrentTimecheck, CoreError> {
        let body = self.http.get(&current_timecheck_path(self.location))?;
        let value = parse_json(&body)?;
        Ok(decode_object(&value)?)
    }

    fn fetch_extended(&self) -> Result<CurrentExtended, CoreError> {
        let body = self.http.get(&current_extended_path(self.location))?;
        let value = parse_json(&body)?;
        Ok(decode_object(&value)?)
    }

    /// Reader access: a deep copy of the current snapshot, or absent on a
    /// lock timeout (§4.2).
    pub fn snapshot(&self) -> Option<WeatherSnapshot> {
        match self.state.try_read_for(self.lock_wait_budget) {
            Some(guard) => Some(guard.snapshot.clone()),
            None => {
                let err = CoreError::LockTimeout(self.lock_wait_budget);
                tracing::warn!(error = %err, "snapshot: reader lock timed out");
                None
            }
        }
    }
}

/// Parse a raw response body as JSON, reporting malformed JSON as a
/// `DecodeError::ParseError` (§7 kind 2) rather than a transport failure.
fn parse_json(body: &str) -> Result<serde_json::Value, DecodeError> {
    serde_json::from_str(body).map_err(|e| DecodeError::ParseError {
        path: JsonPath::root(),
        message: e.to_string(),
    })
}

fn daily_path(location: Location, forecast_days: u32) -> String {
    format!(
        "/v1/forecast?latitude={}&longitude={}&daily=sunrise,sunset&timezone=auto&forecast_days={}",
        location.latitude, location.longitude, forecast_days
    )
}

fn current_timecheck_path(location: Location) -> String {
    format!(
        "/v1/forecast?latitude={}&longitude={}&current=temperature_2m&timezone=auto",
        location.latitude, location.longitude
    )
}

fn current_extended_path(location: Location) -> String {
    format!(
        "/v1/forecast?latitude={}&longitude={}&current=temperature_2m,surface_pressure,relative_humidity_2m,precipitation,windspeed_10m,winddirection_10m,cloudcover,uv_index,weather_code&timezone=auto",
        location.latitude, location.longitude
    )
}
