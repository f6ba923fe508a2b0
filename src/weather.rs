//! Domain weather values (§3) and the record decoders that turn Open-Meteo
//! JSON into them (§6). Each record implements [`Decode`] directly — no
//! central registry, per §9.

use serde_json::Value;

use crate::decode::{element, field, optional_element, optional_field, Accept, Decode};
use crate::errors::{DecodeError, JsonPath};
use crate::time::{Date, TimeOfDay, Timestamp};

/// A fixed (latitude, longitude) pair configured at proxy construction.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Location { latitude, longitude }
    }
}

/// All-optional cached weather record (§3). Each field may independently be
/// absent — the remote may return `null` for any of them. Serializable so
/// the middleware/CLI collaborator (§1, out of scope here) can hand a
/// `snapshot()` result to its own consumers as JSON.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WeatherSnapshot {
    pub sunrise: Option<TimeOfDay>,
    pub sunset: Option<TimeOfDay>,
    pub temperature_c: Option<f64>,
    pub surface_pressure_hpa: Option<f64>,
    pub relative_humidity_pct: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub wind_speed_kmh: Option<f64>,
    pub wind_direction_deg: Option<f64>,
    pub cloud_cover_pct: Option<f64>,
    pub uv_index: Option<f64>,
    pub weather_code: Option<i64>,
    pub summary: Option<String>,
}

fn nested_object<'v>(path: &JsonPath, value: &'v Value, key: &str) -> Result<&'v Value, DecodeError> {
    value.get(key).ok_or_else(|| DecodeError::ShapeError {
        path: path.field(key),
        expected: format!("field `{key}`"),
    })
}

/// The first ("today", per server timezone) entry of a `daily` response —
/// the parallel-array fields at index 0.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyFirstEntry {
    pub date: Date,
    pub sunrise: Option<TimeOfDay>,
    pub sunset: Option<TimeOfDay>,
}

impl Decode for DailyFirstEntry {
    fn decode(path: &JsonPath, value: &Value) -> Result<Self, DecodeError> {
        let daily_path = path.field("daily");
        let daily = nested_object(path, value, "daily")?;

        let time_arr = nested_object(&daily_path, daily, "time")?;
        let date: Date = element(&daily_path.field("time"), time_arr, 0, &Accept)?;

        let sunrise = match daily.get("sunrise") {
            Some(arr) => optional_element(&daily_path.field("sunrise"), arr, 0, &Accept)?,
            None => None,
        };
        let sunset = match daily.get("sunset") {
            Some(arr) => optional_element(&daily_path.field("sunset"), arr, 0, &Accept)?,
            None => None,
        };

        Ok(DailyFirstEntry { date, sunrise, sunset })
    }
}

/// The minimal `current` response used only to read the remote's notion of
/// "now", to decide whether the extended GET is worth issuing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentTimecheck {
    pub time: Timestamp,
}

impl Decode for CurrentTimecheck {
    fn decode(path: &JsonPath, value: &Value) -> Result<Self, DecodeError> {
        let current_path = path.field("current");
        let current = nested_object(path, value, "current")?;
        let time = field(&current_path, current, "time", &Accept)?;
        Ok(CurrentTimecheck { time })
    }
}

/// The full `current` response (§6).
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentExtended {
    pub time: Timestamp,
    pub temperature_2m: Option<f64>,
    pub surface_pressure: Option<f64>,
    pub relative_humidity_2m: Option<f64>,
    pub precipitation: Option<f64>,
    pub windspeed_10m: Option<f64>,
    pub winddirection_10m: Option<f64>,
    pub cloudcover: Option<f64>,
    pub uv_index: Option<f64>,
    pub weather_code: Option<i64>,
}

impl Decode for CurrentExtended {
    fn decode(path: &JsonPath, value: &Value) -> Result<Self, DecodeError> {
        let current_path = path.field("current");
        let current = nested_object(path, value, "current")?;
        Ok(CurrentExtended {
            time: field(&current_path, current, "time", &Accept)?,
            temperature_2m: optional_field(&current_path, current, "temperature_2m", &Accept)?,
            surface_pressure: optional_field(&current_path, current, "surface_pressure", &Accept)?,
            relative_humidity_2m: optional_field(
                &current_path,
                current,
                "relative_humidity_2m",
                &Accept,
            )?,
            precipitation: optional_field(&current_path, current, "precipitation", &Accept)?,
            windspeed_10m: optional_field(&current_path, current, "windspeed_10m", &Accept)?,
            winddirection_10m: optional_field(&current_path, current, "winddirection_10m", &Accept)?,
            cloudcover: optional_field(&current_path, current, "cloudcover", &Accept)?,
            uv_index: optional_field(&current_path, current, "uv_index", &Accept)?,
            weather_code: optional_field(&current_path, current, "weather_code", &Accept)?,
        })
    }
}

/// UV index at or above this level gets a sun-protection warning appended.
const UV_WARNING_THRESHOLD: f64 = 8.0;
/// Precipitation (mm, current hour) at or above this gets a heavy-rain
/// warning appended — the WMO's "heavy rain" hourly-rate threshold.
const HEAVY_RAIN_THRESHOLD_MM: f64 = 7.5;

/// Short human-readable WMO weather-code vocabulary (§4.2). Downstream
/// consumers should not parse this text — §9 leaves its exact wording
/// unpinned.
fn weather_code_phrase(code: i64) -> &'static str {
    match code {
        0 => "clear sky",
        1 | 2 => "partly cloudy",
        3 => "overcast",
        45 | 48 => "fog",
        51 | 53 | 55 => "light drizzle",
        56 | 57 => "freezing drizzle",
        61 | 63 | 65 => "rain",
        66 | 67 => "freezing rain",
        71 | 73 | 75 => "snow",
        77 => "snow grains",
        80 | 81 | 82 => "rain showers",
        85 | 86 => "snow showers",
        95 => "thunderstorm",
        96 | 99 => "thunderstorm with hail",
        _ => "unsettled weather",
    }
}

/// Synthesize the short summary string installed alongside a successful
/// `fetch_current` (§4.2).
pub fn summarize_current(extended: &CurrentExtended) -> String {
    let mut parts = Vec::new();
    if let Some(code) = extended.weather_code {
        parts.push(weather_code_phrase(code).to_string());
    }
    if let Some(temp) = extended.temperature_2m {
        parts.push(format!("{temp:.0}°C"));
    }

    let mut summary = if parts.is_empty() {
        "no data".to_string()
    } else {
        parts.join(", ")
    };

    if extended.uv_index.is_some_and(|uv| uv >= UV_WARNING_THRESHOLD) {
        summary.push_str(" — high UV, use sun protection");
    }
    if extended
        .precipitation
        .is_some_and(|mm| mm >= HEAVY_RAIN_THRESHOLD_MM)
    {
        summary.push_str(" — heavy rain warning");
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_object;
    use proptest::prelude::*;
    use serde_json::json;

    fn sample_extended() -> CurrentExtended {
        let payload = json!({
            "current": {
                "time": "2025-07-05T13:00",
                "temperature_2m": 21.4,
                "surface_pressure": 1013.2,
                "relative_humidity_2m": 58,
                "precipitation": 0,
                "windspeed_10m": 12.3,
                "winddirection_10m": 210,
                "cloudcover": 40,
                "uv_index": 5,
                "weather_code": 3
            }
        });
        decode_object(&payload).unwrap()
    }

    #[test]
    fn weather_snapshot_serializes_to_json_and_back() {
        let mut snapshot = WeatherSnapshot::default();
        snapshot.temperature_c = Some(21.4);
        snapshot.weather_code = Some(3);
        snapshot.summary = Some("overcast, 21°C".to_string());

        let encoded = serde_json::to_string(&snapshot).unwrap();
        let decoded: WeatherSnapshot = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn s3_current_extended_decodes_all_fields() {
        let c = sample_extended();
        assert_eq!(c.temperature_2m, Some(21.4));
        assert_eq!(c.surface_pressure, Some(1013.2));
        assert_eq!(c.relative_humidity_2m, Some(58.0));
        assert_eq!(c.windspeed_10m, Some(12.3));
    }

    #[test]
    fn current_extended_tolerates_null_fields() {
        let payload = json!({
            "current": {
                "time": "2025-07-05T13:00",
                "temperature_2m": null,
                "surface_pressure": null,
                "relative_humidity_2m": null,
                "precipitation": null,
                "windspeed_10m": null,
                "winddirection_10m": null,
                "cloudcover": null,
                "uv_index": null,
                "weather_code": null
            }
        });
        let c: CurrentExtended = decode_object(&payload).unwrap();
        assert_eq!(c.temperature_2m, None);
        assert_eq!(c.weather_code, None);
    }

    #[test]
    fn current_timecheck_only_needs_time() {
        let payload = json!({ "current": { "time": "2025-07-05T13:00" } });
        let c: CurrentTimecheck = decode_object(&payload).unwrap();
        assert_eq!(c.time, Timestamp::parse_from_iso_local("2025-07-05T13:00").unwrap());
    }

    #[test]
    fn s5_daily_first_entry_reads_index_zero() {
        let payload = json!({
            "daily": {
                "time": ["2025-07-04", "2025-07-05"],
                "sunrise": ["2025-07-04T06:10", "2025-07-05T06:11"],
                "sunset": ["2025-07-04T21:02", "2025-07-05T21:03"]
            }
        });
        let d: DailyFirstEntry = decode_object(&payload).unwrap();
        assert_eq!(d.date, Date::from_ymd(2025, 7, 4).unwrap());
        assert_eq!(
            d.sunrise,
            Some(TimeOfDay::parse_from_iso_datetime("2025-07-04T06:10").unwrap())
        );
    }

    #[test]
    fn daily_first_entry_errors_on_empty_series() {
        let payload = json!({ "daily": { "time": [] } });
        let result: Result<DailyFirstEntry, _> = decode_object(&payload);
        assert!(result.is_err());
    }

    #[test]
    fn summary_mentions_weather_code_phrase() {
        let c = sample_extended();
        assert!(summarize_current(&c).contains("overcast"));
    }

    proptest! {
        #[test]
        fn summary_contains_uv_warning_iff_above_threshold(uv in 0.0f64..15.0) {
            let mut c = sample_extended();
            c.uv_index = Some(uv);
            let summary = summarize_current(&c);
            prop_assert_eq!(summary.contains("high UV"), uv >= UV_WARNING_THRESHOLD);
        }

        #[test]
        fn summary_contains_heavy_rain_warning_iff_above_threshold(mm in 0.0f64..20.0) {
            let mut c = sample_extended();
            c.precipitation = Some(mm);
            let summary = summarize_current(&c);
            prop_assert_eq!(summary.contains("heavy rain"), mm >= HEAVY_RAIN_THRESHOLD_MM);
        }
    }
}
