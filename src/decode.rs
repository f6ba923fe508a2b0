//! Typed JSON deserialization layer (§4.3): policy-based conversion from
//! `serde_json::Value` into domain types, used by the proxy to turn remote
//! responses into `WeatherSnapshot` fields.
//!
//! §9 re-architects the source's compile-time overload dispatch as an open
//! trait: [`FromJson`] is the per-type conversion capability, [`Validator`]
//! is the policy carried alongside each call, and [`Decode`] is the
//! per-record capability a caller implements instead of registering with a
//! central table.

use serde_json::Value;

use crate::errors::{DecodeError, JsonPath};
use crate::time::{Date, TimeOfDay, Timestamp};

/// Converts a single JSON value into `Self`. One impl per target type —
/// adding a new domain scalar means adding a new impl, not touching this
/// module.
pub trait FromJson: Sized {
    fn from_json(path: &JsonPath, value: &Value) -> Result<Self, DecodeError>;
}

/// A policy applied after conversion succeeds. The default [`Accept`]
/// validator is a no-op; callers needing a policy pass a different
/// implementation alongside the call instead of a compile-time flag.
pub trait Validator<T> {
    fn check(&self, path: &JsonPath, value: T) -> Result<T, DecodeError>;
}

/// Accepts any successfully converted value.
#[derive(Debug, Default, Clone, Copy)]
pub struct Accept;

impl<T> Validator<T> for Accept {
    fn check(&self, _path: &JsonPath, value: T) -> Result<T, DecodeError> {
        Ok(value)
    }
}

/// Rejects integers outside the inclusive compile-time bound `[LO, HI]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RangeValidator<const LO: i64, const HI: i64>;

impl<const LO: i64, const HI: i64> Validator<i64> for RangeValidator<LO, HI> {
    fn check(&self, path: &JsonPath, value: i64) -> Result<i64, DecodeError> {
        if value < LO || value > HI {
            Err(DecodeError::ValidationError {
                path: path.clone(),
                reason: format!("{value} not in [{LO}, {HI}]"),
            })
        } else {
            Ok(value)
        }
    }
}

/// Accepts only dates within the inclusive forecast window `[today, today +
/// N]` for a compile-time horizon `N` (days). `today` is a constructor
/// argument rather than a const generic since it's a runtime value supplied
/// by the injected [`crate::time::Clock`].
#[derive(Debug, Clone, Copy)]
pub struct ForecastDayValidator<const N: i64> {
    today: Date,
}

impl<const N: i64> ForecastDayValidator<N> {
    pub fn new(today: Date) -> Self {
        ForecastDayValidator { today }
    }
}

impl<const N: i64> Validator<Date> for ForecastDayValidator<N> {
    fn check(&self, path: &JsonPath, value: Date) -> Result<Date, DecodeError> {
        let latest = self.today.succ(N);
        if value < self.today || value > latest {
            Err(DecodeError::ValidationError {
                path: path.clone(),
                reason: format!(
                    "date {value} outside forecast window [{}, {latest}]",
                    self.today
                ),
            })
        } else {
            Ok(value)
        }
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    }
}

fn conversion_error(path: &JsonPath, found: impl Into<String>, target: &str) -> DecodeError {
    DecodeError::ConversionError {
        path: path.clone(),
        found: found.into(),
        target: target.to_string(),
    }
}

impl FromJson for bool {
    fn from_json(path: &JsonPath, value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => n
                .as_i64()
                .map(|i| i != 0)
                .or_else(|| n.as_u64().map(|u| u != 0))
                .ok_or_else(|| conversion_error(path, describe(value), "bool")),
            _ => Err(conversion_error(path, describe(value), "bool")),
        }
    }
}

macro_rules! impl_signed_from_json {
    ($($t:ty),+ $(,)?) => {
        $(
            impl FromJson for $t {
                fn from_json(path: &JsonPath, value: &Value) -> Result<Self, DecodeError> {
                    let n = match value {
                        Value::Number(n) => n
                            .as_i64()
                            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok())),
                        _ => None,
                    }
                    .ok_or_else(|| conversion_error(path, describe(value), stringify!($t)))?;
                    <$t>::try_from(n)
                        .map_err(|_| conversion_error(path, n.to_string(), stringify!($t)))
                }
            }
        )+
    };
}

macro_rules! impl_unsigned_from_json {
    ($($t:ty),+ $(,)?) => {
        $(
            impl FromJson for $t {
                fn from_json(path: &JsonPath, value: &Value) -> Result<Self, DecodeError> {
                    let n = match value {
                        Value::Number(n) => n
                            .as_u64()
                            .or_else(|| n.as_i64().and_then(|i| u64::try_from(i).ok())),
                        _ => None,
                    }
                    .ok_or_else(|| conversion_error(path, describe(value), stringify!($t)))?;
                    <$t>::try_from(n)
                        .map_err(|_| conversion_error(path, n.to_string(), stringify!($t)))
                }
            }
        )+
    };
}

impl_signed_from_json!(i8, i16, i32, i64);
impl_unsigned_from_json!(u8, u16, u32, u64);

/// Strips whitespace and a fixed set of currency markers, normalizes the
/// decimal separator, and parses. `"1 234,56 €"` → `1234.56`; `"1,234.56"` →
/// `1234.56` (comma read as a thousands separator since a dot is present).
fn parse_float_string(s: &str) -> Option<f64> {
    let mut cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    for marker in ["CHF", "EUR", "USD", "€", "$"] {
        cleaned = cleaned.replace(marker, "");
    }
    if cleaned.contains(',') && !cleaned.contains('.') {
        cleaned = cleaned.replace(',', ".");
    } else {
        cleaned = cleaned.replace(',', "");
    }
    cleaned.parse::<f64>().ok()
}

impl FromJson for f64 {
    fn from_json(path: &JsonPath, value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| conversion_error(path, describe(value), "f64")),
            Value::String(s) => parse_float_string(s)
                .ok_or_else(|| conversion_error(path, s.clone(), "f64")),
            _ => Err(conversion_error(path, describe(value), "f64")),
        }
    }
}

impl FromJson for f32 {
    fn from_json(path: &JsonPath, value: &Value) -> Result<Self, DecodeError> {
        f64::from_json(path, value).map(|v| v as f32)
    }
}

impl FromJson for String {
    fn from_json(path: &JsonPath, value: &Value) -> Result<Self, DecodeError> {
        value
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| conversion_error(path, describe(value), "String"))
    }
}

impl FromJson for Date {
    fn from_json(path: &JsonPath, value: &Value) -> Result<Self, DecodeError> {
        let s = value
            .as_str()
            .ok_or_else(|| conversion_error(path, describe(value), "Date"))?;
        Date::parse(s).ok_or_else(|| conversion_error(path, s.to_string(), "Date"))
    }
}

impl FromJson for TimeOfDay {
    fn from_json(path: &JsonPath, value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::String(s) => TimeOfDay::parse_from_iso_datetime(s)
                .ok_or_else(|| conversion_error(path, s.clone(), "TimeOfDay")),
            Value::Number(n) => {
                let secs = n
                    .as_u64()
                    .ok_or_else(|| conversion_error(path, describe(value), "TimeOfDay"))?;
                if secs >= 86_400 {
                    return Err(conversion_error(path, secs.to_string(), "TimeOfDay"));
                }
                TimeOfDay::from_seconds_in_day(secs as u32)
                    .ok_or_else(|| conversion_error(path, secs.to_string(), "TimeOfDay"))
            }
            _ => Err(conversion_error(path, describe(value), "TimeOfDay")),
        }
    }
}

impl FromJson for Timestamp {
    fn from_json(path: &JsonPath, value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::String(s) => Timestamp::parse_from_iso_local(s)
                .ok_or_else(|| conversion_error(path, s.clone(), "Timestamp")),
            Value::Number(n) => n
                .as_i64()
                .map(Timestamp::from_epoch_seconds)
                .ok_or_else(|| conversion_error(path, describe(value), "Timestamp")),
            _ => Err(conversion_error(path, describe(value), "Timestamp")),
        }
    }
}

/// Convert and validate a single JSON value.
pub fn value_from_json<T, V>(path: &JsonPath, value: &Value, validator: &V) -> Result<T, DecodeError>
where
    T: FromJson,
    V: Validator<T>,
{
    let converted = T::from_json(path, value)?;
    validator.check(path, converted)
}

/// Same as [`value_from_json`], except a JSON null yields `None` instead of
/// an error.
pub fn optional_from_json<T, V>(
    path: &JsonPath,
    value: &Value,
    validator: &V,
) -> Result<Option<T>, DecodeError>
where
    T: FromJson,
    V: Validator<T>,
{
    if value.is_null() {
        return Ok(None);
    }
    value_from_json(path, value, validator).map(Some)
}

/// Look up a required key in a JSON object and convert it. A missing key is
/// an error (use [`optional_field`] when absence is acceptable).
pub fn field<T, V>(path: &JsonPath, object: &Value, key: &str, validator: &V) -> Result<T, DecodeError>
where
    T: FromJson,
    V: Validator<T>,
{
    let obj = object
        .as_object()
        .ok_or_else(|| DecodeError::ShapeError {
            path: path.clone(),
            expected: "object".to_string(),
        })?;
    let field_path = path.field(key);
    let v = obj.get(key).ok_or_else(|| DecodeError::ShapeError {
        path: field_path.clone(),
        expected: format!("field `{key}`"),
    })?;
    value_from_json(&field_path, v, validator)
}

/// Like [`field`], but a missing key or a JSON null yields `None`.
pub fn optional_field<T, V>(
    path: &JsonPath,
    object: &Value,
    key: &str,
    validator: &V,
) -> Result<Option<T>, DecodeError>
where
    T: FromJson,
    V: Validator<T>,
{
    let obj = object
        .as_object()
        .ok_or_else(|| DecodeError::ShapeError {
            path: path.clone(),
            expected: "object".to_string(),
        })?;
    let field_path = path.field(key);
    match obj.get(key) {
        None => Ok(None),
        Some(v) => optional_from_json(&field_path, v, validator),
    }
}

/// Look up a required index in a JSON array and convert it. Out-of-range is
/// an error.
pub fn element<T, V>(path: &JsonPath, array: &Value, index: usize, validator: &V) -> Result<T, DecodeError>
where
    T: FromJson,
    V: Validator<T>,
{
    let arr = array
        .as_array()
        .ok_or_else(|| DecodeError::ShapeError {
            path: path.clone(),
            expected: "array".to_string(),
        })?;
    let index_path = path.index(index);
    let v = arr.get(index).ok_or_else(|| DecodeError::ShapeError {
        path: index_path.clone(),
        expected: format!("index {index} to exist"),
    })?;
    value_from_json(&index_path, v, validator)
}

/// Like [`element`], but an out-of-range index or a JSON null yields `None`.
pub fn optional_element<T, V>(
    path: &JsonPath,
    array: &Value,
    index: usize,
    validator: &V,
) -> Result<Option<T>, DecodeError>
where
    T: FromJson,
    V: Validator<T>,
{
    let arr = array
        .as_array()
        .ok_or_else(|| DecodeError::ShapeError {
            path: path.clone(),
            expected: "array".to_string(),
        })?;
    let index_path = path.index(index);
    match arr.get(index) {
        None => Ok(None),
        Some(v) => optional_from_json(&index_path, v, validator),
    }
}

/// A type that knows how to decode itself from a whole JSON record, the
/// open-trait replacement for the source's per-record registration (§9).
pub trait Decode: Sized {
    fn decode(path: &JsonPath, value: &Value) -> Result<Self, DecodeError>;
}

/// Decode a whole record from its root. Nested failures already carry their
/// full location — each `Decode` impl threads a [`JsonPath`] extended with
/// `.field()`/`.index()` down into every `field`/`element` call it makes, so
/// there is nothing left for this entry point to re-wrap.
pub fn decode_object<R: Decode>(value: &Value) -> Result<R, DecodeError> {
    R::decode(&JsonPath::root(), value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn bool_accepts_json_bool_and_nonzero_integer() {
        let root = JsonPath::root();
        assert_eq!(bool::from_json(&root, &json!(true)).unwrap(), true);
        assert_eq!(bool::from_json(&root, &json!(0)).unwrap(), false);
        assert_eq!(bool::from_json(&root, &json!(5)).unwrap(), true);
        assert!(bool::from_json(&root, &json!("true")).is_err());
    }

    #[test]
    fn integer_range_validator_boundaries() {
        // Boundary behaviors: rejects hi+1, accepts hi; accepts lo, rejects lo-1.
        let root = JsonPath::root();
        let v = RangeValidator::<0, 10>;
        assert!(v.check(&root, 10).is_ok());
        assert!(v.check(&root, 11).is_err());
        assert!(v.check(&root, 0).is_ok());
        assert!(v.check(&root, -1).is_err());
    }

    #[test]
    fn forecast_day_validator_boundaries() {
        let today = Date::from_ymd(2026, 7, 28).unwrap();
        let root = JsonPath::root();
        let v = ForecastDayValidator::<3>::new(today);
        assert!(v.check(&root, today).is_ok());
        assert!(v.check(&root, today.succ(3)).is_ok());
        assert!(v.check(&root, today.succ(-1)).is_err());
        assert!(v.check(&root, today.succ(4)).is_err());
    }

    #[test]
    fn time_of_day_seconds_boundaries() {
        let root = JsonPath::root();
        assert!(TimeOfDay::from_json(&root, &json!(0)).is_ok());
        assert!(TimeOfDay::from_json(&root, &json!(86399)).is_ok());
        assert!(TimeOfDay::from_json(&root, &json!(86400)).is_err());
        assert!(TimeOfDay::from_json(&root, &json!(-1)).is_err());
    }

    #[test]
    fn time_of_day_from_iso_datetime_takes_time_component() {
        let root = JsonPath::root();
        let t = TimeOfDay::from_json(&root, &json!("2026-07-28T06:15")).unwrap();
        assert_eq!(t.seconds_in_day(), 6 * 3600 + 15 * 60);
    }

    #[test]
    fn s6_currency_and_thousands_separator_normalization() {
        assert_eq!(parse_float_string("1 234,56 €"), Some(1234.56));
        assert_eq!(parse_float_string("1,234.56"), Some(1234.56));
        assert_eq!(parse_float_string("abc"), None);
    }

    #[test]
    fn float_from_json_accepts_number_and_normalized_string() {
        let root = JsonPath::root();
        assert_eq!(f64::from_json(&root, &json!(21.4)).unwrap(), 21.4);
        assert_eq!(
            f64::from_json(&root, &json!("1,234.56")).unwrap(),
            1234.56
        );
        assert!(f64::from_json(&root, &json!("abc")).is_err());
    }

    #[test]
    fn field_missing_key_is_an_error_but_optional_field_is_none() {
        let root = JsonPath::root();
        let obj = json!({ "temperature_2m": 21.4 });
        let missing: Result<f64, _> = field(&root, &obj, "surface_pressure", &Accept);
        assert!(missing.is_err());
        let optional: Option<f64> = optional_field(&root, &obj, "surface_pressure", &Accept).unwrap();
        assert_eq!(optional, None);
    }

    #[test]
    fn field_null_value_is_error_for_required_but_none_for_optional() {
        let root = JsonPath::root();
        let obj = json!({ "surface_pressure": null });
        let required: Result<f64, _> = field(&root, &obj, "surface_pressure", &Accept);
        assert!(required.is_err());
        let optional: Option<f64> = optional_field(&root, &obj, "surface_pressure", &Accept).unwrap();
        assert_eq!(optional, None);
    }

    #[test]
    fn element_out_of_range_is_an_error() {
        let root = JsonPath::root();
        let arr = json!(["2026-07-28"]);
        let ok: Date = element(&root, &arr, 0, &Accept).unwrap();
        assert_eq!(ok, Date::from_ymd(2026, 7, 28).unwrap());
        let err: Result<Date, _> = element(&root, &arr, 1, &Accept);
        assert!(err.is_err());
    }

    #[test]
    fn signed_integer_out_of_range_is_rejected() {
        let root = JsonPath::root();
        assert!(i8::from_json(&root, &json!(127)).is_ok());
        assert!(i8::from_json(&root, &json!(128)).is_err());
        assert!(i8::from_json(&root, &json!(-128)).is_ok());
        assert!(i8::from_json(&root, &json!(-129)).is_err());
    }

    #[test]
    fn unsigned_integer_rejects_negative() {
        let root = JsonPath::root();
        assert!(u32::from_json(&root, &json!(0)).is_ok());
        assert!(u32::from_json(&root, &json!(-1)).is_err());
    }

    proptest! {
        #[test]
        fn p7_f64_roundtrips_through_json(x in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
            let encoded = json!(x);
            let root = JsonPath::root();
            let decoded = f64::from_json(&root, &encoded).unwrap();
            prop_assert_eq!(decoded, x);
        }

        #[test]
        fn p7_i32_roundtrips_through_json(x in any::<i32>()) {
            let encoded = json!(x);
            let root = JsonPath::root();
            let decoded = i32::from_json(&root, &encoded).unwrap();
            prop_assert_eq!(decoded, x);
        }

        #[test]
        fn p7_date_roundtrips_through_json(offset in 0i64..3650) {
            let today = Date::from_ymd(2026, 1, 1).unwrap();
            let d = today.succ(offset);
            let encoded = json!(d.to_string());
            let root = JsonPath::root();
            let decoded = Date::from_json(&root, &encoded).unwrap();
            prop_assert_eq!(decoded, d);
        }
    }
}
