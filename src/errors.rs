//! Error taxonomy (§7). `DecodeError` is the JSON-decoder-specific family;
//! `CoreError` is the fetch-boundary family the proxy deals in. Decode
//! failures convert into the corresponding `CoreError` variant via `From`
//! so `WeatherProxy::fetch_*` can use `?` internally and still report a
//! clean `bool` at its own public boundary.

use std::fmt;

/// A location within a JSON document where a decode failure occurred —
/// e.g. `current.temperature_2m` or `daily[0]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPath(pub Vec<String>);

impl JsonPath {
    pub fn root() -> Self {
        JsonPath(Vec::new())
    }

    pub fn field(&self, name: &str) -> Self {
        let mut path = self.0.clone();
        path.push(name.to_string());
        JsonPath(path)
    }

    pub fn index(&self, i: usize) -> Self {
        let mut path = self.0.clone();
        path.push(format!("[{}]", i));
        JsonPath(path)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0.join("."))
        }
    }
}

/// Errors raised by the JSON decoder (§4.3, §7 kinds 2–5).
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("{path}: malformed JSON: {message}")]
    ParseError { path: JsonPath, message: String },

    #[error("{path}: expected {expected}")]
    ShapeError { path: JsonPath, expected: String },

    #[error("{path}: could not convert {found} to {target}")]
    ConversionError {
        path: JsonPath,
        found: String,
        target: String,
    },

    #[error("{path}: validation failed: {reason}")]
    ValidationError { path: JsonPath, reason: String },
}

/// Fetch-boundary error taxonomy (§7, kinds 1, 6 plus the decode family).
/// Kind 7 (Cancelled) has no variant here: the `running_flag` is only ever
/// consulted by the Scheduler (§5), whose `wait_next`/`poll_next` already
/// signal shutdown via `Option::None` rather than a `Result` — there is no
/// fetch-boundary call that observes the flag and needs to report it as an
/// error.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("lock acquisition timed out after {0:?}")]
    LockTimeout(std::time::Duration),
}
