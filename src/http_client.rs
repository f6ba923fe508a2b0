//! HTTP collaborator contract (§4.4): a synchronous `GET(path) -> body` with
//! exactly one reconnect-and-retry on a dropped-connection cause. Deliberately
//! out of scope for this core is the transport's own socket handling beyond
//! that contract (§1) — the real work happens in `reqwest::blocking`.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use crate::errors::CoreError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Synchronous request/response collaborator the Proxy drives.
pub trait HttpClient: Send + Sync {
    fn get(&self, path: &str) -> Result<String, CoreError>;
}

/// A `reqwest::blocking::Client`-backed implementation against a fixed host
/// and port, kept alive across calls by the client's own connection pool.
pub struct ReqwestHttpClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl ReqwestHttpClient {
    pub fn new(api_host: &str, api_port: u16) -> Self {
        Self::with_base_url(format!("https://{api_host}:{api_port}"))
    }

    /// Construct against an arbitrary base URL (scheme included) — used by
    /// integration tests to point at a local `wiremock::MockServer`.
    pub fn with_base_url(base_url: String) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        ReqwestHttpClient { client, base_url }
    }

    fn full_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get_once(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client.get(url).send()?.error_for_status()?.text()
    }
}

/// True for the causes §4.4 says warrant exactly one reconnect retry: peer
/// closed stream, connection reset, broken pipe, end-of-stream. Anything else
/// propagates without a retry.
fn is_reconnectable(err: &reqwest::Error) -> bool {
    let mut cause: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(err) = cause {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            return matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            );
        }
        cause = err.source();
    }
    false
}

impl HttpClient for ReqwestHttpClient {
    fn get(&self, path: &str) -> Result<String, CoreError> {
        let url = self.full_url(path);
        match self.get_once(&url) {
            Ok(body) => Ok(body),
            Err(first_err) if is_reconnectable(&first_err) => {
                tracing::warn!(error = %first_err, path, "reconnecting after dropped connection");
                self.get_once(&url)
                    .map_err(|e| CoreError::Transport(e.to_string()))
            }
            Err(e) => Err(CoreError::Transport(e.to_string())),
        }
    }
}
