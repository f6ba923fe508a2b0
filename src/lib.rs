//! Sensor-side weather acquisition core (§1): a timed event scheduler, a
//! weather proxy/cache, and a typed JSON decoder, plus the ambient
//! collaborators (HTTP client, configuration, running flag, clock) that
//! wire them together. See `main.rs` for the driver loop.

pub mod config;
pub mod decode;
pub mod errors;
pub mod http_client;
pub mod proxy;
pub mod running;
pub mod scheduler;
pub mod time;
pub mod weather;
