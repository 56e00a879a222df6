//! Source adapters for gold price discovery: fetch one endpoint, hand back
//! its raw payload. Knows nothing about prices.

mod client;
mod errors;
mod payload;
pub mod user_agent;
pub use self::client::{Client, DEFAULT_TIMEOUT_SECS};
pub use self::errors::Error;
pub use self::payload::{Endpoint, PayloadFormat, RawPayload};
