//! Reverse geocoding for map popups and long-press workflows.
//!
//! The `AddressResolver` turns coordinates into short display addresses. It
//! caches per quantized coordinate for the whole session and makes concurrent
//! callers for the same coordinate share one provider request.

pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod provider;
pub mod request;
pub mod resolver;
pub mod state;

pub use cache::*;
pub use config::*;
pub use error::*;
pub use format::*;
pub use provider::*;
pub use request::*;
pub use resolver::*;
pub use state::*;
