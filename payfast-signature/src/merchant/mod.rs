//! Merchant account configuration.
//!
//! Credentials, passphrase and encoding choice are passed around as an
//! explicit [`MerchantConfig`] so signing behaviour never depends on the
//! process environment.

pub mod config;

pub use config::{LIVE_PROCESS_URL, MerchantConfig, SANDBOX_PROCESS_URL};
