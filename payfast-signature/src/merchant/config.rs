//! Merchant configuration types.
//!
//! This module defines the TOML-deserializable merchant account settings that
//! drive signing, checkout and notification handling.

use std::{fmt, path::Path};

use serde::Deserialize;
use url::Url;
use zeroize::Zeroizing;

use crate::{
    error::{PayfastError, Result},
    security::audit::redact_identifier,
    signature::{EncodingMode, SignatureCodec, SigningOptions},
};

/// Live gateway payment page.
pub const LIVE_PROCESS_URL: &str = "https://www.payfast.co.za/eng/process";

/// Sandbox gateway payment page.
pub const SANDBOX_PROCESS_URL: &str = "https://sandbox.payfast.co.za/eng/process";

/// Merchant account configuration.
///
/// Every setting is explicit; nothing is read from the process environment.
///
/// # Examples
///
/// ```
/// use payfast_signature::merchant::MerchantConfig;
///
/// let toml = r#"
///     merchant_id = "10000100"
///     merchant_key = "46f0cd694581a"
///     passphrase = "jt7NOE43FZPn"
///     sandbox = true
///     notify_url = "https://shop.example.com/payfast/notify"
/// "#;
///
/// let config = MerchantConfig::from_toml(toml).unwrap();
/// assert!(config.validate().is_ok());
/// assert!(config.codec().has_passphrase());
/// ```
#[derive(Clone, Deserialize)]
pub struct MerchantConfig {
    /// Merchant identifier issued by the gateway.
    #[serde(default)]
    pub merchant_id: String,

    /// Merchant key issued by the gateway.
    #[serde(default)]
    pub merchant_key: String,

    /// Optional shared secret appended to every signing input.
    #[serde(default)]
    pub passphrase: Option<Zeroizing<String>>,

    /// Percent-encode values before signing (default: true).
    #[serde(default = "default_use_url_encoding")]
    pub use_url_encoding: bool,

    /// Target the sandbox gateway.
    #[serde(default)]
    pub sandbox: bool,

    /// Override for the gateway payment page URL.
    #[serde(default)]
    pub process_url: Option<String>,

    /// Where the buyer lands after paying.
    #[serde(default)]
    pub return_url: Option<String>,

    /// Where the buyer lands after cancelling.
    #[serde(default)]
    pub cancel_url: Option<String>,

    /// Server-to-server notification endpoint.
    #[serde(default)]
    pub notify_url: Option<String>,
}

const fn default_use_url_encoding() -> bool {
    true
}

impl Default for MerchantConfig {
    fn default() -> Self {
        Self {
            merchant_id: String::new(),
            merchant_key: String::new(),
            passphrase: None,
            use_url_encoding: true,
            sandbox: false,
            process_url: None,
            return_url: None,
            cancel_url: None,
            notify_url: None,
        }
    }
}

impl fmt::Debug for MerchantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantConfig")
            .field("merchant_id", &self.merchant_id)
            .field("merchant_key", &redact_identifier(&self.merchant_key))
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .field("use_url_encoding", &self.use_url_encoding)
            .field("sandbox", &self.sandbox)
            .field("process_url", &self.process_url)
            .field("return_url", &self.return_url)
            .field("cancel_url", &self.cancel_url)
            .field("notify_url", &self.notify_url)
            .finish()
    }
}

impl MerchantConfig {
    /// Parses a configuration from TOML.
    ///
    /// Parsing does not validate; call [`validate`](Self::validate) before use.
    ///
    /// # Errors
    ///
    /// Returns [`PayfastError::InvalidConfig`] on TOML syntax or type errors.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| PayfastError::InvalidConfig(format!("failed to parse TOML: {e}")))
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`PayfastError::InvalidConfig`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PayfastError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    /// Validates the configuration.
    ///
    /// This method checks that:
    /// - Merchant identifier and key are present
    /// - Return and cancel URLs parse as HTTP(S)
    /// - The notify URL parses, and outside the sandbox is HTTPS and not loopback
    /// - A process URL override is HTTPS
    ///
    /// # Errors
    ///
    /// Returns [`PayfastError::ConfigurationMissing`] naming the first absent
    /// credential, or [`PayfastError::InvalidConfig`] for a bad URL.
    pub fn validate(&self) -> Result<()> {
        if self.merchant_id.trim().is_empty() {
            return Err(PayfastError::ConfigurationMissing("merchant_id".to_owned()));
        }
        if self.merchant_key.trim().is_empty() {
            return Err(PayfastError::ConfigurationMissing("merchant_key".to_owned()));
        }

        if let Some(url) = &self.return_url {
            parse_web_url("return_url", url)?;
        }
        if let Some(url) = &self.cancel_url {
            parse_web_url("cancel_url", url)?;
        }
        if let Some(url) = &self.notify_url {
            let parsed = parse_web_url("notify_url", url)?;
            if !self.sandbox {
                require_public_https("notify_url", &parsed)?;
            }
        }
        if self.process_url.is_some() {
            self.process_url()?;
        }

        Ok(())
    }

    /// Value encoding selected by [`use_url_encoding`](Self::use_url_encoding).
    #[must_use]
    pub const fn encoding(&self) -> EncodingMode {
        if self.use_url_encoding { EncodingMode::UrlEncoded } else { EncodingMode::Raw }
    }

    /// Signing options derived from this configuration.
    #[must_use]
    pub fn signing_options(&self) -> SigningOptions {
        SigningOptions { passphrase: self.passphrase.clone(), encoding: self.encoding() }
    }

    /// Builds a codec for this merchant.
    #[must_use]
    pub fn codec(&self) -> SignatureCodec {
        SignatureCodec::new(self.signing_options())
    }

    /// Resolves the gateway payment page URL.
    ///
    /// # Errors
    ///
    /// Returns [`PayfastError::InvalidConfig`] if an override is set and is not
    /// an HTTPS URL.
    pub fn process_url(&self) -> Result<Url> {
        let raw = self.process_url.as_deref().unwrap_or(if self.sandbox {
            SANDBOX_PROCESS_URL
        } else {
            LIVE_PROCESS_URL
        });
        let url = Url::parse(raw)
            .map_err(|e| PayfastError::InvalidConfig(format!("invalid process_url '{raw}': {e}")))?;
        if url.scheme() != "https" {
            return Err(PayfastError::InvalidConfig(format!(
                "process_url must use HTTPS, got: {}",
                url.scheme()
            )));
        }
        Ok(url)
    }
}

/// Parses an HTTP or HTTPS URL.
pub(crate) fn parse_web_url(name: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| PayfastError::InvalidConfig(format!("invalid {name} '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PayfastError::InvalidConfig(format!(
            "{name} must use HTTP or HTTPS, got: {}",
            url.scheme()
        )));
    }
    Ok(url)
}

/// Rejects non-HTTPS and loopback URLs the gateway could never reach.
pub(crate) fn require_public_https(name: &str, url: &Url) -> Result<()> {
    if url.scheme() != "https" {
        return Err(PayfastError::InvalidConfig(format!(
            "{name} must use HTTPS outside the sandbox, got: {}",
            url.scheme()
        )));
    }

    if let Some(host) = url.host_str() {
        let host_lower = host.to_lowercase();
        if host_lower == "localhost"
            || host_lower.starts_with("127.")
            || host_lower == "[::1]"
            || host_lower == "::1"
        {
            return Err(PayfastError::InvalidConfig(format!(
                "{name} must not be localhost or loopback: {host}"
            )));
        }
    }

    Ok(())
}
