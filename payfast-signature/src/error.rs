//! Error types for PayFast signing and notification handling.
//!
//! All errors implement the standard [`std::error::Error`] trait via [`thiserror::Error`].
//!
//! # Error Categories
//!
//! - **Input Errors** ([`PayfastError::MalformedInput`]): field data that cannot be decoded
//! - **Configuration Errors** ([`PayfastError::ConfigurationMissing`],
//!   [`PayfastError::InvalidConfig`]): merchant setup problems
//! - **Request Errors** ([`PayfastError::InvalidPaymentRequest`]): outbound payment data rejected
//!   before it reaches the gateway
//! - **Notification Errors** ([`PayfastError::MalformedNotification`]): inbound notifications
//!   missing the fields needed to correlate them with an order
//!
//! A signature mismatch is not an error. [`verify`](crate::signature::verify) returns `false`
//! and callers branch on it.
//!
//! # Examples
//!
//! ```
//! use payfast_signature::error::{PayfastError, Result};
//!
//! fn require_merchant_id(merchant_id: &str) -> Result<&str> {
//!     if merchant_id.is_empty() {
//!         return Err(PayfastError::ConfigurationMissing("merchant_id".to_owned()));
//!     }
//!     Ok(merchant_id)
//! }
//!
//! assert!(require_merchant_id("").is_err());
//! ```

use thiserror::Error;

/// Result type alias for PayFast operations.
///
/// All fallible functions in this crate return this type.
pub type Result<T> = std::result::Result<T, PayfastError>;

/// Errors that can occur while building payments or handling notifications.
///
/// The messages are user-facing: they name the offending field or value
/// without ever echoing secrets such as the passphrase.
///
/// # Error Recovery
///
/// - **Input errors** ([`MalformedInput`](Self::MalformedInput)): reject the request
/// - **Configuration errors** ([`ConfigurationMissing`](Self::ConfigurationMissing),
///   [`InvalidConfig`](Self::InvalidConfig)): fix the merchant configuration and retry
/// - **Request errors** ([`InvalidPaymentRequest`](Self::InvalidPaymentRequest)): fix the
///   order data
/// - **Notification errors** ([`MalformedNotification`](Self::MalformedNotification)): answer
///   with a non-2xx status and do not touch order state
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum PayfastError {
    /// Field input could not be decoded.
    ///
    /// Occurs when a form-encoded body is not valid
    /// `application/x-www-form-urlencoded` data or decodes to invalid UTF-8.
    ///
    /// # Recovery
    ///
    /// This is a caller bug or a hostile request. Reject it without retrying.
    #[error("Malformed field input: {0}")]
    MalformedInput(String),

    /// A required merchant setting is absent.
    ///
    /// Occurs when the merchant identifier or merchant key is empty while
    /// constructing an outbound payment. The payload names the missing field.
    ///
    /// # Recovery
    ///
    /// Set the field in the merchant configuration file. Surface the message to
    /// the operator rather than crashing.
    ///
    /// # Examples
    ///
    /// ```
    /// use payfast_signature::error::PayfastError;
    ///
    /// let err = PayfastError::ConfigurationMissing("merchant_key".to_owned());
    /// assert_eq!(err.to_string(), "Merchant configuration missing: merchant_key");
    /// ```
    #[error("Merchant configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Merchant configuration is present but invalid.
    ///
    /// Common causes include:
    /// - TOML syntax errors
    /// - Return, cancel or notify URLs that do not parse or do not use HTTPS
    /// - A process URL override that is not HTTPS
    ///
    /// # Recovery
    ///
    /// Correct the configuration file.
    #[error("Invalid merchant configuration: {0}")]
    InvalidConfig(String),

    /// Outbound payment request rejected before signing.
    ///
    /// Common causes include:
    /// - Zero or negative amount
    /// - Empty item name
    /// - More than five custom passthrough strings or integers
    ///
    /// # Recovery
    ///
    /// Fix the order data and rebuild the payment.
    #[error("Invalid payment request: {0}")]
    InvalidPaymentRequest(String),

    /// Inbound notification lacks correlation fields.
    ///
    /// Occurs when `m_payment_id` or `payment_status` is absent, or when an
    /// amount field is not a decimal number.
    ///
    /// # Recovery
    ///
    /// Respond with a non-2xx status. The gateway may redeliver.
    #[error("Malformed payment notification: {0}")]
    MalformedNotification(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = PayfastError::MalformedInput("invalid utf-8".into());
        assert_eq!(error.to_string(), "Malformed field input: invalid utf-8");
    }

    #[test]
    fn test_configuration_missing_names_field() {
        let error = PayfastError::ConfigurationMissing("merchant_id".to_owned());
        assert!(error.to_string().contains("merchant_id"));
    }

    #[test]
    fn test_invalid_payment_request() {
        let error = PayfastError::InvalidPaymentRequest("amount must be positive".to_owned());
        assert_eq!(error.to_string(), "Invalid payment request: amount must be positive");
    }

    #[test]
    fn test_malformed_notification() {
        let error = PayfastError::MalformedNotification("missing m_payment_id".to_owned());
        assert!(error.to_string().starts_with("Malformed payment notification"));
    }
}
