//! Audit logging for payment and notification events.
//!
//! Provides structured audit events with redaction of merchant credentials
//! and buyer contact data, plus a correlation ID per event.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Types of auditable events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// A signed payment redirect was built.
    PaymentSigned,
    /// A payment redirect was built without a signature.
    UnsignedPaymentBuilt,
    /// A payment could not be built (missing configuration, bad request).
    PaymentRejected,
    /// A notification passed verification.
    NotificationAccepted,
    /// A notification failed verification and was ignored.
    NotificationRejected,
    /// A notification could not be parsed or lacked correlation fields.
    NotificationMalformed,
}

/// Details for an audit log entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditDetails {
    /// Merchant-side payment identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub m_payment_id: Option<String>,
    /// Gateway-side payment identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pf_payment_id: Option<String>,
    /// Payment status reported by the gateway.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    /// Amount as sent or received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    /// Why the event happened (sensitive data redacted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Audit log entry.
///
/// # Examples
///
/// ```
/// use payfast_signature::security::audit::{AuditEvent, AuditEventType};
/// use uuid::Uuid;
///
/// let event = AuditEvent::new(AuditEventType::NotificationRejected, "10000100", Uuid::new_v4())
///     .with_m_payment_id("order-42")
///     .with_reason("signature mismatch");
///
/// payfast_signature::security::audit::audit_log(&event);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the event occurred.
    pub timestamp: SystemTime,
    /// What happened.
    pub event_type: AuditEventType,
    /// Merchant account involved (last four characters visible).
    pub merchant_id: String,
    /// Correlation ID.
    pub request_id: Uuid,
    /// Contextual information.
    pub details: AuditDetails,
}

impl AuditEvent {
    /// Creates a new audit event. The merchant ID is redacted on entry.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl AsRef<str> is idiomatic for builder methods"
    )]
    pub fn new(event_type: AuditEventType, merchant_id: impl AsRef<str>, request_id: Uuid) -> Self {
        Self {
            timestamp: SystemTime::now(),
            event_type,
            merchant_id: redact_identifier(merchant_id.as_ref()),
            request_id,
            details: AuditDetails::default(),
        }
    }

    /// Adds the merchant payment ID.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_m_payment_id(mut self, id: impl Into<String>) -> Self {
        self.details.m_payment_id = Some(id.into());
        self
    }

    /// Adds the gateway payment ID.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_pf_payment_id(mut self, id: impl Into<String>) -> Self {
        self.details.pf_payment_id = Some(id.into());
        self
    }

    /// Adds the reported payment status.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_payment_status(mut self, status: impl Into<String>) -> Self {
        self.details.payment_status = Some(status.into());
        self
    }

    /// Adds the amount.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.details.amount = Some(amount.into());
        self
    }

    /// Adds a reason. Emails and card-like numbers are redacted.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.details.reason = Some(redact_sensitive(&reason.into()));
        self
    }
}

/// Logs an audit event to tracing with target "audit".
pub fn audit_log(event: &AuditEvent) {
    tracing::info!(
        target: "audit",
        timestamp = ?event.timestamp,
        event_type = ?event.event_type,
        merchant_id = %event.merchant_id,
        request_id = %event.request_id,
        details = ?event.details,
        "AUDIT"
    );
}

/// Redacts buyer contact data and card-like numbers from free text.
///
/// - Email addresses keep their first character and domain: `jane@x.com` → `j***@x.com`
/// - Runs of 12 or more digits are replaced with `XXXX`
///
/// # Examples
///
/// ```
/// use payfast_signature::security::audit::redact_sensitive;
///
/// let redacted = redact_sensitive("buyer jane.doe@example.com paid with 4111111111111111");
/// assert_eq!(redacted, "buyer j***@example.com paid with XXXX");
/// ```
#[must_use]
pub fn redact_sensitive(input: &str) -> String {
    input
        .split(' ')
        .map(|word| {
            if let Some((local, domain)) = word.split_once('@')
                && !local.is_empty()
                && domain.contains('.')
            {
                let first: String = local.chars().take(1).collect();
                return format!("{first}***@{domain}");
            }
            redact_digit_runs(word)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Replaces runs of at least 12 ASCII digits with `XXXX`.
fn redact_digit_runs(word: &str) -> String {
    let mut result = String::with_capacity(word.len());
    let mut digits = String::new();
    for ch in word.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        flush_digits(&mut result, &mut digits);
        result.push(ch);
    }
    flush_digits(&mut result, &mut digits);
    result
}

fn flush_digits(result: &mut String, digits: &mut String) {
    if digits.len() >= 12 {
        result.push_str("XXXX");
    } else {
        result.push_str(digits);
    }
    digits.clear();
}

/// Redacts an identifier to show only its last 4 characters.
///
/// # Examples
///
/// ```
/// use payfast_signature::security::audit::redact_identifier;
///
/// assert_eq!(redact_identifier("46f0cd694581a"), "*********581a");
/// assert_eq!(redact_identifier("abc"), "abc");
/// assert_eq!(redact_identifier(""), "");
/// ```
#[must_use]
pub fn redact_identifier(identifier: &str) -> String {
    let len = identifier.chars().count();
    if len <= 4 {
        return identifier.to_owned();
    }

    let visible: String = identifier.chars().skip(len - 4).collect();
    format!("{}{visible}", "*".repeat(len - 4))
}

/// Convenience macro for audit logging.
///
/// # Examples
///
/// ```
/// use payfast_signature::{audit, security::audit::AuditEventType};
/// use uuid::Uuid;
///
/// audit!(AuditEventType::PaymentSigned, "10000100", Uuid::new_v4());
///
/// audit!(
///     AuditEventType::NotificationAccepted,
///     "10000100",
///     Uuid::new_v4(),
///     with_m_payment_id("order-42"),
///     with_payment_status("COMPLETE")
/// );
/// ```
#[macro_export]
macro_rules! audit {
    ($event_type:expr, $merchant_id:expr, $request_id:expr) => {
        $crate::security::audit::audit_log(
            &$crate::security::audit::AuditEvent::new($event_type, $merchant_id, $request_id)
        )
    };
    ($event_type:expr, $merchant_id:expr, $request_id:expr, $($method:ident($arg:expr)),+ $(,)?) => {
        $crate::security::audit::audit_log(
            &$crate::security::audit::AuditEvent::new($event_type, $merchant_id, $request_id)
                $(.$method($arg))+
        )
    };
}
