//! Inbound payment notifications (ITN).
//!
//! The gateway posts a form-encoded notification to the merchant's notify URL
//! after every payment attempt, and may deliver the same notification more
//! than once. [`NotificationReceiver`] decides whether a delivery is
//! authentic; it never touches order state. Callers apply an accepted
//! notification with [`OrderPaymentState::apply`], which is idempotent.
//!
//! # Examples
//!
//! ```
//! use payfast_signature::{
//!     merchant::MerchantConfig,
//!     notification::{NotificationDecision, NotificationReceiver, OrderPaymentState},
//!     signature::PaymentFieldSet,
//! };
//!
//! let config = MerchantConfig {
//!     merchant_id: "10000100".to_owned(),
//!     merchant_key: "46f0cd694581a".to_owned(),
//!     ..MerchantConfig::default()
//! };
//!
//! // What the gateway would send
//! let fields = PaymentFieldSet::new()
//!     .with_field("m_payment_id", "order-1")
//!     .with_field("pf_payment_id", "1089250")
//!     .with_field("payment_status", "COMPLETE")
//!     .with_field("amount_gross", "100.00");
//! let signature = config.codec().sign(&fields);
//! let body = format!(
//!     "m_payment_id=order-1&pf_payment_id=1089250&payment_status=COMPLETE&amount_gross=100.00&signature={signature}"
//! );
//!
//! let receiver = NotificationReceiver::new(&config);
//! let decision = receiver.receive(body.as_bytes());
//! assert_eq!(decision.response().status, 200);
//!
//! if let NotificationDecision::Accepted(notification) = decision {
//!     let state = OrderPaymentState::Pending.apply(&notification.payment_status).state();
//!     assert_eq!(state, OrderPaymentState::Paid);
//! }
//! ```

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    audit,
    error::{PayfastError, Result},
    merchant::MerchantConfig,
    security::audit::{AuditEvent, AuditEventType, audit_log},
    signature::{PaymentFieldSet, SIGNATURE_FIELD, SignatureCodec},
};

/// Payment outcome reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    /// Funds received.
    Complete,
    /// Payment failed.
    Failed,
    /// Awaiting settlement.
    Pending,
    /// Buyer or merchant cancelled.
    Cancelled,
    /// Any status this crate does not know.
    Other(String),
}

impl PaymentStatus {
    /// Parses the gateway's status string. Unknown values map to [`Self::Other`].
    ///
    /// # Examples
    ///
    /// ```
    /// use payfast_signature::notification::PaymentStatus;
    ///
    /// assert_eq!(PaymentStatus::parse("COMPLETE"), PaymentStatus::Complete);
    /// assert_eq!(PaymentStatus::parse("complete"), PaymentStatus::Complete);
    /// assert_eq!(PaymentStatus::parse("REFUNDED"), PaymentStatus::Other("REFUNDED".to_owned()));
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "COMPLETE" => Self::Complete,
            "FAILED" => Self::Failed,
            "PENDING" => Self::Pending,
            "CANCELLED" => Self::Cancelled,
            _ => Self::Other(raw.to_owned()),
        }
    }

    /// Returns the gateway's spelling of this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
            Self::Pending => "PENDING",
            Self::Cancelled => "CANCELLED",
            Self::Other(raw) => raw,
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded notification.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Merchant payment identifier, correlating the notification with an order.
    pub m_payment_id: String,
    /// Gateway transaction identifier.
    pub pf_payment_id: Option<String>,
    /// Reported outcome.
    pub payment_status: PaymentStatus,
    /// Gross amount paid.
    pub amount_gross: Option<Decimal>,
    /// Merchant the notification claims to be for.
    pub merchant_id: Option<String>,
    /// Signature sent with the notification.
    pub claimed_signature: Option<String>,
    /// Every field except the signature.
    pub fields: PaymentFieldSet,
}

impl Notification {
    /// Decodes a form-encoded notification body.
    ///
    /// # Errors
    ///
    /// Returns [`PayfastError::MalformedInput`] for undecodable bodies and
    /// [`PayfastError::MalformedNotification`] when correlation fields are missing.
    pub fn from_form_body(body: &[u8]) -> Result<Self> {
        Self::from_fields(PaymentFieldSet::from_form_body(body)?)
    }

    /// Builds a notification from already-decoded fields.
    ///
    /// The `signature` field is moved out of the set into
    /// [`claimed_signature`](Self::claimed_signature).
    ///
    /// # Errors
    ///
    /// Returns [`PayfastError::MalformedNotification`] when `m_payment_id` or
    /// `payment_status` is missing or `amount_gross` is not a decimal.
    pub fn from_fields(mut fields: PaymentFieldSet) -> Result<Self> {
        let claimed_signature = fields.remove(SIGNATURE_FIELD).filter(|s| !s.is_empty());

        let m_payment_id = required(&fields, "m_payment_id")?.to_owned();
        let payment_status = PaymentStatus::parse(required(&fields, "payment_status")?);
        let amount_gross = fields
            .get("amount_gross")
            .filter(|v| !v.is_empty())
            .map(|raw| {
                Decimal::from_str(raw.trim()).map_err(|e| {
                    PayfastError::MalformedNotification(format!("amount_gross '{raw}': {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            m_payment_id,
            pf_payment_id: optional(&fields, "pf_payment_id"),
            payment_status,
            amount_gross,
            merchant_id: optional(&fields, "merchant_id"),
            claimed_signature,
            fields,
        })
    }
}

fn required<'a>(fields: &'a PaymentFieldSet, name: &str) -> Result<&'a str> {
    fields
        .get(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PayfastError::MalformedNotification(format!("missing {name}")))
}

fn optional(fields: &PaymentFieldSet, name: &str) -> Option<String> {
    fields.get(name).filter(|v| !v.is_empty()).map(str::to_owned)
}

/// Why an authentic-looking notification was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Signature missing or not matching the fields.
    SignatureMismatch,
    /// Notification addressed to another merchant account.
    MerchantMismatch,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignatureMismatch => f.write_str("signature mismatch"),
            Self::MerchantMismatch => f.write_str("merchant mismatch"),
        }
    }
}

/// HTTP response the notification endpoint should send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationResponse {
    /// Status code.
    pub status: u16,
    /// Plain-text body.
    pub body: &'static str,
}

/// Outcome of receiving one notification delivery.
#[derive(Debug, Clone)]
pub enum NotificationDecision {
    /// Authentic. The caller may update order state.
    Accepted(Notification),
    /// Failed authentication. Order state must not change.
    Rejected {
        /// Correlation ID from the rejected notification.
        m_payment_id: String,
        /// Why it was rejected.
        reason: RejectReason,
    },
    /// Not decodable or missing correlation fields.
    Malformed {
        /// What was wrong.
        reason: String,
    },
}

impl NotificationDecision {
    /// Returns true for [`Self::Accepted`].
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// HTTP response for this decision.
    ///
    /// Accepted notifications get `200 OK` regardless of the payment outcome
    /// so the gateway stops redelivering.
    #[must_use]
    pub const fn response(&self) -> NotificationResponse {
        match self {
            Self::Accepted(_) => NotificationResponse { status: 200, body: "OK" },
            Self::Rejected { .. } => NotificationResponse { status: 403, body: "Forbidden" },
            Self::Malformed { .. } => NotificationResponse { status: 400, body: "Bad Request" },
        }
    }
}

/// Authenticates notifications for one merchant account.
#[derive(Debug, Clone)]
pub struct NotificationReceiver {
    codec: SignatureCodec,
    merchant_id: String,
}

impl NotificationReceiver {
    /// Creates a receiver using the merchant's passphrase and encoding.
    ///
    /// When the configured merchant ID is empty, the merchant check is skipped.
    #[must_use]
    pub fn new(config: &MerchantConfig) -> Self {
        Self { codec: config.codec(), merchant_id: config.merchant_id.trim().to_owned() }
    }

    /// Decodes, authenticates and audits one notification body.
    ///
    /// Idempotent: the same body always yields the same decision.
    #[instrument(skip_all, fields(body_len = body.len()))]
    pub fn receive(&self, body: &[u8]) -> NotificationDecision {
        let request_id = Uuid::new_v4();
        match Notification::from_form_body(body) {
            Ok(notification) => self.authenticate(notification, request_id),
            Err(e) => {
                warn!(error = %e, "malformed notification");
                audit!(
                    AuditEventType::NotificationMalformed,
                    &self.merchant_id,
                    request_id,
                    with_reason(e.to_string()),
                );
                NotificationDecision::Malformed { reason: e.to_string() }
            }
        }
    }

    /// Authenticates an already-decoded notification.
    #[must_use]
    pub fn receive_notification(&self, notification: Notification) -> NotificationDecision {
        self.authenticate(notification, Uuid::new_v4())
    }

    fn authenticate(&self, notification: Notification, request_id: Uuid) -> NotificationDecision {
        let mut event =
            AuditEvent::new(AuditEventType::NotificationAccepted, &self.merchant_id, request_id)
                .with_m_payment_id(&notification.m_payment_id)
                .with_payment_status(notification.payment_status.as_str());
        if let Some(id) = &notification.pf_payment_id {
            event = event.with_pf_payment_id(id);
        }
        if let Some(amount) = notification.amount_gross {
            event = event.with_amount(amount.to_string());
        }

        let authentic =
            self.codec.verify(notification.claimed_signature.as_deref(), &notification.fields);
        let rejection = if !authentic {
            Some(RejectReason::SignatureMismatch)
        } else if self.merchant_mismatch(&notification) {
            Some(RejectReason::MerchantMismatch)
        } else {
            None
        };

        if let Some(reason) = rejection {
            warn!(m_payment_id = %notification.m_payment_id, %reason, "notification rejected");
            event.event_type = AuditEventType::NotificationRejected;
            audit_log(&event.with_reason(reason.to_string()));
            return NotificationDecision::Rejected {
                m_payment_id: notification.m_payment_id,
                reason,
            };
        }

        audit_log(&event);
        NotificationDecision::Accepted(notification)
    }

    fn merchant_mismatch(&self, notification: &Notification) -> bool {
        match &notification.merchant_id {
            Some(claimed) => !self.merchant_id.is_empty() && claimed.trim() != self.merchant_id,
            None => false,
        }
    }
}

/// Payment state of an order on the merchant side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPaymentState {
    /// No final outcome yet.
    Pending,
    /// Paid. Terminal.
    Paid,
    /// Payment failed.
    Failed,
    /// Payment cancelled.
    Cancelled,
}

/// Result of applying a notification to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The order moved to a new state.
    Changed {
        /// Previous state.
        from: OrderPaymentState,
        /// New state.
        to: OrderPaymentState,
    },
    /// Nothing to do; the order stays in this state.
    Unchanged(OrderPaymentState),
}

impl Transition {
    /// State after the transition.
    #[must_use]
    pub const fn state(self) -> OrderPaymentState {
        match self {
            Self::Changed { to, .. } => to,
            Self::Unchanged(state) => state,
        }
    }
}

impl OrderPaymentState {
    /// Applies a reported status.
    ///
    /// Redelivered notifications are no-ops, `Paid` never changes, and
    /// pending or unknown statuses never move an order.
    ///
    /// # Examples
    ///
    /// ```
    /// use payfast_signature::notification::{OrderPaymentState, PaymentStatus, Transition};
    ///
    /// let first = OrderPaymentState::Pending.apply(&PaymentStatus::Complete);
    /// assert!(matches!(first, Transition::Changed { to: OrderPaymentState::Paid, .. }));
    ///
    /// let again = first.state().apply(&PaymentStatus::Complete);
    /// assert_eq!(again, Transition::Unchanged(OrderPaymentState::Paid));
    /// ```
    #[must_use]
    pub fn apply(self, status: &PaymentStatus) -> Transition {
        let target = match status {
            PaymentStatus::Complete => Self::Paid,
            PaymentStatus::Failed => Self::Failed,
            PaymentStatus::Cancelled => Self::Cancelled,
            PaymentStatus::Pending | PaymentStatus::Other(_) => return Transition::Unchanged(self),
        };

        if self == Self::Paid || self == target {
            Transition::Unchanged(self)
        } else {
            Transition::Changed { from: self, to: target }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MerchantConfig {
        MerchantConfig {
            merchant_id: "10000100".to_owned(),
            merchant_key: "46f0cd694581a".to_owned(),
            passphrase: Some(zeroize::Zeroizing::new("jt7NOE43FZPn".to_owned())),
            ..MerchantConfig::default()
        }
    }

    fn notification_fields() -> PaymentFieldSet {
        PaymentFieldSet::new()
            .with_field("m_payment_id", "order-1")
            .with_field("pf_payment_id", "1089250")
            .with_field("payment_status", "COMPLETE")
            .with_field("item_name", "Test Item")
            .with_field("amount_gross", "100.00")
            .with_field("email_address", "sbtu01@payfast.io")
            .with_field("merchant_id", "10000100")
    }

    fn signed_body(fields: &PaymentFieldSet) -> String {
        let signature = config().codec().sign(fields);
        let mut pairs: Vec<(&str, &str)> =
            fields.iter().filter_map(|(k, v)| v.map(|v| (k, v))).collect();
        pairs.push(("signature", signature.as_str()));
        serde_urlencoded::to_string(pairs).unwrap()
    }

    #[test]
    fn test_payment_status_roundtrip_spelling() {
        for raw in ["COMPLETE", "FAILED", "PENDING", "CANCELLED"] {
            assert_eq!(PaymentStatus::parse(raw).as_str(), raw);
        }
        assert_eq!(PaymentStatus::parse("weird").to_string(), "weird");
    }

    #[test]
    fn test_from_form_body_extracts_fields() {
        let notification =
            Notification::from_form_body(signed_body(&notification_fields()).as_bytes()).unwrap();
        assert_eq!(notification.m_payment_id, "order-1");
        assert_eq!(notification.pf_payment_id.as_deref(), Some("1089250"));
        assert_eq!(notification.payment_status, PaymentStatus::Complete);
        assert_eq!(notification.amount_gross, Some(Decimal::new(10000, 2)));
        assert!(notification.claimed_signature.is_some());
        assert!(!notification.fields.contains("signature"));
    }

    #[test]
    fn test_missing_correlation_fields() {
        let missing_id = Notification::from_form_body(b"payment_status=COMPLETE");
        assert!(matches!(missing_id, Err(PayfastError::MalformedNotification(_))));

        let missing_status = Notification::from_form_body(b"m_payment_id=order-1");
        assert!(matches!(missing_status, Err(PayfastError::MalformedNotification(_))));
    }

    #[test]
    fn test_bad_amount_is_malformed() {
        let result =
            Notification::from_form_body(b"m_payment_id=1&payment_status=COMPLETE&amount_gross=abc");
        assert!(matches!(result, Err(PayfastError::MalformedNotification(_))));
    }

    #[test]
    fn test_valid_notification_accepted() {
        let receiver = NotificationReceiver::new(&config());
        let decision = receiver.receive(signed_body(&notification_fields()).as_bytes());
        assert!(decision.is_accepted());
        assert_eq!(decision.response(), NotificationResponse { status: 200, body: "OK" });
    }

    #[test]
    fn test_redelivery_gives_same_decision() {
        let receiver = NotificationReceiver::new(&config());
        let body = signed_body(&notification_fields());
        assert!(receiver.receive(body.as_bytes()).is_accepted());
        assert!(receiver.receive(body.as_bytes()).is_accepted());
    }

    #[test]
    fn test_tampered_notification_rejected() {
        let receiver = NotificationReceiver::new(&config());
        let body = signed_body(&notification_fields()).replace("100.00", "1.00");
        let decision = receiver.receive(body.as_bytes());
        assert!(matches!(
            decision,
            NotificationDecision::Rejected { reason: RejectReason::SignatureMismatch, .. }
        ));
        assert_eq!(decision.response().status, 403);
    }

    #[test]
    fn test_unsigned_notification_rejected() {
        let receiver = NotificationReceiver::new(&config());
        let decision = receiver.receive(b"m_payment_id=order-1&payment_status=COMPLETE");
        assert!(matches!(decision, NotificationDecision::Rejected { .. }));
    }

    #[test]
    fn test_other_merchant_rejected() {
        let fields = notification_fields().with_field("merchant_id", "99999999");
        let receiver = NotificationReceiver::new(&config());
        let decision = receiver.receive(signed_body(&fields).as_bytes());
        assert!(matches!(
            decision,
            NotificationDecision::Rejected { reason: RejectReason::MerchantMismatch, .. }
        ));
    }

    #[test]
    fn test_malformed_body() {
        let receiver = NotificationReceiver::new(&config());
        let decision = receiver.receive(b"payment_status=COMPLETE");
        assert!(matches!(decision, NotificationDecision::Malformed { .. }));
        assert_eq!(decision.response().status, 400);
    }

    #[test]
    fn test_state_transitions() {
        use OrderPaymentState::{Cancelled, Failed, Paid, Pending};

        assert_eq!(
            Pending.apply(&PaymentStatus::Complete),
            Transition::Changed { from: Pending, to: Paid }
        );
        assert_eq!(Pending.apply(&PaymentStatus::Failed).state(), Failed);
        assert_eq!(Failed.apply(&PaymentStatus::Complete).state(), Paid);
        assert_eq!(Pending.apply(&PaymentStatus::Cancelled).state(), Cancelled);
        assert_eq!(Paid.apply(&PaymentStatus::Failed), Transition::Unchanged(Paid));
        assert_eq!(Paid.apply(&PaymentStatus::Complete), Transition::Unchanged(Paid));
        assert_eq!(Failed.apply(&PaymentStatus::Failed), Transition::Unchanged(Failed));
        assert_eq!(Pending.apply(&PaymentStatus::Pending), Transition::Unchanged(Pending));
        assert_eq!(
            Pending.apply(&PaymentStatus::Other("REFUNDED".to_owned())),
            Transition::Unchanged(Pending)
        );
    }
}
