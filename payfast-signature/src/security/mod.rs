//! Security features for payment handling.
//!
//! # Audit Logging
//!
//! Every payment redirect and every notification decision produces a
//! structured audit event on the `audit` tracing target. Merchant identifiers
//! are cut down to their last four characters and buyer emails are masked:
//!
//! ```rust
//! use payfast_signature::security::audit::{AuditEvent, AuditEventType};
//! use uuid::Uuid;
//!
//! let event = AuditEvent::new(AuditEventType::NotificationRejected, "10000100", Uuid::new_v4())
//!     .with_m_payment_id("order-42")
//!     .with_reason("signature mismatch");
//!
//! payfast_signature::security::audit::audit_log(&event);
//! ```
//!
//! # Security Considerations
//!
//! - Passphrases never reach a log line or a `Debug` rendering
//! - Signature comparison is constant time
//! - Rejected notifications are audited but never mutate order state

pub mod audit;

pub use audit::{
    AuditDetails, AuditEvent, AuditEventType, audit_log, redact_identifier, redact_sensitive,
};
