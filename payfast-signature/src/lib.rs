//! PayFast Signature: payment signing and notification verification
//!
//! A Rust library for the PayFast hosted-payment integration: it builds the
//! signed form a buyer's browser posts to the gateway, and authenticates the
//! asynchronous notifications (ITN) the gateway sends back.
//!
//! # What it covers
//!
//! - **Signature codec**: canonical query string, optional passphrase, MD5 digest
//! - **Checkout**: order to form fields, with amount formatting and signed/unsigned modes
//! - **Notifications**: decode, authenticate, and an idempotent order state transition
//! - **Audit**: structured audit events with credential and contact redaction
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  PaymentRequest   ┌────────────────────────────┐
//! │   Checkout   │──────────────────▶│     payfast-signature      │
//! │    flow      │◀──────────────────│  checkout ──┐              │
//! └──────────────┘  PaymentRedirect  │             ▼              │
//!                                    │   signature (codec, MD5)   │
//! ┌──────────────┐  form body        │             ▲              │
//! │  Notify URL  │──────────────────▶│  notification ─┘           │
//! │   handler    │◀──────────────────│                            │
//! └──────────────┘  decision + HTTP  └────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## 1. Sign a field set
//!
//! ```rust
//! use payfast_signature::signature::{PaymentFieldSet, sign, verify};
//!
//! let fields = PaymentFieldSet::new()
//!     .with_field("merchant_id", "10038198")
//!     .with_field("merchant_key", "8yshtxb2mu1oa")
//!     .with_field("amount", "300")
//!     .with_field("item_name", "shoes");
//!
//! let signature = sign(&fields, None);
//! assert_eq!(signature, "19896722fa1f52adf855c29662d85f5e");
//! assert!(verify(Some(&signature), &fields, None));
//! ```
//!
//! ## 2. Build a payment redirect
//!
//! ```rust
//! use payfast_signature::{
//!     MerchantConfig,
//!     checkout::{PaymentRequest, SigningMode, build_payment},
//! };
//! use rust_decimal::Decimal;
//!
//! # fn example() -> payfast_signature::Result<()> {
//! let config = MerchantConfig::from_toml(
//!     r#"
//!     merchant_id = "10000100"
//!     merchant_key = "46f0cd694581a"
//!     passphrase = "jt7NOE43FZPn"
//!     sandbox = true
//!     "#,
//! )?;
//!
//! let request = PaymentRequest::new(Decimal::new(10000, 2), "Test Item");
//! let redirect = build_payment(&config, &request, SigningMode::Signed)?;
//!
//! println!("POST to {}", redirect.process_url);
//! for (name, value) in redirect.form_fields() {
//!     println!("{name}={value}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## 3. Authenticate a notification
//!
//! ```rust
//! use payfast_signature::{MerchantConfig, notification::NotificationReceiver};
//!
//! let config = MerchantConfig {
//!     merchant_id: "10000100".to_owned(),
//!     merchant_key: "46f0cd694581a".to_owned(),
//!     ..MerchantConfig::default()
//! };
//! let receiver = NotificationReceiver::new(&config);
//!
//! let decision = receiver.receive(b"m_payment_id=order-1&payment_status=COMPLETE");
//! // No signature: rejected, and the handler must leave the order alone.
//! assert_eq!(decision.response().status, 403);
//! ```
//!
//! # Module Organization
//!
//! - [`signature`]: field sets, canonicalization, signing and verification
//! - [`merchant`]: merchant account configuration
//! - [`checkout`]: outbound payment redirects
//! - [`notification`]: inbound notification handling
//! - [`security`]: audit logging and redaction
//! - [`error`]: error types
//!
//! # Open question: encoding and passphrase
//!
//! Whether the gateway expects percent-encoded or raw values, and whether a
//! passphrase is set on a given account, differs between integrations. Both
//! are explicit settings ([`MerchantConfig::use_url_encoding`],
//! [`MerchantConfig::passphrase`]) rather than fixed behaviour.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod checkout;
pub mod error;
pub mod merchant;
pub mod notification;
pub mod security;
pub mod signature;

pub use error::{PayfastError, Result};
pub use merchant::MerchantConfig;
pub use signature::{PaymentFieldSet, SignatureCodec};
