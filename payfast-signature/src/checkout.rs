//! Outbound payment redirects.
//!
//! Turns an order into the form a buyer's browser POSTs to the gateway's
//! hosted payment page, signed or unsigned.

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::{PayfastError, Result},
    merchant::{
        MerchantConfig,
        config::{parse_web_url, require_public_https},
    },
    security::audit::{AuditEvent, AuditEventType, audit_log},
    signature::{PaymentFieldSet, SIGNATURE_FIELD, canonical::signable_entries},
};

/// Maximum number of `custom_strN` / `custom_intN` passthrough fields.
pub const MAX_CUSTOM_FIELDS: usize = 5;

/// Whether a redirect carries a signature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SigningMode {
    /// Attach a signature computed with the merchant's codec.
    #[default]
    Signed,
    /// Omit the signature (simple integration path).
    Unsigned,
}

/// An order to be paid through the gateway.
#[derive(Debug, Clone, Default)]
pub struct PaymentRequest {
    /// Amount in the merchant's currency. Must be positive.
    pub amount: Decimal,
    /// Item name shown on the payment page.
    pub item_name: String,
    /// Longer item description.
    pub item_description: Option<String>,
    /// Merchant-side payment identifier, echoed back in notifications.
    pub m_payment_id: Option<String>,
    /// Buyer first name.
    pub name_first: Option<String>,
    /// Buyer last name.
    pub name_last: Option<String>,
    /// Buyer email address.
    pub email_address: Option<String>,
    /// Buyer cell number.
    pub cell_number: Option<String>,
    /// Passthrough strings sent as `custom_str1`..`custom_str5`.
    pub custom_str: Vec<String>,
    /// Passthrough integers sent as `custom_int1`..`custom_int5`.
    pub custom_int: Vec<i64>,
    /// Per-order override of the configured return URL.
    pub return_url: Option<String>,
    /// Per-order override of the configured cancel URL.
    pub cancel_url: Option<String>,
    /// Per-order override of the configured notify URL.
    pub notify_url: Option<String>,
}

impl PaymentRequest {
    /// Creates a request with the two mandatory order fields.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn new(amount: Decimal, item_name: impl Into<String>) -> Self {
        Self { amount, item_name: item_name.into(), ..Self::default() }
    }

    /// Sets the merchant payment identifier.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_m_payment_id(mut self, id: impl Into<String>) -> Self {
        self.m_payment_id = Some(id.into());
        self
    }

    /// Sets the buyer email address.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_email_address(mut self, email: impl Into<String>) -> Self {
        self.email_address = Some(email.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.item_name.trim().is_empty() {
            return Err(PayfastError::InvalidPaymentRequest("item_name must not be empty".to_owned()));
        }
        if self.custom_str.len() > MAX_CUSTOM_FIELDS {
            return Err(PayfastError::InvalidPaymentRequest(format!(
                "at most {MAX_CUSTOM_FIELDS} custom_str values allowed, got {}",
                self.custom_str.len()
            )));
        }
        if self.custom_int.len() > MAX_CUSTOM_FIELDS {
            return Err(PayfastError::InvalidPaymentRequest(format!(
                "at most {MAX_CUSTOM_FIELDS} custom_int values allowed, got {}",
                self.custom_int.len()
            )));
        }
        Ok(())
    }
}

/// A ready-to-submit payment form.
#[derive(Debug, Clone)]
pub struct PaymentRedirect {
    /// Gateway payment page the form posts to.
    pub process_url: url::Url,
    /// Payment fields, without the signature.
    pub fields: PaymentFieldSet,
    /// Signature, when built with [`SigningMode::Signed`].
    pub signature: Option<String>,
}

impl PaymentRedirect {
    /// Returns the form fields to POST, in canonical order with the signature last.
    ///
    /// Empty fields are left out, matching what was signed.
    #[must_use]
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = signable_entries(&self.fields)
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value.to_owned()))
            .collect();
        if let Some(signature) = &self.signature {
            pairs.push((SIGNATURE_FIELD.to_owned(), signature.clone()));
        }
        pairs
    }

    /// Encodes the form fields as an `application/x-www-form-urlencoded` body.
    ///
    /// # Errors
    ///
    /// Returns [`PayfastError::MalformedInput`] if serialization fails.
    pub fn to_form_body(&self) -> Result<String> {
        serde_urlencoded::to_string(self.form_fields())
            .map_err(|e| PayfastError::MalformedInput(format!("failed to encode form: {e}")))
    }
}

/// Formats an amount the way the gateway expects: two decimals, no grouping.
///
/// Rounds half away from zero.
///
/// # Examples
///
/// ```
/// use payfast_signature::checkout::format_amount;
/// use rust_decimal::Decimal;
///
/// assert_eq!(format_amount(Decimal::new(300, 0)), "300.00");
/// assert_eq!(format_amount(Decimal::new(12345, 3)), "12.35");
/// ```
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = round_to_cents(amount);
    rounded.rescale(2);
    rounded.to_string()
}

fn round_to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Builds a payment redirect for `request`.
///
/// This function:
/// 1. Validates the merchant configuration
/// 2. Validates the order and formats the amount
/// 3. Assembles the gateway field set
/// 4. Signs it when `mode` is [`SigningMode::Signed`]
/// 5. Emits an audit event either way
///
/// # Errors
///
/// Returns [`PayfastError::ConfigurationMissing`] when the merchant ID or key
/// is absent, [`PayfastError::InvalidConfig`] for bad URLs, and
/// [`PayfastError::InvalidPaymentRequest`] for bad order data.
///
/// # Examples
///
/// ```
/// use payfast_signature::{
///     checkout::{PaymentRequest, SigningMode, build_payment},
///     merchant::MerchantConfig,
/// };
/// use rust_decimal::Decimal;
///
/// # fn example() -> payfast_signature::Result<()> {
/// let config = MerchantConfig {
///     merchant_id: "10000100".to_owned(),
///     merchant_key: "46f0cd694581a".to_owned(),
///     sandbox: true,
///     ..MerchantConfig::default()
/// };
///
/// let request = PaymentRequest::new(Decimal::new(10000, 2), "Test Item").with_m_payment_id("order-1");
/// let redirect = build_payment(&config, &request, SigningMode::Signed)?;
///
/// assert_eq!(redirect.fields.get("amount"), Some("100.00"));
/// assert!(redirect.signature.is_some());
/// # Ok(())
/// # }
/// ```
#[instrument(skip_all, fields(m_payment_id = ?request.m_payment_id, mode = ?mode))]
pub fn build_payment(
    config: &MerchantConfig,
    request: &PaymentRequest,
    mode: SigningMode,
) -> Result<PaymentRedirect> {
    let request_id = Uuid::new_v4();
    let result = assemble_redirect(config, request, mode);

    let event = match &result {
        Ok(redirect) => {
            let event_type = if redirect.signature.is_some() {
                AuditEventType::PaymentSigned
            } else {
                AuditEventType::UnsignedPaymentBuilt
            };
            let mut event = AuditEvent::new(event_type, &config.merchant_id, request_id);
            if let Some(amount) = redirect.fields.get("amount") {
                event = event.with_amount(amount);
            }
            event
        }
        Err(e) => AuditEvent::new(AuditEventType::PaymentRejected, &config.merchant_id, request_id)
            .with_reason(e.to_string()),
    };
    let event = match &request.m_payment_id {
        Some(id) => event.with_m_payment_id(id),
        None => event,
    };
    audit_log(&event);

    if result.is_ok() {
        info!(%request_id, "payment redirect built");
    }
    result
}

fn assemble_redirect(
    config: &MerchantConfig,
    request: &PaymentRequest,
    mode: SigningMode,
) -> Result<PaymentRedirect> {
    config.validate()?;
    request.validate()?;

    let mut cents = round_to_cents(request.amount);
    if cents <= Decimal::ZERO {
        return Err(PayfastError::InvalidPaymentRequest(format!(
            "amount must be positive, got {}",
            request.amount
        )));
    }
    cents.rescale(2);
    if cents.scale() != 2 {
        return Err(PayfastError::InvalidPaymentRequest(format!(
            "amount {} is too large to express in cents",
            request.amount
        )));
    }
    let amount = cents.to_string();

    let mut fields = PaymentFieldSet::new()
        .with_field("merchant_id", config.merchant_id.trim())
        .with_field("merchant_key", config.merchant_key.trim())
        .with_field("amount", amount)
        .with_field("item_name", request.item_name.trim());

    let urls = [
        ("return_url", request.return_url.as_ref().or(config.return_url.as_ref())),
        ("cancel_url", request.cancel_url.as_ref().or(config.cancel_url.as_ref())),
        ("notify_url", request.notify_url.as_ref().or(config.notify_url.as_ref())),
    ];
    for (name, url) in urls {
        if let Some(url) = url {
            let parsed = parse_web_url(name, url)?;
            if name == "notify_url" && !config.sandbox {
                require_public_https(name, &parsed)?;
            }
            fields.insert(name, url.as_str());
        }
    }

    let optional = [
        ("item_description", &request.item_description),
        ("m_payment_id", &request.m_payment_id),
        ("name_first", &request.name_first),
        ("name_last", &request.name_last),
        ("email_address", &request.email_address),
        ("cell_number", &request.cell_number),
    ];
    for (name, value) in optional {
        fields.insert_optional(name, value.clone());
    }

    for (index, value) in request.custom_str.iter().enumerate() {
        fields.insert(format!("custom_str{}", index + 1), value.as_str());
    }
    for (index, value) in request.custom_int.iter().enumerate() {
        fields.insert(format!("custom_int{}", index + 1), value.to_string());
    }

    let signature = match mode {
        SigningMode::Signed => Some(config.codec().sign(&fields)),
        SigningMode::Unsigned => None,
    };

    Ok(PaymentRedirect { process_url: config.process_url()?, fields, signature })
}
