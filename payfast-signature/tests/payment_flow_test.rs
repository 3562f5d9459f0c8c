//! Checkout to notification, end to end.
//!
//! The gateway side is simulated: it signs its notification with the same
//! merchant passphrase and posts it back as a form body.

use payfast_signature::{
    MerchantConfig, PaymentFieldSet,
    checkout::{PaymentRequest, SigningMode, build_payment},
    notification::{
        NotificationDecision, NotificationReceiver, OrderPaymentState, PaymentStatus,
        RejectReason, Transition,
    },
};
use rust_decimal::Decimal;

const CONFIG: &str = r#"
    merchant_id = "10000100"
    merchant_key = "46f0cd694581a"
    passphrase = "jt7NOE43FZPn"
    sandbox = true
    return_url = "https://shop.example.com/return"
    cancel_url = "https://shop.example.com/cancel"
    notify_url = "https://shop.example.com/itn"
"#;

fn config() -> MerchantConfig {
    let config = MerchantConfig::from_toml(CONFIG).expect("valid TOML");
    config.validate().expect("valid configuration");
    config
}

/// Builds the notification the gateway would send for a completed payment.
fn gateway_notification(config: &MerchantConfig, status: &str) -> PaymentFieldSet {
    PaymentFieldSet::new()
        .with_field("m_payment_id", "order-42")
        .with_field("pf_payment_id", "1089250")
        .with_field("payment_status", status)
        .with_field("item_name", "Blue shoes")
        .with_field("amount_gross", "249.99")
        .with_field("amount_fee", "-5.75")
        .with_field("amount_net", "244.24")
        .with_field("merchant_id", config.merchant_id.as_str())
}

fn signed_body(config: &MerchantConfig, fields: &PaymentFieldSet) -> Vec<u8> {
    let signature = config.codec().sign(fields);
    let mut pairs: Vec<(&str, &str)> =
        fields.iter().filter_map(|(name, value)| value.map(|v| (name, v))).collect();
    pairs.push(("signature", signature.as_str()));
    serde_urlencoded::to_string(pairs).expect("encodable").into_bytes()
}

#[test]
fn test_checkout_form_is_signed_with_merchant_settings() {
    let config = config();
    let request = PaymentRequest::new(Decimal::new(24999, 2), "Blue shoes")
        .with_m_payment_id("order-42")
        .with_email_address("buyer@example.com");

    let redirect = build_payment(&config, &request, SigningMode::Signed).unwrap();

    assert_eq!(redirect.process_url.as_str(), "https://sandbox.payfast.co.za/eng/process");
    assert_eq!(redirect.fields.get("merchant_id"), Some("10000100"));
    assert_eq!(redirect.fields.get("notify_url"), Some("https://shop.example.com/itn"));
    assert_eq!(redirect.fields.get("amount"), Some("249.99"));
    assert!(!redirect.fields.contains("passphrase"));

    let signature = redirect.signature.as_deref().expect("signed mode");
    assert!(config.codec().verify(Some(signature), &redirect.fields));

    let pairs = redirect.form_fields();
    assert_eq!(pairs.last().map(|(name, _)| name.as_str()), Some("signature"));
    let names: Vec<&str> = pairs.iter().map(|(name, _)| name.as_str()).collect();
    let mut sorted = names[..names.len() - 1].to_vec();
    sorted.sort_unstable();
    assert_eq!(&names[..names.len() - 1], sorted.as_slice());
}

#[test]
fn test_unsigned_checkout_has_no_signature_field() {
    let config = config();
    let request = PaymentRequest::new(Decimal::new(10, 0), "Gift card");

    let redirect = build_payment(&config, &request, SigningMode::Unsigned).unwrap();

    assert!(redirect.signature.is_none());
    assert!(redirect.form_fields().iter().all(|(name, _)| name != "signature"));
    assert!(!redirect.to_form_body().unwrap().contains("signature="));
}

#[test]
fn test_authentic_notification_marks_order_paid_once() {
    let config = config();
    let receiver = NotificationReceiver::new(&config);
    let body = signed_body(&config, &gateway_notification(&config, "COMPLETE"));

    let decision = receiver.receive(&body);
    assert_eq!(decision.response().status, 200);
    let NotificationDecision::Accepted(notification) = decision else {
        panic!("expected acceptance");
    };
    assert_eq!(notification.m_payment_id, "order-42");
    assert_eq!(notification.pf_payment_id.as_deref(), Some("1089250"));
    assert_eq!(notification.amount_gross, Some(Decimal::new(24999, 2)));
    assert_eq!(notification.payment_status, PaymentStatus::Complete);

    let first = OrderPaymentState::Pending.apply(&notification.payment_status);
    assert_eq!(
        first,
        Transition::Changed { from: OrderPaymentState::Pending, to: OrderPaymentState::Paid }
    );

    // Redelivery of the same body: same decision, no further change.
    let again = receiver.receive(&body);
    let NotificationDecision::Accepted(redelivered) = again else {
        panic!("redelivery should be accepted");
    };
    assert_eq!(
        first.state().apply(&redelivered.payment_status),
        Transition::Unchanged(OrderPaymentState::Paid)
    );
}

#[test]
fn test_tampered_notification_is_rejected() {
    let config = config();
    let receiver = NotificationReceiver::new(&config);
    let fields = gateway_notification(&config, "COMPLETE");
    let body = String::from_utf8(signed_body(&config, &fields)).unwrap();
    let tampered = body.replace("amount_gross=249.99", "amount_gross=2.99");

    let decision = receiver.receive(tampered.as_bytes());

    assert_eq!(decision.response().status, 403);
    assert!(matches!(
        decision,
        NotificationDecision::Rejected { reason: RejectReason::SignatureMismatch, .. }
    ));
}

#[test]
fn test_notification_for_other_merchant_is_rejected() {
    let config = config();
    let receiver = NotificationReceiver::new(&config);
    let fields = gateway_notification(&config, "COMPLETE").with_field("merchant_id", "99999999");

    let decision = receiver.receive(&signed_body(&config, &fields));

    assert!(matches!(
        decision,
        NotificationDecision::Rejected { reason: RejectReason::MerchantMismatch, .. }
    ));
}

#[test]
fn test_failed_payment_after_paid_does_not_regress() {
    let config = config();
    let receiver = NotificationReceiver::new(&config);
    let body = signed_body(&config, &gateway_notification(&config, "FAILED"));

    let NotificationDecision::Accepted(notification) = receiver.receive(&body) else {
        panic!("authentic notification should be accepted");
    };

    assert_eq!(
        OrderPaymentState::Paid.apply(&notification.payment_status),
        Transition::Unchanged(OrderPaymentState::Paid)
    );
    assert_eq!(
        OrderPaymentState::Pending.apply(&notification.payment_status),
        Transition::Changed { from: OrderPaymentState::Pending, to: OrderPaymentState::Failed }
    );
}

#[test]
fn test_garbage_body_is_malformed() {
    let receiver = NotificationReceiver::new(&config());

    let decision = receiver.receive(b"payment_status=COMPLETE&amount_gross=%ZZ");

    assert_eq!(decision.response().status, 400);
    assert!(matches!(decision, NotificationDecision::Malformed { .. }));
}
