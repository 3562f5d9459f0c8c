//! Known-answer tests for the signature algorithm.
//!
//! Digests were computed independently over the canonical strings shown.

use payfast_signature::signature::{
    EncodingMode, PaymentFieldSet, SignatureCodec, SigningOptions, canonicalize, md5_hex, sign,
    verify,
};

fn vector_fields() -> PaymentFieldSet {
    PaymentFieldSet::new()
        .with_field("merchant_id", "10038198")
        .with_field("merchant_key", "8yshtxb2mu1oa")
        .with_field("amount", "300")
        .with_field("item_name", "shoes")
}

#[test]
fn test_reference_vector_without_passphrase() {
    let fields = vector_fields();

    assert_eq!(
        canonicalize(&fields),
        "amount=300&item_name=shoes&merchant_id=10038198&merchant_key=8yshtxb2mu1oa"
    );
    assert_eq!(sign(&fields, None), "19896722fa1f52adf855c29662d85f5e");
}

#[test]
fn test_reference_vector_with_passphrase() {
    let fields = vector_fields();
    let signature = sign(&fields, Some("secret"));

    assert_eq!(signature, "d3e9f7b38f22c1d02d562f685a9d6b64");
    assert!(verify(Some(&signature), &fields, Some("secret")));
    assert!(!verify(Some(&signature), &fields, None));
    assert!(!verify(Some(&signature), &fields, Some("Secret")));
}

#[test]
fn test_empty_passphrase_is_no_passphrase() {
    let fields = vector_fields();
    assert_eq!(sign(&fields, Some("")), sign(&fields, None));
}

#[test]
fn test_empty_field_set() {
    let empty = PaymentFieldSet::new();

    assert_eq!(canonicalize(&empty), "");
    assert_eq!(sign(&empty, None), "d41d8cd98f00b204e9800998ecf8427e");
    // The passphrase is still appended with its leading separator.
    assert_eq!(sign(&empty, Some("secret")), "b94c55600a7819b09ca07a1003817758");
}

#[test]
fn test_signature_field_and_empty_values_are_ignored() {
    let mut fields = PaymentFieldSet::new()
        .with_field("b", "x")
        .with_field("a", "")
        .with_field("signature", "deadbeef");
    fields.insert_optional("c", None::<String>);

    assert_eq!(canonicalize(&fields), "b=x");
    assert_eq!(sign(&fields, None), "0a15cec7eb9dc6289907e36e82029871");
}

#[test]
fn test_values_are_percent_encoded() {
    let fields = PaymentFieldSet::new().with_field("item_name", "Order #1");

    assert_eq!(canonicalize(&fields), "item_name=Order%20%231");
    assert_eq!(sign(&fields, None), "b9c0eb810ad2cd804136cf4573b543d4");
}

#[test]
fn test_raw_encoding_hashes_values_verbatim() {
    let fields = PaymentFieldSet::new().with_field("item_name", "Order #1");
    let raw = SignatureCodec::new(SigningOptions::default().with_encoding(EncodingMode::Raw));

    assert_eq!(raw.canonicalize(&fields), "item_name=Order #1");
    assert_eq!(raw.sign(&fields), md5_hex(b"item_name=Order #1"));
    assert_ne!(raw.sign(&fields), sign(&fields, None));
}

#[test]
fn test_verify_rejects_absent_and_malformed_claims() {
    let fields = vector_fields();

    assert!(!verify(None, &fields, None));
    assert!(!verify(Some(""), &fields, None));
    assert!(!verify(Some("19896722fa1f52adf855c29662d85f5"), &fields, None));
    assert!(!verify(Some("zz896722fa1f52adf855c29662d85f5e"), &fields, None));
    assert!(verify(Some("19896722FA1F52ADF855C29662D85F5E"), &fields, None));
}

#[test]
fn test_form_body_round_trip_verifies() {
    let body = b"amount=300&item_name=shoes&merchant_id=10038198&merchant_key=8yshtxb2mu1oa\
                 &signature=19896722fa1f52adf855c29662d85f5e";
    let fields = PaymentFieldSet::from_form_body(body).unwrap();

    assert!(verify(fields.get("signature"), &fields, None));
}
