//! PayFast signature construction and verification.
//!
//! PayFast authenticates both the outbound payment form and the inbound
//! notification (ITN) with the same scheme: a keyed MD5 over a canonical query
//! string built from the payment fields.
//!
//! # Algorithm
//!
//! 1. Drop fields whose value is empty or absent, and the `signature` field itself
//! 2. Sort the remaining names in ascending byte order
//! 3. Percent-encode each value with URI component rules (space is `%20`), unless
//!    [`EncodingMode::Raw`] is selected
//! 4. Join as `name=value` pairs with `&`
//! 5. Append `&passphrase=<passphrase>` when the merchant has a passphrase
//! 6. Hash the UTF-8 bytes with MD5 and render as lowercase hex
//!
//! # Key Components
//!
//! - [`PaymentFieldSet`]: unordered field map
//! - [`SignatureCodec`]: configured signer/verifier
//! - [`canonicalize`], [`sign`], [`verify`]: one-shot helpers using URI component encoding
//!
//! # Examples
//!
//! ```rust
//! use payfast_signature::signature::{PaymentFieldSet, canonicalize, sign, verify};
//!
//! let fields = PaymentFieldSet::new()
//!     .with_field("merchant_id", "10038198")
//!     .with_field("merchant_key", "8yshtxb2mu1oa")
//!     .with_field("amount", "300")
//!     .with_field("item_name", "shoes");
//!
//! assert_eq!(
//!     canonicalize(&fields),
//!     "amount=300&item_name=shoes&merchant_id=10038198&merchant_key=8yshtxb2mu1oa"
//! );
//!
//! let signature = sign(&fields, None);
//! assert!(verify(Some(&signature), &fields, None));
//! assert!(!verify(Some(&signature), &fields, Some("secret")));
//! ```

pub mod canonical;
pub mod codec;
pub mod fields;

pub use canonical::{EncodingMode, canonicalize_with};
pub use codec::{SignatureCodec, SigningOptions, md5_hex};
pub use fields::PaymentFieldSet;

/// Reserved field carrying the signature. Never part of the signing input.
pub const SIGNATURE_FIELD: &str = "signature";

/// Name under which the passphrase is appended to the signing input.
pub const PASSPHRASE_FIELD: &str = "passphrase";

/// Length of a hex-encoded MD5 signature.
pub const SIGNATURE_HEX_LEN: usize = 32;

/// Builds the canonical query string using URI component encoding.
#[must_use]
pub fn canonicalize(fields: &PaymentFieldSet) -> String {
    canonicalize_with(fields, EncodingMode::UrlEncoded)
}

/// Signs `fields`, appending `passphrase` when it is non-empty.
#[must_use]
pub fn sign(fields: &PaymentFieldSet, passphrase: Option<&str>) -> String {
    codec_for(passphrase).sign(fields)
}

/// Checks `claimed` against the signature recomputed from `fields`.
///
/// Returns `false` on a missing or mismatched claim; never panics on
/// ordinary malformed input.
#[must_use]
pub fn verify(claimed: Option<&str>, fields: &PaymentFieldSet, passphrase: Option<&str>) -> bool {
    codec_for(passphrase).verify(claimed, fields)
}

fn codec_for(passphrase: Option<&str>) -> SignatureCodec {
    let options = passphrase.map_or_else(SigningOptions::default, |p| {
        SigningOptions::default().with_passphrase(p)
    });
    SignatureCodec::new(options)
}
