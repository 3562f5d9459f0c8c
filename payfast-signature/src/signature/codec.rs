//! Keyed MD5 signing and verification.

use std::fmt;

use md5::{Digest, Md5};
use subtle::ConstantTimeEq;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::signature::{
    EncodingMode, PASSPHRASE_FIELD, PaymentFieldSet, SIGNATURE_HEX_LEN,
    canonical::canonicalize_with,
};

/// Options controlling how a field set is turned into a signature.
///
/// The passphrase is the merchant's shared secret. An empty passphrase is
/// treated as no passphrase.
#[derive(Clone, Default)]
pub struct SigningOptions {
    /// Shared secret appended to the signing input.
    pub passphrase: Option<Zeroizing<String>>,
    /// Value encoding used for the canonical string.
    pub encoding: EncodingMode,
}

impl SigningOptions {
    /// Sets the passphrase.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(Zeroizing::new(passphrase.into()));
        self
    }

    /// Sets the value encoding.
    #[must_use]
    pub const fn with_encoding(mut self, encoding: EncodingMode) -> Self {
        self.encoding = encoding;
        self
    }

    fn active_passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref().map(String::as_str).filter(|p| !p.is_empty())
    }
}

impl fmt::Debug for SigningOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningOptions")
            .field("passphrase", &self.active_passphrase().map(|_| "[REDACTED]"))
            .field("encoding", &self.encoding)
            .finish()
    }
}

/// Signs and verifies PayFast field sets.
///
/// The codec holds no mutable state and can be shared freely between threads.
///
/// # Examples
///
/// ```
/// use payfast_signature::signature::{PaymentFieldSet, SignatureCodec, SigningOptions};
///
/// let codec = SignatureCodec::new(SigningOptions::default().with_passphrase("jt7NOE43FZPn"));
/// let fields = PaymentFieldSet::new()
///     .with_field("merchant_id", "10000100")
///     .with_field("amount", "100.00")
///     .with_field("item_name", "Test Item");
///
/// let signature = codec.sign(&fields);
/// assert_eq!(signature.len(), 32);
/// assert!(codec.verify(Some(&signature), &fields));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SignatureCodec {
    options: SigningOptions,
}

impl SignatureCodec {
    /// Creates a codec with the given options.
    #[must_use]
    pub const fn new(options: SigningOptions) -> Self {
        Self { options }
    }

    /// Returns the value encoding in use.
    #[must_use]
    pub const fn encoding(&self) -> EncodingMode {
        self.options.encoding
    }

    /// Returns true if a non-empty passphrase is configured.
    #[must_use]
    pub fn has_passphrase(&self) -> bool {
        self.options.active_passphrase().is_some()
    }

    /// Builds the canonical query string for `fields`.
    #[must_use]
    pub fn canonicalize(&self, fields: &PaymentFieldSet) -> String {
        canonicalize_with(fields, self.options.encoding)
    }

    /// Builds the exact string that gets hashed.
    ///
    /// This is the canonical string plus `&passphrase=...` when a passphrase is
    /// set. The suffix is appended even when the canonical string is empty.
    /// The result holds the secret and is wiped on drop.
    #[must_use]
    pub fn signing_input(&self, fields: &PaymentFieldSet) -> Zeroizing<String> {
        let mut input = Zeroizing::new(self.canonicalize(fields));
        if let Some(passphrase) = self.options.active_passphrase() {
            input.push('&');
            input.push_str(PASSPHRASE_FIELD);
            input.push('=');
            input.push_str(&self.options.encoding.encode(passphrase));
        }
        input
    }

    /// Signs a field set.
    ///
    /// Always succeeds. An empty field set signs the empty string, or the bare
    /// passphrase suffix when one is configured.
    #[must_use]
    #[instrument(skip_all, fields(field_count = fields.len(), encoding = ?self.options.encoding))]
    pub fn sign(&self, fields: &PaymentFieldSet) -> String {
        let input = self.signing_input(fields);
        md5_hex(input.as_bytes())
    }

    /// Checks a claimed signature against the one recomputed from `fields`.
    ///
    /// Hex case is ignored. Returns `false` when the claim is missing, is not
    /// 32 hex characters, or does not match.
    #[must_use]
    #[instrument(skip_all, fields(field_count = fields.len()))]
    pub fn verify(&self, claimed: Option<&str>, fields: &PaymentFieldSet) -> bool {
        let Some(claimed) = claimed else {
            debug!("no signature supplied");
            return false;
        };

        if claimed.len() != SIGNATURE_HEX_LEN || !claimed.bytes().all(|b| b.is_ascii_hexdigit()) {
            debug!(claimed_len = claimed.len(), "signature is not 32 hex characters");
            return false;
        }

        let expected = self.sign(fields);
        let claimed = claimed.to_ascii_lowercase();
        let matches = bool::from(expected.as_bytes().ct_eq(claimed.as_bytes()));
        if !matches {
            debug!("signature mismatch");
        }
        matches
    }
}

/// Lowercase hex MD5 of `bytes`.
///
/// # Examples
///
/// ```
/// use payfast_signature::signature::md5_hex;
///
/// assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
/// ```
#[must_use]
pub fn md5_hex(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}
