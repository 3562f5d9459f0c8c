//! Payment field sets.
//!
//! A [`PaymentFieldSet`] is the unordered name/value map a PayFast payment
//! request or notification carries. Values are optional: `None` stands for a
//! field that was sent as `null` or never set, and is skipped during
//! canonicalization exactly like an empty string.

use std::collections::{HashMap, hash_map};

use percent_encoding::percent_decode;
use serde::{Deserialize, Serialize};

use crate::error::{PayfastError, Result};

/// Unordered map of gateway field names to values.
///
/// Keys are case-sensitive. Insertion order is not preserved and has no
/// effect on canonicalization.
///
/// # Examples
///
/// ```
/// use payfast_signature::signature::PaymentFieldSet;
///
/// let fields = PaymentFieldSet::new()
///     .with_field("merchant_id", "10000100")
///     .with_field("amount", "100.00");
///
/// assert_eq!(fields.get("amount"), Some("100.00"));
/// assert_eq!(fields.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentFieldSet {
    fields: HashMap<String, Option<String>>,
}

impl PaymentFieldSet {
    /// Creates an empty field set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, returning the updated set.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces a field value.
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), Some(value.into()));
    }

    /// Inserts a field whose value may be absent.
    ///
    /// An absent value is kept in the set but never signed.
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn insert_optional(&mut self, name: impl Into<String>, value: Option<String>) {
        self.fields.insert(name.into(), value);
    }

    /// Returns the value of a field, or `None` if it is missing or absent.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Option::as_deref)
    }

    /// Returns true if the set has an entry for `name`, absent or not.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Removes a field and returns its value if it had one.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name).flatten()
    }

    /// Number of entries, including absent ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the set has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over all entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value.as_deref()))
    }

    /// Parses an `application/x-www-form-urlencoded` body.
    ///
    /// `+` decodes to a space and percent escapes must form valid UTF-8.
    /// Pairs without `=` become empty values. When a name repeats, the last
    /// occurrence wins.
    ///
    /// # Errors
    ///
    /// Returns [`PayfastError::MalformedInput`] if the body or any decoded
    /// name or value is not valid UTF-8.
    ///
    /// # Examples
    ///
    /// ```
    /// use payfast_signature::signature::PaymentFieldSet;
    ///
    /// # fn example() -> payfast_signature::Result<()> {
    /// let fields = PaymentFieldSet::from_form_body(b"item_name=Order+%231&amount=10.00")?;
    /// assert_eq!(fields.get("item_name"), Some("Order #1"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_form_body(body: &[u8]) -> Result<Self> {
        let body = std::str::from_utf8(body)
            .map_err(|e| PayfastError::MalformedInput(format!("body is not UTF-8: {e}")))?;

        let mut fields = Self::new();
        for pair in body.split('&').filter(|pair| !pair.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            fields.insert(decode_form_component(name)?, decode_form_component(value)?);
        }
        Ok(fields)
    }
}

/// Decodes one form component, mapping `+` to space before unescaping.
fn decode_form_component(component: &str) -> Result<String> {
    let spaced = component.replace('+', " ");
    percent_decode(spaced.as_bytes())
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| {
            PayfastError::MalformedInput(format!("component '{component}' is not UTF-8: {e}"))
        })
}

impl<K, V> FromIterator<(K, V)> for PaymentFieldSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::new();
        fields.extend(iter);
        fields
    }
}

impl<K, V> Extend<(K, V)> for PaymentFieldSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

impl IntoIterator for PaymentFieldSet {
    type Item = (String, Option<String>);
    type IntoIter = hash_map::IntoIter<String, Option<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_lookup() {
        let fields = PaymentFieldSet::new().with_field("a", "1").with_field("b", "2");
        assert_eq!(fields.get("a"), Some("1"));
        assert_eq!(fields.get("missing"), None);
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_absent_value_is_present_but_unreadable() {
        let mut fields = PaymentFieldSet::new();
        fields.insert_optional("custom_str1", None);
        assert!(fields.contains("custom_str1"));
        assert_eq!(fields.get("custom_str1"), None);
        assert_eq!(fields.remove("custom_str1"), None);
        assert!(fields.is_empty());
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let fields = PaymentFieldSet::new().with_field("Amount", "1").with_field("amount", "2");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("Amount"), Some("1"));
    }

    #[test]
    fn test_from_iterator() {
        let fields: PaymentFieldSet = [("merchant_id", "1"), ("amount", "5.00")].into_iter().collect();
        assert_eq!(fields.get("merchant_id"), Some("1"));
    }

    #[test]
    fn test_form_body_decoding() {
        let fields =
            PaymentFieldSet::from_form_body(b"item_name=Order+%231&email=a%40b.com&flag").unwrap();
        assert_eq!(fields.get("item_name"), Some("Order #1"));
        assert_eq!(fields.get("email"), Some("a@b.com"));
        assert_eq!(fields.get("flag"), Some(""));
    }

    #[test]
    fn test_form_body_last_duplicate_wins() {
        let fields = PaymentFieldSet::from_form_body(b"a=1&a=2").unwrap();
        assert_eq!(fields.get("a"), Some("2"));
    }

    #[test]
    fn test_form_body_skips_empty_pairs() {
        let fields = PaymentFieldSet::from_form_body(b"&&a=1&").unwrap();
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_form_body_rejects_invalid_utf8_escape() {
        let result = PaymentFieldSet::from_form_body(b"item_name=%FF%FE");
        assert!(matches!(result, Err(PayfastError::MalformedInput(_))));
    }

    #[test]
    fn test_form_body_rejects_invalid_utf8_bytes() {
        let result = PaymentFieldSet::from_form_body(&[b'a', b'=', 0xC3, 0x28]);
        assert!(matches!(result, Err(PayfastError::MalformedInput(_))));
    }

    #[test]
    fn test_json_accepts_null_values() {
        let fields: PaymentFieldSet =
            serde_json::from_str(r#"{"amount": "10.00", "custom_str1": null}"#).unwrap();
        assert_eq!(fields.get("amount"), Some("10.00"));
        assert!(fields.contains("custom_str1"));
        assert_eq!(fields.get("custom_str1"), None);
    }
}
