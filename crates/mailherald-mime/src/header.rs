//! MIME header handling for outgoing messages.

use crate::encoding::encode_rfc2047;
use std::fmt;

/// Collection of email headers, preserving insertion order.
///
/// Outgoing messages are friendlier to spam filters when headers appear
/// in a stable, conventional order, so unlike a parser-side header map
/// this collection keeps the order headers were set in.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    headers: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header value, replacing any existing value with the same name.
    ///
    /// Names are compared case-insensitively; the name as given is kept
    /// for output.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let lower = name.to_lowercase();
        self.headers.retain(|(n, _)| n.to_lowercase() != lower);
        self.headers.push((name, value));
    }

    /// Gets the value for a header (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        let lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| n.to_lowercase() == lower)
            .map(|(_, v)| v.as_str())
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Sets a header, RFC 2047-encoding the value when it contains
    /// non-ASCII characters (used for Subject).
    pub fn set_encoded(&mut self, name: impl Into<String>, value: &str) {
        self.set(name, encode_rfc2047(value, "utf-8"));
    }

    /// Returns true if no headers are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut headers = Headers::new();
        headers.set("From", "sender@example.com");
        headers.set("To", "recipient@example.com");

        assert_eq!(headers.get("from"), Some("sender@example.com"));
        assert_eq!(headers.get("TO"), Some("recipient@example.com"));
        assert_eq!(headers.get("subject"), None);
    }

    #[test]
    fn test_set_replaces() {
        let mut headers = Headers::new();
        headers.set("Subject", "First");
        headers.set("subject", "Second");

        assert_eq!(headers.get("Subject"), Some("Second"));
        assert_eq!(headers.iter().count(), 1);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut headers = Headers::new();
        headers.set("From", "a");
        headers.set("To", "b");
        headers.set("Subject", "c");

        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["From", "To", "Subject"]);
    }

    #[test]
    fn test_display_crlf() {
        let mut headers = Headers::new();
        headers.set("From", "sender@example.com");

        assert_eq!(headers.to_string(), "From: sender@example.com\r\n");
    }

    #[test]
    fn test_set_encoded() {
        let mut headers = Headers::new();
        headers.set_encoded("Subject", "Héllo");

        assert!(headers.get("Subject").unwrap().starts_with("=?utf-8?B?"));
    }
}
