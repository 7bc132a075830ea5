//! Form submission codec
//!
//! Bodies use `application/x-www-form-urlencoded`: `key=value` pairs joined
//! by `&`, each component percent-encoded, `+` standing for a space.

use serde_json::{Map, Value};
use thiserror::Error;

/// Form decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// A pair without any `=`
    #[error("pair {0:?} has no '=' separator")]
    MissingSeparator(String),

    /// A pair with more than one `=`
    #[error("pair {0:?} has more than one '=' separator")]
    ExtraSeparator(String),

    /// `%` not followed by two hex digits
    #[error("malformed percent escape in {0:?}")]
    InvalidEscape(String),

    /// Decoded bytes are not UTF-8
    #[error("decoded component {0:?} is not valid UTF-8")]
    InvalidUtf8(String),
}

/// An ordered sequence of submitted `(key, value)` pairs.
///
/// Keys are not required to be unique. Converting to a mapping with
/// [`FormSubmission::into_fields`] keeps the last value of a repeated key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSubmission {
    pairs: Vec<(String, String)>,
}

impl FormSubmission {
    /// Create an empty submission
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    /// Submitted pairs in order
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Value of a field; the last occurrence wins
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Encode to a form body
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                out.push('&');
            }
            encode_component(key, &mut out);
            out.push('=');
            encode_component(value, &mut out);
        }
        out
    }

    /// Decode a form body.
    ///
    /// The body is split on `&` and `=` before any unescaping, so encoded
    /// separators inside keys or values survive.
    ///
    /// An empty body is rejected with [`FormError::MissingSeparator`], so the
    /// empty submission does not survive an encode/decode round trip.
    pub fn decode(body: &[u8]) -> Result<Self, FormError> {
        let mut pairs = Vec::new();

        for pair in body.split(|&b| b == b'&') {
            let mut parts = pair.splitn(3, |&b| b == b'=');
            let key = parts.next().unwrap_or_default();
            let value = parts
                .next()
                .ok_or_else(|| FormError::MissingSeparator(lossy(pair)))?;
            if parts.next().is_some() {
                return Err(FormError::ExtraSeparator(lossy(pair)));
            }

            pairs.push((decode_component(key)?, decode_component(value)?));
        }

        Ok(Self { pairs })
    }

    /// Convert to a JSON object, last value wins for repeated keys
    pub fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::with_capacity(self.pairs.len());
        for (key, value) in self.pairs {
            fields.insert(key, Value::String(value));
        }
        fields
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormSubmission {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn encode_component(s: &str, out: &mut String) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    for &b in s.as_bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'*' | b'-' | b'.' | b'_' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => {
                out.push('%');
                out.push(HEX[(b >> 4) as usize] as char);
                out.push(HEX[(b & 0x0f) as usize] as char);
            }
        }
    }
}

fn decode_component(raw: &[u8]) -> Result<String, FormError> {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        match raw[i] {
            b'%' => {
                let hi = raw.get(i + 1).copied().and_then(hex_value);
                let lo = raw.get(i + 2).copied().and_then(hex_value);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => bytes.push(hi << 4 | lo),
                    _ => return Err(FormError::InvalidEscape(lossy(raw))),
                }
                i += 3;
            }
            b'+' => {
                bytes.push(b' ');
                i += 1;
            }
            b => {
                bytes.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8(bytes).map_err(|_| FormError::InvalidUtf8(lossy(raw)))
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
