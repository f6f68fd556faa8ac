//! Canonical message codec
//!
//! Wallet clients sign `JSON.stringify(data)` through `personal_sign`, so the
//! bytes we verify against must be exactly what a browser produces for the
//! same object:
//!
//! - fields in insertion order, never re-sorted
//! - no whitespace between tokens
//! - numbers in ECMAScript `Number::toString` form (`1` not `1.0`,
//!   `1e+21` not `1e21`)
//! - strings with only `"`, `\`, and control characters escaped
//!
//! Re-ordering keys changes the byte string and makes every real-world
//! signature fail to verify.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::EncodingError;

/// Ordered field -> value mapping of a signed payload
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadData(Map<String, Value>);

impl PayloadData {
    /// Create an empty payload
    pub fn new() -> Self {
        PayloadData(Map::new())
    }

    /// Parse a payload from JSON bytes, keeping field order as written
    pub fn from_json(bytes: &[u8]) -> Result<Self, EncodingError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| EncodingError::InvalidUtf8("<payload>".to_string()))?;
        let value: Value = serde_json::from_str(text).map_err(|_| EncodingError::InvalidJson)?;
        Self::from_value(value)
    }

    /// Wrap an already-parsed JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self, EncodingError> {
        match value {
            Value::Object(map) => Ok(PayloadData(map)),
            _ => Err(EncodingError::NotAnObject),
        }
    }

    /// Append a field. Re-inserting an existing key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Builder-style `insert`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Append a floating point field, rejecting NaN and infinities
    pub fn insert_number(&mut self, key: impl Into<String>, value: f64) -> Result<&mut Self, EncodingError> {
        let key = key.into();
        let number = Number::from_f64(value).ok_or_else(|| EncodingError::NonFiniteNumber(key.clone()))?;
        self.0.insert(key, Value::Number(number));
        Ok(self)
    }

    /// Append a text field from raw bytes, rejecting invalid UTF-8
    pub fn insert_utf8(&mut self, key: impl Into<String>, bytes: &[u8]) -> Result<&mut Self, EncodingError> {
        let key = key.into();
        let text = std::str::from_utf8(bytes).map_err(|_| EncodingError::InvalidUtf8(key.clone()))?;
        self.0.insert(key, Value::String(text.to_string()));
        Ok(self)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Field names in signing order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical bytes of this payload, see [`canonicalize`]
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, EncodingError> {
        canonicalize(self)
    }
}

impl From<Map<String, Value>> for PayloadData {
    fn from(map: Map<String, Value>) -> Self {
        PayloadData(map)
    }
}

/// Serialize a payload to the exact bytes a signing client signed
pub fn canonicalize(data: &PayloadData) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::with_capacity(64);
    write_object(&data.0, &mut out)?;
    Ok(out)
}

fn write_value(value: &Value, field: &str, out: &mut Vec<u8>) -> Result<(), EncodingError> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => write_number(n, field, out)?,
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, field, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => write_object(map, out)?,
    }
    Ok(())
}

fn write_object(map: &Map<String, Value>, out: &mut Vec<u8>) -> Result<(), EncodingError> {
    out.push(b'{');
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        write_string(key, out);
        out.push(b':');
        write_value(value, key, out)?;
    }
    out.push(b'}');
    Ok(())
}

fn write_number(n: &Number, field: &str, out: &mut Vec<u8>) -> Result<(), EncodingError> {
    if let Some(i) = n.as_i64() {
        out.extend_from_slice(i.to_string().as_bytes());
    } else if let Some(u) = n.as_u64() {
        out.extend_from_slice(u.to_string().as_bytes());
    } else {
        let f = n
            .as_f64()
            .filter(|f| f.is_finite())
            .ok_or_else(|| EncodingError::NonFiniteNumber(field.to_string()))?;
        out.extend_from_slice(format_js_number(f).as_bytes());
    }
    Ok(())
}

/// Render a finite double the way ECMAScript `Number::toString` does.
///
/// Rust's `{:e}` formatting already yields the shortest round-tripping
/// digits; only the placement of the decimal point and the exponent
/// syntax differ.
pub fn format_js_number(value: f64) -> String {
    if value == 0.0 {
        // covers -0.0 as well
        return "0".to_string();
    }

    let sci = format!("{:e}", value.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exponent + 1;

    let mut out = String::new();
    if value < 0.0 {
        out.push('-');
    }

    if k <= n && n <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat('0').take((n - k) as usize));
    } else if 0 < n && n <= 21 {
        out.push_str(&digits[..n as usize]);
        out.push('.');
        out.push_str(&digits[n as usize..]);
    } else if -6 < n && n <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat('0').take((-n) as usize));
        out.push_str(&digits);
    } else {
        out.push_str(&digits[..1]);
        if k > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push('e');
        out.push(if n - 1 >= 0 { '+' } else { '-' });
        out.push_str(&(n - 1).abs().to_string());
    }
    out
}

fn write_string(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\u{08}' => out.extend_from_slice(b"\\b"),
            '\u{0c}' => out.extend_from_slice(b"\\f"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}
