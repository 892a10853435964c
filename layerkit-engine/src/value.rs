//! Field value storage and caller-supplied option maps

use crate::header::Header;
use layerkit_core::MacAddr;
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};

/// A single decoded or caller-supplied field value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Unsigned integer, held widened; the codec enforces the wire width
    Uint(u64),
    /// Raw byte payload
    Bytes(Vec<u8>),
    /// Text payload
    Text(String),
    /// Link-layer address
    Mac(MacAddr),
    /// IPv4 address
    Ipv4(Ipv4Addr),
    /// IPv6 address
    Ipv6(Ipv6Addr),
    /// Repeated sub-structures (container fields)
    Headers(Vec<Header>),
}

impl FieldValue {
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            FieldValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mac(&self) -> Option<MacAddr> {
        match self {
            FieldValue::Mac(m) => Some(*m),
            _ => None,
        }
    }

    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        match self {
            FieldValue::Ipv4(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_ipv6(&self) -> Option<Ipv6Addr> {
        match self {
            FieldValue::Ipv6(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_headers(&self) -> Option<&[Header]> {
        match self {
            FieldValue::Headers(h) => Some(h),
            _ => None,
        }
    }

    /// Kind name used in type-mismatch diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Uint(_) => "uint",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Text(_) => "text",
            FieldValue::Mac(_) => "mac",
            FieldValue::Ipv4(_) => "ipv4",
            FieldValue::Ipv6(_) => "ipv6",
            FieldValue::Headers(_) => "headers",
        }
    }
}

impl From<u8> for FieldValue {
    fn from(v: u8) -> Self {
        FieldValue::Uint(v as u64)
    }
}

impl From<u16> for FieldValue {
    fn from(v: u16) -> Self {
        FieldValue::Uint(v as u64)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Uint(v as u64)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Uint(v)
    }
}

impl From<usize> for FieldValue {
    fn from(v: usize) -> Self {
        FieldValue::Uint(v as u64)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(b: Vec<u8>) -> Self {
        FieldValue::Bytes(b)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(b: &[u8]) -> Self {
        FieldValue::Bytes(b.to_vec())
    }
}

impl From<MacAddr> for FieldValue {
    fn from(m: MacAddr) -> Self {
        FieldValue::Mac(m)
    }
}

impl From<Ipv4Addr> for FieldValue {
    fn from(a: Ipv4Addr) -> Self {
        FieldValue::Ipv4(a)
    }
}

impl From<Ipv6Addr> for FieldValue {
    fn from(a: Ipv6Addr) -> Self {
        FieldValue::Ipv6(a)
    }
}

impl From<Vec<Header>> for FieldValue {
    fn from(h: Vec<Header>) -> Self {
        FieldValue::Headers(h)
    }
}

/// Caller-supplied field assignments for one layer of a build request
///
/// Anything not set here falls back to the field's registered default.
#[derive(Debug, Clone, Default)]
pub struct Options {
    values: HashMap<String, FieldValue>,
}

impl Options {
    /// Create an empty option set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value
    pub fn set<K: Into<String>, V: Into<FieldValue>>(mut self, key: K, value: V) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    /// Whether the caller supplied this field explicitly
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}
