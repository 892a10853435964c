//! Field codecs: the wire encoding/decoding primitives headers are built from
//!
//! All multi-byte integers are big-endian. Decoding a fixed-width codec never
//! fails on a byte pattern of the right width; encoding enforces the field's
//! overflow policy.

use crate::container::ArrayCodec;
use crate::header::Header;
use crate::value::FieldValue;
use bytes::{BufMut, BytesMut};
use layerkit_core::{Error, MacAddr, Result};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

/// What to do when an integer value does not fit its wire width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// Fail the serialize call
    Reject,
    /// Truncate silently to the low bits
    Wrap,
}

/// An externally supplied codec (the ASN.1 collaborator plugs in here)
pub trait ValueCodec: Send + Sync {
    /// Encode one value, appending to `out`
    fn encode(&self, value: &FieldValue, out: &mut BytesMut) -> Result<()>;

    /// Decode one value from the front of `data`, returning it together with
    /// the number of bytes consumed
    fn decode(&self, data: &[u8]) -> Result<(FieldValue, usize)>;
}

/// Wire codec of a single field
#[derive(Clone)]
pub enum Codec {
    /// Unsigned big-endian integer of 1, 2, 4, or 8 bytes
    Uint { width: usize, overflow: Overflow },
    /// 6-byte link-layer address
    Mac,
    /// 4-byte network address
    Ipv4,
    /// 16-byte network address
    Ipv6,
    /// Raw bytes, sized by the field's size hint (remainder by default)
    Bytes,
    /// Text, sized like `Bytes`; must be valid UTF-8 to parse
    Text,
    /// Repeated sub-structures
    Array(ArrayCodec),
    /// Pluggable external codec
    Custom(Arc<dyn ValueCodec>),
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Codec::Uint { width, overflow } => {
                write!(f, "Uint {{ width: {width}, overflow: {overflow:?} }}")
            }
            Codec::Mac => write!(f, "Mac"),
            Codec::Ipv4 => write!(f, "Ipv4"),
            Codec::Ipv6 => write!(f, "Ipv6"),
            Codec::Bytes => write!(f, "Bytes"),
            Codec::Text => write!(f, "Text"),
            Codec::Array(a) => write!(f, "Array({})", a.element_name()),
            Codec::Custom(_) => write!(f, "Custom"),
        }
    }
}

impl Codec {
    /// Wire width for fixed-size codecs; `None` for variable-length ones
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Codec::Uint { width, .. } => Some(*width),
            Codec::Mac => Some(6),
            Codec::Ipv4 => Some(4),
            Codec::Ipv6 => Some(16),
            _ => None,
        }
    }

    pub(crate) fn encode(
        &self,
        field: &'static str,
        value: &FieldValue,
        out: &mut BytesMut,
    ) -> Result<()> {
        match self {
            Codec::Uint { width, overflow } => {
                let v = value.as_uint().ok_or(Error::TypeMismatch {
                    field,
                    expected: "uint",
                    found: value.kind(),
                })?;
                let v = if *width < 8 {
                    let max = (1u64 << (width * 8)) - 1;
                    if v > max {
                        match overflow {
                            Overflow::Reject => {
                                return Err(Error::ValueTooLarge {
                                    field,
                                    width: *width,
                                    value: v,
                                })
                            }
                            Overflow::Wrap => v & max,
                        }
                    } else {
                        v
                    }
                } else {
                    v
                };
                out.put_slice(&v.to_be_bytes()[8 - width..]);
                Ok(())
            }
            Codec::Mac => {
                let m = value.as_mac().ok_or(Error::TypeMismatch {
                    field,
                    expected: "mac",
                    found: value.kind(),
                })?;
                out.put_slice(m.as_bytes());
                Ok(())
            }
            Codec::Ipv4 => {
                let a = value.as_ipv4().ok_or(Error::TypeMismatch {
                    field,
                    expected: "ipv4",
                    found: value.kind(),
                })?;
                out.put_slice(&a.octets());
                Ok(())
            }
            Codec::Ipv6 => {
                let a = value.as_ipv6().ok_or(Error::TypeMismatch {
                    field,
                    expected: "ipv6",
                    found: value.kind(),
                })?;
                out.put_slice(&a.octets());
                Ok(())
            }
            Codec::Bytes => {
                let b = value.as_bytes().ok_or(Error::TypeMismatch {
                    field,
                    expected: "bytes",
                    found: value.kind(),
                })?;
                out.put_slice(b);
                Ok(())
            }
            Codec::Text => {
                let s = value.as_text().ok_or(Error::TypeMismatch {
                    field,
                    expected: "text",
                    found: value.kind(),
                })?;
                out.put_slice(s.as_bytes());
                Ok(())
            }
            Codec::Array(array) => {
                let items = value.as_headers().ok_or(Error::TypeMismatch {
                    field,
                    expected: "headers",
                    found: value.kind(),
                })?;
                array.encode(items, out)
            }
            Codec::Custom(codec) => codec.encode(value, out),
        }
    }

    /// Decode one value from `data` (already clipped to the field's resolved
    /// size limit). Fixed-width codecs may assume the caller verified the
    /// width. Returns the value and the bytes consumed.
    pub(crate) fn decode(
        &self,
        field: &'static str,
        data: &[u8],
        partial: &Header,
    ) -> Result<(FieldValue, usize)> {
        match self {
            Codec::Uint { width, .. } => {
                let mut buf = [0u8; 8];
                buf[8 - width..].copy_from_slice(&data[..*width]);
                Ok((FieldValue::Uint(u64::from_be_bytes(buf)), *width))
            }
            Codec::Mac => {
                let mac = MacAddr::from_slice(&data[..6])
                    .ok_or_else(|| Error::codec(format!("short mac field '{field}'")))?;
                Ok((FieldValue::Mac(mac), 6))
            }
            Codec::Ipv4 => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(&data[..4]);
                Ok((FieldValue::Ipv4(Ipv4Addr::from(octets)), 4))
            }
            Codec::Ipv6 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&data[..16]);
                Ok((FieldValue::Ipv6(Ipv6Addr::from(octets)), 16))
            }
            Codec::Bytes => Ok((FieldValue::Bytes(data.to_vec()), data.len())),
            Codec::Text => {
                let s = std::str::from_utf8(data)
                    .map_err(|_| Error::codec(format!("field '{field}' is not valid UTF-8")))?;
                Ok((FieldValue::Text(s.to_string()), data.len()))
            }
            Codec::Array(array) => array.decode(data, partial),
            Codec::Custom(codec) => codec.decode(data),
        }
    }
}
