//! Field descriptors: the declarative building blocks of a header schema

use crate::bitfield::BitLayout;
use crate::codec::{Codec, Overflow, ValueCodec};
use crate::container::ArrayCodec;
use crate::header::Header;
use crate::value::FieldValue;
use std::fmt;
use std::sync::Arc;

/// How a field obtains a value when the caller does not supply one
#[derive(Clone)]
pub enum FieldDefault {
    /// The same value for every instance
    Fixed(FieldValue),
    /// Computed once per instance, at instantiation time (never re-evaluated)
    Computed(fn() -> FieldValue),
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldDefault::Fixed(v) => write!(f, "Fixed({v:?})"),
            FieldDefault::Computed(_) => write!(f, "Computed"),
        }
    }
}

/// How many bytes a variable-length field may consume at parse time
#[derive(Clone, Copy)]
pub enum SizeHint {
    /// The codec's own fixed width
    Codec,
    /// Everything left in the buffer
    Remainder,
    /// Byte count read from a named sibling field
    Field(&'static str),
    /// Byte count computed from already-parsed siblings
    Func(fn(&Header) -> usize),
}

impl fmt::Debug for SizeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeHint::Codec => write!(f, "Codec"),
            SizeHint::Remainder => write!(f, "Remainder"),
            SizeHint::Field(name) => write!(f, "Field({name})"),
            SizeHint::Func(_) => write!(f, "Func"),
        }
    }
}

/// One field of a header type: codec, default, presence, sizing, bit view.
/// Immutable once the owning type is registered.
#[derive(Clone)]
pub struct FieldDesc {
    pub(crate) name: &'static str,
    pub(crate) codec: Codec,
    pub(crate) default: Option<FieldDefault>,
    pub(crate) presence: Option<fn(&Header) -> bool>,
    pub(crate) size: SizeHint,
    pub(crate) bits: Option<BitLayout>,
}

impl fmt::Debug for FieldDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDesc")
            .field("name", &self.name)
            .field("codec", &self.codec)
            .field("default", &self.default)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl FieldDesc {
    fn with_codec(name: &'static str, codec: Codec, default: Option<FieldDefault>) -> Self {
        Self {
            name,
            codec,
            default,
            presence: None,
            size: SizeHint::Codec,
            bits: None,
        }
    }

    /// Unsigned big-endian integer of `width` bytes (1, 2, 4, or 8),
    /// defaulting to zero; out-of-range values reject at encode time unless
    /// [`wrapping`](Self::wrapping) is applied
    pub fn uint(name: &'static str, width: usize) -> Self {
        assert!(
            matches!(width, 1 | 2 | 4 | 8),
            "unsupported integer width {width} for field '{name}'"
        );
        Self::with_codec(
            name,
            Codec::Uint {
                width,
                overflow: Overflow::Reject,
            },
            Some(FieldDefault::Fixed(FieldValue::Uint(0))),
        )
    }

    /// 6-byte link-layer address, defaulting to all-zero
    pub fn mac(name: &'static str) -> Self {
        Self::with_codec(
            name,
            Codec::Mac,
            Some(FieldDefault::Fixed(FieldValue::Mac(
                layerkit_core::MacAddr::zero(),
            ))),
        )
    }

    /// 4-byte network address, defaulting to unspecified
    pub fn ipv4(name: &'static str) -> Self {
        Self::with_codec(
            name,
            Codec::Ipv4,
            Some(FieldDefault::Fixed(FieldValue::Ipv4(
                std::net::Ipv4Addr::UNSPECIFIED,
            ))),
        )
    }

    /// 16-byte network address, defaulting to unspecified
    pub fn ipv6(name: &'static str) -> Self {
        Self::with_codec(
            name,
            Codec::Ipv6,
            Some(FieldDefault::Fixed(FieldValue::Ipv6(
                std::net::Ipv6Addr::UNSPECIFIED,
            ))),
        )
    }

    /// Raw byte field consuming the remainder unless sized, defaulting to
    /// empty
    pub fn bytes(name: &'static str) -> Self {
        let mut desc = Self::with_codec(
            name,
            Codec::Bytes,
            Some(FieldDefault::Fixed(FieldValue::Bytes(Vec::new()))),
        );
        desc.size = SizeHint::Remainder;
        desc
    }

    /// Text field consuming the remainder unless sized. No default: building
    /// a layer around one without supplying content is a format error.
    pub fn text(name: &'static str) -> Self {
        let mut desc = Self::with_codec(name, Codec::Text, None);
        desc.size = SizeHint::Remainder;
        desc
    }

    /// Repeated sub-structure container, defaulting to empty
    pub fn array(name: &'static str, array: ArrayCodec) -> Self {
        Self::with_codec(
            name,
            Codec::Array(array),
            Some(FieldDefault::Fixed(FieldValue::Headers(Vec::new()))),
        )
    }

    /// Field backed by an external codec (e.g. an ASN.1 library). No default.
    pub fn custom(name: &'static str, codec: Arc<dyn ValueCodec>) -> Self {
        Self::with_codec(name, Codec::Custom(codec), None)
    }

    /// Replace the default with a fixed value
    pub fn default<V: Into<FieldValue>>(mut self, value: V) -> Self {
        self.default = Some(FieldDefault::Fixed(value.into()));
        self
    }

    /// Replace the default with a per-instance computation
    pub fn default_fn(mut self, f: fn() -> FieldValue) -> Self {
        self.default = Some(FieldDefault::Computed(f));
        self
    }

    /// Drop the default entirely; serializing without a value becomes an
    /// error
    pub fn required(mut self) -> Self {
        self.default = None;
        self
    }

    /// Presence predicate over already-resolved siblings; an absent field
    /// contributes zero bytes in both directions
    pub fn when(mut self, predicate: fn(&Header) -> bool) -> Self {
        self.presence = Some(predicate);
        self
    }

    /// Size the field from a named sibling counter at parse time
    pub fn size_field(mut self, field: &'static str) -> Self {
        self.size = SizeHint::Field(field);
        self
    }

    /// Size the field from already-parsed siblings at parse time
    pub fn size_fn(mut self, f: fn(&Header) -> usize) -> Self {
        self.size = SizeHint::Func(f);
        self
    }

    /// Attach a named bit-range view; the layout must tile the scalar's wire
    /// width exactly
    pub fn bits(mut self, layout: BitLayout) -> Self {
        if let Some(width) = self.codec.fixed_width() {
            assert!(
                layout.width_total() == (width * 8) as u32,
                "bit layout does not tile field '{}'",
                self.name
            );
        }
        self.bits = Some(layout);
        self
    }

    /// Switch an integer field to silent truncation on overflow
    pub fn wrapping(mut self) -> Self {
        if let Codec::Uint { width, .. } = self.codec {
            self.codec = Codec::Uint {
                width,
                overflow: Overflow::Wrap,
            };
        }
        self
    }

    /// Field name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wire codec
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Bit layout, if one is attached
    pub fn bit_layout(&self) -> Option<&BitLayout> {
        self.bits.as_ref()
    }
}
