//! Header schema and instance engine
//!
//! A [`HeaderType`] is an ordered field schema, registered once at startup
//! and immutable afterward. A [`Header`] is one live instance of a type:
//! field value slots plus a body that is either raw trailing bytes or a
//! nested inner header.

use crate::field::{FieldDefault, FieldDesc, SizeHint};
use crate::value::{FieldValue, Options};
use bytes::{BufMut, BytesMut};
use layerkit_core::{Error, MacAddr, Result};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

/// An ordered field schema plus optional validity predicate and serialize
/// override
#[derive(Clone)]
pub struct HeaderType {
    name: &'static str,
    fields: Vec<FieldDesc>,
    validate: Option<fn(&Header) -> bool>,
    serialize_override: Option<fn(&Header, &mut BytesMut) -> Result<()>>,
}

impl fmt::Debug for HeaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderType")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl HeaderType {
    /// Start an empty schema
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: Vec::new(),
            validate: None,
            serialize_override: None,
        }
    }

    /// Append one field; order is fixed here and never changes at runtime
    ///
    /// # Panics
    ///
    /// Panics at registration time on a duplicate field name.
    pub fn field(mut self, desc: FieldDesc) -> Self {
        assert!(
            self.index_of(desc.name()).is_none(),
            "duplicate field '{}' in header type '{}'",
            desc.name(),
            self.name
        );
        self.fields.push(desc);
        self
    }

    /// Attach a post-parse validity predicate; returning false rejects the
    /// layer even though its bytes were consumable
    pub fn validate(mut self, predicate: fn(&Header) -> bool) -> Self {
        self.validate = Some(predicate);
        self
    }

    /// Replace the generic field-by-field serializer for this type
    pub fn serialize_with(mut self, f: fn(&Header, &mut BytesMut) -> Result<()>) -> Self {
        self.serialize_override = Some(f);
        self
    }

    /// Type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Ordered field descriptors
    pub fn fields(&self) -> &[FieldDesc] {
        &self.fields
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }
}

/// Body slot of a header instance: raw trailing bytes or one nested header
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Undissected trailing bytes (possibly empty)
    Raw(Vec<u8>),
    /// A decoded inner layer
    Nested(Box<Header>),
}

impl Body {
    /// Raw bytes, if this body is undissected
    pub fn raw(&self) -> Option<&[u8]> {
        match self {
            Body::Raw(b) => Some(b),
            Body::Nested(_) => None,
        }
    }

    /// Nested header, if this body was dissected
    pub fn nested(&self) -> Option<&Header> {
        match self {
            Body::Raw(_) => None,
            Body::Nested(h) => Some(h),
        }
    }

    /// True for an empty raw body
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Raw(b) if b.is_empty())
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Raw(Vec::new())
    }
}

/// A live instance of a [`HeaderType`]: exclusive field value storage plus a
/// body slot
#[derive(Debug, Clone)]
pub struct Header {
    ty: Arc<HeaderType>,
    values: Vec<Option<FieldValue>>,
    body: Body,
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.ty.name == other.ty.name && self.values == other.values && self.body == other.body
    }
}

impl Header {
    /// Instance with every field unset (parse starts here)
    pub fn empty(ty: &Arc<HeaderType>) -> Self {
        Self {
            ty: Arc::clone(ty),
            values: vec![None; ty.fields.len()],
            body: Body::default(),
        }
    }

    /// Instance populated from defaults, with caller options taking
    /// precedence. Computed defaults run exactly once, here.
    pub fn from_type(ty: &Arc<HeaderType>, opts: &Options) -> Self {
        let values = ty
            .fields
            .iter()
            .map(|desc| {
                if let Some(v) = opts.get(desc.name()) {
                    return Some(v.clone());
                }
                match &desc.default {
                    Some(FieldDefault::Fixed(v)) => Some(v.clone()),
                    Some(FieldDefault::Computed(f)) => Some(f()),
                    None => None,
                }
            })
            .collect();
        Self {
            ty: Arc::clone(ty),
            values,
            body: Body::default(),
        }
    }

    /// Instance with plain defaults
    pub fn new(ty: &Arc<HeaderType>) -> Self {
        Self::from_type(ty, &Options::new())
    }

    /// Name of this instance's header type
    pub fn type_name(&self) -> &'static str {
        self.ty.name
    }

    /// The schema this instance is bound to
    pub fn header_type(&self) -> &Arc<HeaderType> {
        &self.ty
    }

    /// Current value of a field, if set
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        let idx = self.ty.index_of(field)?;
        self.values[idx].as_ref()
    }

    /// Set a field value
    pub fn set<V: Into<FieldValue>>(&mut self, field: &str, value: V) -> Result<()> {
        let idx = self
            .ty
            .index_of(field)
            .ok_or_else(|| Error::UnknownField(format!("{}.{}", self.ty.name, field)))?;
        self.values[idx] = Some(value.into());
        Ok(())
    }

    /// Unset a field value
    pub fn unset(&mut self, field: &str) -> Result<()> {
        let idx = self
            .ty
            .index_of(field)
            .ok_or_else(|| Error::UnknownField(format!("{}.{}", self.ty.name, field)))?;
        self.values[idx] = None;
        Ok(())
    }

    /// Integer value of a field
    pub fn uint(&self, field: &str) -> Option<u64> {
        self.get(field).and_then(FieldValue::as_uint)
    }

    /// Byte value of a field
    pub fn bytes_of(&self, field: &str) -> Option<&[u8]> {
        self.get(field).and_then(FieldValue::as_bytes)
    }

    /// Text value of a field
    pub fn text_of(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    /// MAC value of a field
    pub fn mac(&self, field: &str) -> Option<MacAddr> {
        self.get(field).and_then(FieldValue::as_mac)
    }

    /// IPv4 value of a field
    pub fn ipv4(&self, field: &str) -> Option<Ipv4Addr> {
        self.get(field).and_then(FieldValue::as_ipv4)
    }

    /// IPv6 value of a field
    pub fn ipv6(&self, field: &str) -> Option<Ipv6Addr> {
        self.get(field).and_then(FieldValue::as_ipv6)
    }

    /// Container contents of a field
    pub fn headers_of(&self, field: &str) -> Option<&[Header]> {
        self.get(field).and_then(FieldValue::as_headers)
    }

    /// Read a named bit range of a scalar field
    pub fn bits(&self, field: &str, range: &str) -> Option<u64> {
        let idx = self.ty.index_of(field)?;
        let layout = self.ty.fields[idx].bit_layout()?;
        let scalar = self.values[idx].as_ref().and_then(FieldValue::as_uint)?;
        layout.get(scalar, range)
    }

    /// Write a named bit range of a scalar field, leaving sibling ranges
    /// untouched; an unset scalar starts from zero
    pub fn set_bits(&mut self, field: &str, range: &str, value: u64) -> Result<()> {
        let idx = self
            .ty
            .index_of(field)
            .ok_or_else(|| Error::UnknownField(format!("{}.{}", self.ty.name, field)))?;
        let layout = self.ty.fields[idx]
            .bit_layout()
            .ok_or_else(|| Error::UnknownField(format!("{}.{}:{}", self.ty.name, field, range)))?;
        if !layout.has(range) {
            return Err(Error::UnknownField(format!(
                "{}.{}:{}",
                self.ty.name, field, range
            )));
        }
        let scalar = self.values[idx]
            .as_ref()
            .and_then(FieldValue::as_uint)
            .unwrap_or(0);
        self.values[idx] = Some(FieldValue::Uint(layout.set(scalar, range, value)));
        Ok(())
    }

    /// Read a 1-bit range as a flag
    pub fn flag(&self, field: &str, range: &str) -> Option<bool> {
        self.bits(field, range).map(|v| v != 0)
    }

    /// Write a 1-bit range as a flag
    pub fn set_flag(&mut self, field: &str, range: &str, on: bool) -> Result<()> {
        self.set_bits(field, range, on as u64)
    }

    /// Body slot
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Mutable body slot
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Replace the body slot
    pub fn set_body(&mut self, body: Body) {
        self.body = body;
    }

    /// Replace the body with raw payload bytes
    pub fn set_payload(&mut self, data: Vec<u8>) {
        self.body = Body::Raw(data);
    }

    /// Wrap an inner header into the body slot
    pub fn encapsulate(&mut self, inner: Header) {
        self.body = Body::Nested(Box::new(inner));
    }

    fn is_present(&self, desc: &FieldDesc) -> bool {
        match desc.presence {
            Some(predicate) => predicate(self),
            None => true,
        }
    }

    /// Serialize this header's own fields (no body). Absent fields
    /// contribute zero bytes; a present field with no value is a
    /// [`Error::MissingValue`].
    pub fn encode_fields(&self) -> Result<Vec<u8>> {
        let mut out = BytesMut::new();
        if let Some(serialize) = self.ty.serialize_override {
            serialize(self, &mut out)?;
            return Ok(out.to_vec());
        }
        for (idx, desc) in self.ty.fields.iter().enumerate() {
            if !self.is_present(desc) {
                continue;
            }
            match &self.values[idx] {
                Some(value) => desc.codec().encode(desc.name(), value, &mut out)?,
                None => {
                    return Err(Error::MissingValue {
                        layer: self.ty.name,
                        field: desc.name(),
                    })
                }
            }
        }
        Ok(out.to_vec())
    }

    /// Serialize fields plus the chained body, appending to `out`
    pub fn encode(&self, out: &mut BytesMut) -> Result<()> {
        out.put_slice(&self.encode_fields()?);
        match &self.body {
            Body::Raw(raw) => out.put_slice(raw),
            Body::Nested(inner) => inner.encode(out)?,
        }
        Ok(())
    }

    /// Serialize fields plus the chained body
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = BytesMut::new();
        self.encode(&mut out)?;
        Ok(out.to_vec())
    }

    /// Encoded size of this header's own fields
    pub fn header_len(&self) -> Result<usize> {
        Ok(self.encode_fields()?.len())
    }

    /// Encoded size of this header plus everything nested inside it
    pub fn encoded_len(&self) -> Result<usize> {
        Ok(self.to_bytes()?.len())
    }

    /// Parse one layer: consume descriptors left to right, leave the
    /// remainder as a raw body, then run the type's validity predicate
    pub fn parse(ty: &Arc<HeaderType>, data: &[u8]) -> Result<Header> {
        let (mut header, used) = Self::parse_prefix(ty, data)?;
        header.body = Body::Raw(data[used..].to_vec());
        Ok(header)
    }

    /// Parse the fields of one layer without claiming the remainder,
    /// returning the bytes consumed. Containers parse their elements through
    /// this.
    pub(crate) fn parse_prefix(ty: &Arc<HeaderType>, data: &[u8]) -> Result<(Header, usize)> {
        let mut header = Self::empty(ty);
        let mut off = 0;

        for idx in 0..ty.fields.len() {
            let desc = &ty.fields[idx];
            if !header.is_present(desc) {
                continue;
            }
            let rest = &data[off..];
            let limit = match desc.size {
                SizeHint::Codec | SizeHint::Remainder => None,
                SizeHint::Field(name) => Some(header.uint(name).unwrap_or(0) as usize),
                SizeHint::Func(f) => Some(f(&header)),
            };
            let slice = match limit {
                Some(limit) => &rest[..limit.min(rest.len())],
                None => rest,
            };
            if let Some(width) = desc.codec().fixed_width() {
                if slice.len() < width {
                    return Err(Error::Truncated {
                        layer: ty.name,
                        field: desc.name(),
                        needed: width,
                        available: slice.len(),
                    });
                }
            }
            let (value, used) = desc.codec().decode(desc.name(), slice, &header)?;
            header.values[idx] = Some(value);
            off += used;
        }

        if let Some(validate) = ty.validate {
            if !validate(&header) {
                return Err(Error::LayerInvalid(ty.name));
            }
        }
        Ok((header, off))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ArrayCodec, CountSrc};
    use crate::field::FieldDesc;

    fn point_type() -> Arc<HeaderType> {
        Arc::new(
            HeaderType::new("point")
                .field(FieldDesc::uint("x", 2))
                .field(FieldDesc::uint("y", 2)),
        )
    }

    #[test]
    fn test_defaults_and_options() {
        let ty = point_type();
        let hdr = Header::new(&ty);
        assert_eq!(hdr.uint("x"), Some(0));

        let hdr = Header::from_type(&ty, &Options::new().set("y", 7u16));
        assert_eq!(hdr.uint("x"), Some(0));
        assert_eq!(hdr.uint("y"), Some(7));
    }

    #[test]
    fn test_computed_default_runs_once() {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT: AtomicU64 = AtomicU64::new(1);
        fn ticket() -> FieldValue {
            FieldValue::Uint(NEXT.fetch_add(1, Ordering::SeqCst))
        }

        let ty = Arc::new(HeaderType::new("t").field(FieldDesc::uint("id", 2).default_fn(ticket)));
        let a = Header::new(&ty);
        let first = a.uint("id").unwrap();
        // Re-reads do not re-evaluate
        assert_eq!(a.uint("id"), Some(first));
        let b = Header::new(&ty);
        assert_eq!(b.uint("id"), Some(first + 1));
    }

    #[test]
    fn test_serialize_parse_roundtrip() {
        let ty = point_type();
        let mut hdr = Header::new(&ty);
        hdr.set("x", 0x0102u16).unwrap();
        hdr.set("y", 0x0304u16).unwrap();
        hdr.set_payload(vec![0xAA, 0xBB]);

        let bytes = hdr.to_bytes().unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4, 0xAA, 0xBB]);

        let parsed = Header::parse(&ty, &bytes).unwrap();
        assert_eq!(parsed.uint("x"), Some(0x0102));
        assert_eq!(parsed.uint("y"), Some(0x0304));
        assert_eq!(parsed.body().raw(), Some(&[0xAA, 0xBB][..]));
        assert_eq!(parsed.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_truncated_diagnosis() {
        let ty = point_type();
        let err = Header::parse(&ty, &[1, 2, 3]).unwrap_err();
        match err {
            Error::Truncated {
                layer,
                field,
                needed,
                available,
            } => {
                assert_eq!(layer, "point");
                assert_eq!(field, "y");
                assert_eq!(needed, 2);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_presence_predicate() {
        // length byte, then an extension present only when length > 0
        let ty = Arc::new(
            HeaderType::new("opt")
                .field(FieldDesc::uint("len", 1))
                .field(
                    FieldDesc::bytes("ext")
                        .when(|h| h.uint("len").unwrap_or(0) > 0)
                        .size_field("len"),
                ),
        );

        let parsed = Header::parse(&ty, &[0, 0xFF]).unwrap();
        assert_eq!(parsed.get("ext"), None);
        assert_eq!(parsed.body().raw(), Some(&[0xFF][..]));

        let parsed = Header::parse(&ty, &[2, 0xAA, 0xBB, 0xCC]).unwrap();
        assert_eq!(parsed.bytes_of("ext"), Some(&[0xAA, 0xBB][..]));
        assert_eq!(parsed.body().raw(), Some(&[0xCC][..]));

        // Absent fields contribute zero bytes when serializing
        let mut hdr = Header::new(&ty);
        hdr.set("len", 0u8).unwrap();
        assert_eq!(hdr.encode_fields().unwrap(), vec![0]);
    }

    #[test]
    fn test_unset_clears_value() {
        let ty = point_type();
        let mut hdr = Header::new(&ty);
        hdr.unset("y").unwrap();
        assert_eq!(hdr.get("y"), None);
        // A present field with no value refuses to serialize
        assert!(hdr.encode_fields().unwrap_err().is_format());
        assert!(hdr.unset("z").is_err());
    }

    #[test]
    fn test_missing_value_is_format_error() {
        let ty = Arc::new(HeaderType::new("msg").field(FieldDesc::text("content")));
        let hdr = Header::new(&ty);
        let err = hdr.encode_fields().unwrap_err();
        assert!(err.is_format());
        assert!(matches!(
            err,
            Error::MissingValue {
                layer: "msg",
                field: "content"
            }
        ));
    }

    #[test]
    fn test_validity_predicate_rejects() {
        let ty = Arc::new(
            HeaderType::new("vers")
                .field(FieldDesc::uint("version", 1))
                .validate(|h| h.uint("version") == Some(2)),
        );
        assert!(Header::parse(&ty, &[2]).is_ok());
        let err = Header::parse(&ty, &[9]).unwrap_err();
        assert!(matches!(err, Error::LayerInvalid("vers")));
        assert!(err.is_parse());
    }

    #[test]
    fn test_bit_ranges_via_header() {
        use crate::bitfield::BitLayout;
        let ty = Arc::new(
            HeaderType::new("ip").field(
                FieldDesc::uint("verihl", 1)
                    .default(0x45u8)
                    .bits(BitLayout::new(8, &[("version", 4), ("ihl", 4)])),
            ),
        );
        let mut hdr = Header::new(&ty);
        assert_eq!(hdr.bits("verihl", "version"), Some(4));
        hdr.set_bits("verihl", "ihl", 6).unwrap();
        assert_eq!(hdr.bits("verihl", "version"), Some(4));
        assert_eq!(hdr.bits("verihl", "ihl"), Some(6));
        assert_eq!(hdr.uint("verihl"), Some(0x46));
    }

    #[test]
    fn test_single_bit_flags() {
        use crate::bitfield::BitLayout;
        let ty = Arc::new(
            HeaderType::new("ctl").field(
                FieldDesc::uint("bits", 1)
                    .bits(BitLayout::new(8, &[("urgent", 1), ("seqno", 7)])),
            ),
        );
        let mut hdr = Header::new(&ty);
        assert_eq!(hdr.flag("bits", "urgent"), Some(false));
        hdr.set_flag("bits", "urgent", true).unwrap();
        hdr.set_bits("bits", "seqno", 5).unwrap();
        assert_eq!(hdr.flag("bits", "urgent"), Some(true));
        assert_eq!(hdr.uint("bits"), Some(0x85));
        hdr.set_flag("bits", "urgent", false).unwrap();
        assert_eq!(hdr.uint("bits"), Some(0x05));
    }

    #[test]
    fn test_serialize_override() {
        // A type that always emits its tag twice
        fn doubled(h: &Header, out: &mut BytesMut) -> Result<()> {
            let tag = h.uint("tag").ok_or(Error::MissingValue {
                layer: "twice",
                field: "tag",
            })? as u8;
            out.put_u8(tag);
            out.put_u8(tag);
            Ok(())
        }
        let ty = Arc::new(
            HeaderType::new("twice")
                .field(FieldDesc::uint("tag", 1))
                .serialize_with(doubled),
        );
        let mut hdr = Header::new(&ty);
        hdr.set("tag", 0x5Au8).unwrap();
        assert_eq!(hdr.encode_fields().unwrap(), vec![0x5A, 0x5A]);
    }

    #[test]
    fn test_external_codec_inside_schema() {
        use crate::codec::ValueCodec;

        // Length-prefixed blob standing in for an external ASN.1-style codec
        struct LenPrefixed;

        impl ValueCodec for LenPrefixed {
            fn encode(&self, value: &FieldValue, out: &mut BytesMut) -> Result<()> {
                let b = value
                    .as_bytes()
                    .ok_or_else(|| Error::codec("blob wants bytes"))?;
                out.put_u8(b.len() as u8);
                out.put_slice(b);
                Ok(())
            }

            fn decode(&self, data: &[u8]) -> Result<(FieldValue, usize)> {
                let len = *data.first().ok_or_else(|| Error::codec("empty blob"))? as usize;
                let body = data
                    .get(1..1 + len)
                    .ok_or_else(|| Error::codec("short blob"))?;
                Ok((FieldValue::Bytes(body.to_vec()), 1 + len))
            }
        }

        let ty = Arc::new(
            HeaderType::new("wrapped")
                .field(FieldDesc::uint("head", 1))
                .field(FieldDesc::custom("blob", Arc::new(LenPrefixed)))
                .field(FieldDesc::uint("tail", 1)),
        );

        let mut hdr = Header::new(&ty);
        hdr.set("head", 7u8).unwrap();
        hdr.set("blob", vec![1u8, 2, 3]).unwrap();
        hdr.set("tail", 9u8).unwrap();
        let bytes = hdr.encode_fields().unwrap();
        assert_eq!(bytes, vec![7, 3, 1, 2, 3, 9]);

        // The external field reports its own consumed length, so the fixed
        // field after it lands in the right place
        let parsed = Header::parse(&ty, &bytes).unwrap();
        assert_eq!(parsed.bytes_of("blob"), Some(&[1, 2, 3][..]));
        assert_eq!(parsed.uint("tail"), Some(9));
        assert_eq!(parsed.to_bytes().unwrap(), bytes);

        // Short input at the external field is an error, not a panic
        assert!(Header::parse(&ty, &[7]).is_err());
        assert!(Header::parse(&ty, &[7, 3, 1]).is_err());
    }

    #[test]
    fn test_counted_array_tolerance() {
        // Declared count says 3 elements but only one full element fits:
        // the container trims and the leftovers surface as body
        let elem = point_type();
        let ty = Arc::new(
            HeaderType::new("list")
                .field(FieldDesc::uint("count", 1))
                .field(FieldDesc::array(
                    "items",
                    ArrayCodec::counted(elem, CountSrc::Field("count")),
                )),
        );

        let data = [3u8, 0, 1, 0, 2, 0xEE];
        let parsed = Header::parse(&ty, &data).unwrap();
        let items = parsed.headers_of("items").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].uint("x"), Some(1));
        assert_eq!(parsed.body().raw(), Some(&[0xEE][..]));
        // Round-trip is preserved even for the trimmed shape
        assert_eq!(parsed.to_bytes().unwrap(), data.to_vec());
    }

    #[test]
    fn test_bounded_array() {
        let elem = point_type();
        let ty = Arc::new(
            HeaderType::new("list")
                .field(FieldDesc::uint("len", 1))
                .field(
                    FieldDesc::array("items", ArrayCodec::bounded(elem))
                        .size_field("len"),
                ),
        );

        // Budget of 8 bytes = two 4-byte elements; trailing byte is body
        let data = [8u8, 0, 1, 0, 2, 0, 3, 0, 4, 0x77];
        let parsed = Header::parse(&ty, &data).unwrap();
        let items = parsed.headers_of("items").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].uint("y"), Some(4));
        assert_eq!(parsed.body().raw(), Some(&[0x77][..]));
        assert_eq!(parsed.to_bytes().unwrap(), data.to_vec());
    }

    #[test]
    fn test_nested_body_encode() {
        let ty = point_type();
        let mut inner = Header::new(&ty);
        inner.set("x", 9u16).unwrap();
        inner.set("y", 10u16).unwrap();
        let mut outer = Header::new(&ty);
        outer.set("x", 1u16).unwrap();
        outer.set("y", 2u16).unwrap();
        outer.encapsulate(inner);

        assert_eq!(
            outer.to_bytes().unwrap(),
            vec![0, 1, 0, 2, 0, 9, 0, 10]
        );
        assert_eq!(outer.header_len().unwrap(), 4);
        assert_eq!(outer.encoded_len().unwrap(), 8);
    }
}
