//! Repeated sub-structure containers
//!
//! Two shapes exist: a fixed-count array whose element count comes from a
//! sibling counter (or a fixed number), and a length-bounded array that
//! parses elements until a byte budget runs out. Both degrade gracefully on
//! malformed input: whatever parsed is kept, and leftover bytes surface as
//! trailing payload of the enclosing layer instead of failing the parse.

use crate::header::{Header, HeaderType};
use crate::value::FieldValue;
use bytes::BytesMut;
use layerkit_core::Result;
use std::sync::Arc;

/// Where a fixed-count array obtains its element count
#[derive(Debug, Clone, Copy)]
pub enum CountSrc {
    /// Always exactly this many elements
    Fixed(usize),
    /// Read from a named sibling field at parse time
    Field(&'static str),
}

#[derive(Debug, Clone, Copy)]
enum ArrayBound {
    /// Parse up to a resolved element count
    Count(CountSrc),
    /// Parse until the field's byte budget (its size hint) is exhausted
    Budget,
}

/// Codec for a repeated sub-structure field
#[derive(Debug, Clone)]
pub struct ArrayCodec {
    elem: Arc<HeaderType>,
    bound: ArrayBound,
}

impl ArrayCodec {
    /// Array of exactly `count` elements
    pub fn counted(elem: Arc<HeaderType>, count: CountSrc) -> Self {
        Self {
            elem,
            bound: ArrayBound::Count(count),
        }
    }

    /// Array bounded by the owning field's byte budget (attach a
    /// `size_field`/`size_fn` to the field descriptor)
    pub fn bounded(elem: Arc<HeaderType>) -> Self {
        Self {
            elem,
            bound: ArrayBound::Budget,
        }
    }

    /// Name of the element header type
    pub fn element_name(&self) -> &'static str {
        self.elem.name()
    }

    /// Element header type
    pub fn element(&self) -> &Arc<HeaderType> {
        &self.elem
    }

    pub(crate) fn encode(&self, items: &[Header], out: &mut BytesMut) -> Result<()> {
        for item in items {
            item.encode(out)?;
        }
        Ok(())
    }

    /// Parse elements from `data` (already clipped to the byte budget for
    /// bounded arrays). Stops at the resolved count, at the end of input, or
    /// at the first element that fails to parse; consumed bytes cover only
    /// the elements actually kept.
    pub(crate) fn decode(&self, data: &[u8], partial: &Header) -> Result<(FieldValue, usize)> {
        let count = match self.bound {
            ArrayBound::Count(CountSrc::Fixed(n)) => Some(n),
            ArrayBound::Count(CountSrc::Field(name)) => {
                Some(partial.uint(name).unwrap_or(0) as usize)
            }
            ArrayBound::Budget => None,
        };

        let mut items = Vec::new();
        let mut off = 0;
        loop {
            if let Some(n) = count {
                if items.len() >= n {
                    break;
                }
            }
            if off >= data.len() {
                break;
            }
            match Header::parse_prefix(&self.elem, &data[off..]) {
                // Zero-length elements would never exhaust the budget
                Ok((item, used)) if used > 0 => {
                    items.push(item);
                    off += used;
                }
                _ => break,
            }
        }

        Ok((FieldValue::Headers(items), off))
    }
}
