//! The packet type: an ordered stack of decoded layers
//!
//! A `Packet` owns the outermost header of a body-chained stack. Layer
//! iteration, per-type lookup, and residue access all walk the chain; the
//! innermost raw body is the undissected residue.

use crate::header::{Body, Header};
use layerkit_core::Result;

/// An ordered header stack plus any unconsumed trailing bytes
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    root: Header,
}

impl Packet {
    /// Wrap an already-chained header stack
    pub fn new(root: Header) -> Self {
        Self { root }
    }

    /// Outermost layer
    pub fn root(&self) -> &Header {
        &self.root
    }

    /// Outermost layer, mutable
    pub fn root_mut(&mut self) -> &mut Header {
        &mut self.root
    }

    /// Take the layer chain back out of the packet
    pub fn into_root(self) -> Header {
        self.root
    }

    /// Iterate the layers outermost first
    pub fn layers(&self) -> Layers<'_> {
        Layers {
            next: Some(&self.root),
        }
    }

    /// Number of decoded layers
    pub fn depth(&self) -> usize {
        self.layers().count()
    }

    /// First layer of the given type, if any
    pub fn layer(&self, type_name: &str) -> Option<&Header> {
        self.layers().find(|h| h.type_name() == type_name)
    }

    /// Layer by position, outermost first
    pub fn layer_at(&self, index: usize) -> Option<&Header> {
        self.layers().nth(index)
    }

    /// First layer of the given type, mutable (cross-layer fixups go through
    /// here)
    pub fn layer_mut(&mut self, type_name: &str) -> Option<&mut Header> {
        fn find<'a>(header: &'a mut Header, type_name: &str) -> Option<&'a mut Header> {
            if header.type_name() == type_name {
                return Some(header);
            }
            match header.body_mut() {
                Body::Nested(inner) => find(inner, type_name),
                Body::Raw(_) => None,
            }
        }
        find(&mut self.root, type_name)
    }

    /// Undissected trailing bytes after the innermost decoded layer
    pub fn residue(&self) -> &[u8] {
        let mut current = &self.root;
        loop {
            match current.body() {
                Body::Nested(inner) => current = inner,
                Body::Raw(raw) => return raw,
            }
        }
    }

    /// Serialize the whole stack back to wire bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.root.to_bytes()
    }
}

/// Iterator over a packet's layers, outermost first
pub struct Layers<'a> {
    next: Option<&'a Header>,
}

impl<'a> Iterator for Layers<'a> {
    type Item = &'a Header;

    fn next(&mut self) -> Option<Self::Item> {
        let header = self.next.take()?;
        self.next = match header.body() {
            Body::Nested(inner) => Some(inner),
            Body::Raw(_) => None,
        };
        Some(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDesc;
    use crate::header::HeaderType;
    use std::sync::Arc;

    fn tagged(name: &'static str, tag: u8) -> Header {
        let ty = Arc::new(HeaderType::new(name).field(FieldDesc::uint("tag", 1)));
        let mut hdr = Header::new(&ty);
        hdr.set("tag", tag).unwrap();
        hdr
    }

    fn sample() -> Packet {
        let mut outer = tagged("outer", 1);
        let mut mid = tagged("mid", 2);
        let mut inner = tagged("inner", 3);
        inner.set_payload(vec![0xDE, 0xAD]);
        mid.encapsulate(inner);
        outer.encapsulate(mid);
        Packet::new(outer)
    }

    #[test]
    fn test_layer_iteration_order() {
        let pkt = sample();
        let names: Vec<_> = pkt.layers().map(|h| h.type_name()).collect();
        assert_eq!(names, ["outer", "mid", "inner"]);
        assert_eq!(pkt.depth(), 3);
    }

    #[test]
    fn test_layer_lookup() {
        let pkt = sample();
        assert_eq!(pkt.layer("mid").and_then(|h| h.uint("tag")), Some(2));
        assert!(pkt.layer("missing").is_none());
        assert_eq!(pkt.layer_at(2).map(|h| h.type_name()), Some("inner"));
    }

    #[test]
    fn test_layer_mut_reaches_nested() {
        let mut pkt = sample();
        pkt.layer_mut("inner").unwrap().set("tag", 9u8).unwrap();
        assert_eq!(pkt.layer("inner").and_then(|h| h.uint("tag")), Some(9));
    }

    #[test]
    fn test_into_root_keeps_chain() {
        let root = sample().into_root();
        assert_eq!(root.type_name(), "outer");
        assert_eq!(
            root.body().nested().map(|h| h.type_name()),
            Some("mid")
        );
    }

    #[test]
    fn test_residue_and_serialize() {
        let pkt = sample();
        assert_eq!(pkt.residue(), &[0xDE, 0xAD]);
        assert_eq!(pkt.to_bytes().unwrap(), vec![1, 2, 3, 0xDE, 0xAD]);
    }
}
