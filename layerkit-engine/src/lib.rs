//! Packet schema and dissection engine for layerkit
//!
//! This crate provides the generic machinery for describing protocol headers
//! declaratively and moving between raw bytes and structured layer stacks:
//!
//! - [`codec`] - fixed-width integers (network byte order), addresses, raw
//!   byte/text fields, and the pluggable external-codec seam
//! - [`bitfield`] - named sub-byte bit-range views over scalar fields
//! - [`field`] / [`header`] - ordered field descriptors with defaults,
//!   presence predicates, and dynamic sizing; generic serialize/parse over a
//!   schema
//! - [`container`] - fixed-count and length-bounded repeated sub-structures
//! - [`registry`] - binding rules, the dissector, and the stack builder
//! - [`packet`] - the ordered layer stack produced by both directions
//! - [`checksum`] - the shared ones'-complement checksum and length fixup kit
//!
//! Concrete protocols are client registrations layered on top (see the
//! `layerkit-protocols` crate); nothing in here knows a specific wire
//! format.
//!
//! # Quick start
//!
//! ```rust
//! use layerkit_engine::{FieldDesc, HeaderType, Options, Registry};
//!
//! let mut reg = Registry::new();
//! reg.register(
//!     HeaderType::new("envelope")
//!         .field(FieldDesc::uint("kind", 1))
//!         .field(FieldDesc::uint("len", 2)),
//! );
//! reg.register(HeaderType::new("ping").field(FieldDesc::uint("token", 4)));
//! reg.bind_value("envelope", "kind", 1, "ping");
//!
//! // Registration done; the registry is read-only from here on.
//! let pkt = reg
//!     .build(&[("envelope", Options::new()), ("ping", Options::new())])
//!     .unwrap();
//! let bytes = pkt.to_bytes().unwrap();
//! let back = reg.dissect(&bytes, "envelope").unwrap();
//! assert_eq!(back.depth(), 2);
//! ```

pub mod bitfield;
pub mod checksum;
pub mod codec;
pub mod container;
pub mod field;
pub mod header;
pub mod packet;
pub mod registry;
pub mod value;

// Re-export commonly used types
pub use bitfield::BitLayout;
pub use codec::{Codec, Overflow, ValueCodec};
pub use container::{ArrayCodec, CountSrc};
pub use field::{FieldDefault, FieldDesc, SizeHint};
pub use header::{Body, Header, HeaderType};
pub use packet::{Layers, Packet};
pub use registry::{BindingRule, Discriminator, Registry};
pub use value::{FieldValue, Options};
