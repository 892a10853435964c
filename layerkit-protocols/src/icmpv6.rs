//! ICMPv6 layer (RFC 4443)
//!
//! Only the common 4-byte header lives here; typed message bodies such as
//! the MLDv2 report nest inside it via their own binding rules.

use crate::{ipv4, ipv6, pseudo_sum_for};
use layerkit_engine::checksum;
use layerkit_engine::{FieldDesc, Header, HeaderType, Registry};
use layerkit_core::Result;

pub const NAME: &str = "icmpv6";

pub const TYPE_ECHO_REQUEST: u64 = 128;
pub const TYPE_ECHO_REPLY: u64 = 129;
pub const TYPE_MLDV2_REPORT: u64 = 143;

pub fn header_type() -> HeaderType {
    HeaderType::new(NAME)
        .field(FieldDesc::uint("type", 1).default(TYPE_ECHO_REQUEST as u8))
        .field(FieldDesc::uint("code", 1))
        .field(FieldDesc::uint("chksum", 2))
}

pub fn register(reg: &mut Registry) {
    reg.register(header_type());
    reg.bind_value(ipv6::NAME, "nh", ipv4::PROTO_ICMPV6 as u64, NAME);
    reg.bind_value(ipv4::NAME, "proto", ipv4::PROTO_ICMPV6 as u64, NAME);
}

/// Recompute the checksum over the pseudo-header and the whole message,
/// header and body. `enclosing` is the network layer the message sits
/// under.
pub fn fix_checksum(icmp: &mut Header, enclosing: &Header) -> Result<()> {
    icmp.set("chksum", 0u16)?;
    let message = icmp.to_bytes()?;
    let pseudo = pseudo_sum_for(enclosing, ipv4::PROTO_ICMPV6, message.len() as u32)?;
    icmp.set("chksum", checksum::checksum_with_pseudo(pseudo, &message))
}
