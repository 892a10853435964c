//! ARP layer (RFC 826, Ethernet/IPv4 flavor)

use crate::ethernet;
use layerkit_engine::{FieldDesc, HeaderType, Registry};

pub const NAME: &str = "arp";

pub const OP_REQUEST: u16 = 1;
pub const OP_REPLY: u16 = 2;

pub fn header_type() -> HeaderType {
    HeaderType::new(NAME)
        .field(FieldDesc::uint("htype", 2).default(1u16))
        .field(FieldDesc::uint("ptype", 2).default(ethernet::ETHERTYPE_IPV4))
        .field(FieldDesc::uint("hlen", 1).default(6u8))
        .field(FieldDesc::uint("plen", 1).default(4u8))
        .field(FieldDesc::uint("op", 2).default(OP_REQUEST))
        .field(FieldDesc::mac("hwsrc"))
        .field(FieldDesc::ipv4("psrc"))
        .field(FieldDesc::mac("hwdst"))
        .field(FieldDesc::ipv4("pdst"))
        .validate(|h| h.uint("hlen") == Some(6) && h.uint("plen") == Some(4))
}

pub fn register(reg: &mut Registry) {
    reg.register(header_type());
    reg.bind_value(ethernet::NAME, "ethertype", ethernet::ETHERTYPE_ARP as u64, NAME);
}
