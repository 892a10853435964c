//! TCP layer (RFC 9293)
//!
//! The data-offset/flags word is a single 16-bit field viewed through named
//! bit ranges. Options are a bounded sub-header array whose byte budget is
//! whatever the data offset claims beyond the fixed 20-byte header; single-
//! byte kinds (end-of-list, no-op) have no length or data octets, which the
//! option schema expresses with presence predicates.

use crate::{ipv4, ipv6, pseudo_sum_for};
use layerkit_engine::checksum;
use layerkit_engine::{ArrayCodec, BitLayout, FieldDesc, Header, HeaderType, Registry};
use layerkit_core::Result;
use std::sync::Arc;

pub const NAME: &str = "tcp";
pub const OPTION_NAME: &str = "tcp_option";

pub const MIN_HEADER_LEN: usize = 20;

pub const OPT_EOL: u64 = 0;
pub const OPT_NOP: u64 = 1;
pub const OPT_MSS: u64 = 2;

fn option_has_body(opt: &Header) -> bool {
    !matches!(opt.uint("kind"), Some(OPT_EOL) | Some(OPT_NOP))
}

fn option_data_len(opt: &Header) -> usize {
    (opt.uint("len").unwrap_or(2) as usize).saturating_sub(2)
}

pub fn option_type() -> HeaderType {
    HeaderType::new(OPTION_NAME)
        .field(FieldDesc::uint("kind", 1).default(OPT_NOP as u8))
        .field(FieldDesc::uint("len", 1).when(option_has_body).default(2u8))
        .field(
            FieldDesc::bytes("data")
                .when(option_has_body)
                .size_fn(option_data_len),
        )
}

fn options_budget(h: &Header) -> usize {
    let dataofs = h.bits("offflags", "dataofs").unwrap_or(5) as usize;
    (dataofs * 4).saturating_sub(MIN_HEADER_LEN)
}

pub fn header_type() -> HeaderType {
    header_type_with(Arc::new(option_type()))
}

fn header_type_with(option: Arc<HeaderType>) -> HeaderType {
    HeaderType::new(NAME)
        .field(FieldDesc::uint("sport", 2).default(20u16))
        .field(FieldDesc::uint("dport", 2).default(80u16))
        .field(FieldDesc::uint("seq", 4))
        .field(FieldDesc::uint("ack", 4))
        .field(
            FieldDesc::uint("offflags", 2)
                .default(0x5002u16) // offset 5, SYN
                .bits(BitLayout::new(
                    16,
                    &[("dataofs", 4), ("reserved", 4), ("flags", 8)],
                )),
        )
        .field(FieldDesc::uint("window", 2).default(8192u16))
        .field(FieldDesc::uint("chksum", 2))
        .field(FieldDesc::uint("urgptr", 2))
        .field(
            FieldDesc::array("options", ArrayCodec::bounded(option))
                .size_fn(options_budget),
        )
        .validate(|h| h.bits("offflags", "dataofs").unwrap_or(0) >= 5)
}

pub fn register(reg: &mut Registry) {
    // The option type embedded in the array codec and the registered one
    // are the same shared handle
    let option = Arc::new(option_type());
    reg.register_shared(&option);
    reg.register(header_type_with(option));
    reg.bind_value(ipv4::NAME, "proto", ipv4::PROTO_TCP as u64, NAME);
    reg.bind_value(ipv6::NAME, "nh", ipv4::PROTO_TCP as u64, NAME);
}

/// Recompute the data offset from the actual encoded header length. The
/// options region must already be padded to a 4-byte multiple.
pub fn fix_dataofs(tcp: &mut Header) -> Result<()> {
    let len = tcp.header_len()?;
    tcp.set_bits("offflags", "dataofs", (len / 4) as u64)
}

/// Recompute the checksum over the pseudo-header, the TCP header, and the
/// body. `enclosing` is the network layer this segment sits under.
pub fn fix_checksum(tcp: &mut Header, enclosing: &Header) -> Result<()> {
    tcp.set("chksum", 0u16)?;
    let segment = tcp.to_bytes()?;
    let pseudo = pseudo_sum_for(enclosing, ipv4::PROTO_TCP, segment.len() as u32)?;
    tcp.set("chksum", checksum::checksum_with_pseudo(pseudo, &segment))
}
