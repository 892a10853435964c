//! IPv6 layer (RFC 8200)
//!
//! The first 32-bit word carries version, traffic class, and flow label as
//! bit ranges. The payload-length field covers only the body, so it gets
//! its own fixup rather than the generic total-length helper.

use crate::ethernet;
use layerkit_engine::{BitLayout, FieldDesc, Header, HeaderType, Registry};
use layerkit_core::Result;

pub const NAME: &str = "ipv6";

/// "no next header" placeholder until reconciliation or the caller sets one
pub const NH_NONE: u8 = 59;

pub fn header_type() -> HeaderType {
    HeaderType::new(NAME)
        .field(
            FieldDesc::uint("vtf", 4)
                .default(0x6000_0000u32)
                .bits(BitLayout::new(
                    32,
                    &[("version", 4), ("tclass", 8), ("flowlabel", 20)],
                )),
        )
        .field(FieldDesc::uint("plen", 2))
        .field(FieldDesc::uint("nh", 1).default(NH_NONE))
        .field(FieldDesc::uint("hlim", 1).default(64u8))
        .field(FieldDesc::ipv6("src"))
        .field(FieldDesc::ipv6("dst"))
        .validate(|h| h.bits("vtf", "version") == Some(6))
}

pub fn register(reg: &mut Registry) {
    reg.register(header_type());
    reg.bind_value(ethernet::NAME, "ethertype", ethernet::ETHERTYPE_IPV6 as u64, NAME);
}

/// Recompute the payload-length field: everything nested inside this layer,
/// excluding the fixed header itself
pub fn fix_length(ip: &mut Header) -> Result<()> {
    let total = ip.encoded_len()?;
    let own = ip.header_len()?;
    ip.set("plen", (total - own) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerkit_engine::Options;
    use std::net::Ipv6Addr;
    use std::sync::Arc;

    fn sample() -> Header {
        let ty = Arc::new(header_type());
        Header::from_type(
            &ty,
            &Options::new()
                .set("src", "fe80::1".parse::<Ipv6Addr>().unwrap())
                .set("dst", "ff02::16".parse::<Ipv6Addr>().unwrap()),
        )
    }

    #[test]
    fn test_bit_views() {
        let mut hdr = sample();
        assert_eq!(hdr.bits("vtf", "version"), Some(6));
        hdr.set_bits("vtf", "flowlabel", 0xABCDE).unwrap();
        assert_eq!(hdr.bits("vtf", "version"), Some(6));
        assert_eq!(hdr.bits("vtf", "tclass"), Some(0));
        assert_eq!(hdr.bits("vtf", "flowlabel"), Some(0xABCDE));
    }

    #[test]
    fn test_fix_length_excludes_header() {
        let mut hdr = sample();
        hdr.set_payload(vec![0; 12]);
        fix_length(&mut hdr).unwrap();
        assert_eq!(hdr.uint("plen"), Some(12));
    }

    #[test]
    fn test_roundtrip() {
        let ty = Arc::new(header_type());
        let mut hdr = sample();
        hdr.set_payload(vec![1, 2, 3]);
        fix_length(&mut hdr).unwrap();
        let bytes = hdr.to_bytes().unwrap();
        assert_eq!(bytes.len(), 43);
        assert_eq!(bytes[0] >> 4, 6);

        let parsed = Header::parse(&ty, &bytes).unwrap();
        assert_eq!(parsed.ipv6("dst"), Some("ff02::16".parse().unwrap()));
        assert_eq!(parsed.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_rejects_other_versions() {
        let ty = Arc::new(header_type());
        let mut bytes = sample().to_bytes().unwrap();
        bytes[0] = 0x40;
        assert!(Header::parse(&ty, &bytes).is_err());
    }
}
