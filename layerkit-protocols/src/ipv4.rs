//! IPv4 layer (RFC 791)
//!
//! The version/IHL byte and the flags/fragment-offset word are exposed as
//! named bit ranges. The identification field draws a fresh pseudo-random
//! value per built instance; length and header checksum are only ever
//! updated by the explicit fixup calls below.

use crate::ethernet;
use layerkit_engine::checksum;
use layerkit_engine::{BitLayout, FieldDesc, FieldValue, Header, HeaderType, Registry};
use layerkit_core::Result;

pub const NAME: &str = "ipv4";

pub const PROTO_TCP: u8 = 6;
pub const PROTO_UDP: u8 = 17;
pub const PROTO_ICMPV6: u8 = 58;

pub const MIN_HEADER_LEN: usize = 20;

fn random_id() -> FieldValue {
    FieldValue::Uint(rand::random::<u16>() as u64)
}

fn options_len(h: &Header) -> usize {
    let ihl = h.bits("verihl", "ihl").unwrap_or(5) as usize;
    (ihl * 4).saturating_sub(MIN_HEADER_LEN)
}

pub fn header_type() -> HeaderType {
    HeaderType::new(NAME)
        .field(
            FieldDesc::uint("verihl", 1)
                .default(0x45u8)
                .bits(BitLayout::new(8, &[("version", 4), ("ihl", 4)])),
        )
        .field(FieldDesc::uint("tos", 1))
        .field(FieldDesc::uint("len", 2).default(MIN_HEADER_LEN as u16))
        .field(FieldDesc::uint("id", 2).default_fn(random_id))
        .field(
            FieldDesc::uint("fragoff", 2)
                .default(0x4000u16) // don't-fragment set
                .bits(BitLayout::new(16, &[("flags", 3), ("frag", 13)])),
        )
        .field(FieldDesc::uint("ttl", 1).default(64u8))
        .field(FieldDesc::uint("proto", 1))
        .field(FieldDesc::uint("chksum", 2))
        .field(FieldDesc::ipv4("src"))
        .field(FieldDesc::ipv4("dst"))
        .field(FieldDesc::bytes("options").size_fn(options_len))
        .validate(|h| {
            h.bits("verihl", "version") == Some(4) && h.bits("verihl", "ihl").unwrap_or(0) >= 5
        })
}

pub fn register(reg: &mut Registry) {
    reg.register(header_type());
    reg.bind_value(ethernet::NAME, "ethertype", ethernet::ETHERTYPE_IPV4 as u64, NAME);
}

/// Recompute the total-length field over this layer and everything nested
/// inside it
pub fn fix_length(ip: &mut Header) -> Result<()> {
    checksum::fix_total_length(ip, "len")
}

/// Recompute the header checksum (header fields only, checksum zeroed first)
pub fn fix_checksum(ip: &mut Header) -> Result<()> {
    ip.set("chksum", 0u16)?;
    let header = ip.encode_fields()?;
    ip.set("chksum", checksum::checksum(&header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerkit_engine::Options;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    fn sample() -> Header {
        let ty = Arc::new(header_type());
        Header::from_type(
            &ty,
            &Options::new()
                .set("src", Ipv4Addr::new(192, 168, 1, 1))
                .set("dst", Ipv4Addr::new(192, 168, 1, 2))
                .set("proto", PROTO_UDP),
        )
    }

    #[test]
    fn test_bit_views() {
        let hdr = sample();
        assert_eq!(hdr.bits("verihl", "version"), Some(4));
        assert_eq!(hdr.bits("verihl", "ihl"), Some(5));
        assert_eq!(hdr.bits("fragoff", "flags"), Some(2));
        assert_eq!(hdr.bits("fragoff", "frag"), Some(0));
    }

    #[test]
    fn test_random_id_per_instance() {
        // Not a randomness test; only that the default is drawn per build
        let ids: Vec<u64> = (0..16).filter_map(|_| sample().uint("id")).collect();
        assert_eq!(ids.len(), 16);
        assert!(ids.iter().any(|&id| id != ids[0]));
    }

    #[test]
    fn test_roundtrip_with_payload() {
        let ty = Arc::new(header_type());
        let mut hdr = sample();
        hdr.set_payload(vec![0xCA, 0xFE]);
        fix_length(&mut hdr).unwrap();
        fix_checksum(&mut hdr).unwrap();

        let bytes = hdr.to_bytes().unwrap();
        assert_eq!(bytes.len(), 22);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 22);

        let parsed = Header::parse(&ty, &bytes).unwrap();
        assert_eq!(parsed.ipv4("src"), Some(Ipv4Addr::new(192, 168, 1, 1)));
        assert_eq!(parsed.body().raw(), Some(&[0xCA, 0xFE][..]));
        assert_eq!(parsed.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_checksum_verifies() {
        let mut hdr = sample();
        fix_length(&mut hdr).unwrap();
        fix_checksum(&mut hdr).unwrap();
        assert_ne!(hdr.uint("chksum"), Some(0));
        // Folded sum over the checksummed header is all-ones
        let header = hdr.encode_fields().unwrap();
        assert_eq!(checksum::ones_complement_sum(&header), 0xFFFF);
    }

    #[test]
    fn test_options_follow_ihl() {
        let ty = Arc::new(header_type());
        let mut hdr = sample();
        hdr.set_bits("verihl", "ihl", 6).unwrap();
        hdr.set("options", vec![0x94, 0x04, 0x00, 0x00]).unwrap(); // router alert
        let bytes = hdr.to_bytes().unwrap();
        assert_eq!(bytes.len(), 24);

        let parsed = Header::parse(&ty, &bytes).unwrap();
        assert_eq!(parsed.bytes_of("options"), Some(&[0x94, 0x04, 0x00, 0x00][..]));
    }

    #[test]
    fn test_rejects_other_versions() {
        let ty = Arc::new(header_type());
        let mut bytes = sample().to_bytes().unwrap();
        bytes[0] = 0x65; // version 6
        assert!(Header::parse(&ty, &bytes).is_err());
    }
}
