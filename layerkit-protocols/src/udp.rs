//! UDP layer (RFC 768)
//!
//! The checksum spans a pseudo-header taken from the enclosing network
//! layer, so [`fix_checksum`] takes that layer as an explicit argument.

use crate::{ipv4, ipv6, pseudo_sum_for};
use layerkit_engine::checksum;
use layerkit_engine::{FieldDesc, Header, HeaderType, Registry};
use layerkit_core::Result;

pub const NAME: &str = "udp";

pub const HEADER_LEN: usize = 8;

pub fn header_type() -> HeaderType {
    HeaderType::new(NAME)
        .field(FieldDesc::uint("sport", 2).default(53u16))
        .field(FieldDesc::uint("dport", 2).default(53u16))
        .field(FieldDesc::uint("len", 2).default(HEADER_LEN as u16))
        .field(FieldDesc::uint("chksum", 2))
}

pub fn register(reg: &mut Registry) {
    reg.register(header_type());
    reg.bind_value(ipv4::NAME, "proto", ipv4::PROTO_UDP as u64, NAME);
    reg.bind_value(ipv6::NAME, "nh", ipv4::PROTO_UDP as u64, NAME);
}

/// Recompute the length field over this layer and its body
pub fn fix_length(udp: &mut Header) -> Result<()> {
    checksum::fix_total_length(udp, "len")
}

/// Recompute the checksum over the pseudo-header, the UDP header, and the
/// body. `enclosing` is the network layer this datagram sits under.
pub fn fix_checksum(udp: &mut Header, enclosing: &Header) -> Result<()> {
    udp.set("chksum", 0u16)?;
    let segment = udp.to_bytes()?;
    let pseudo = pseudo_sum_for(enclosing, ipv4::PROTO_UDP, segment.len() as u32)?;
    udp.set("chksum", checksum::checksum_with_pseudo(pseudo, &segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerkit_engine::Options;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    #[test]
    fn test_defaults() {
        let ty = Arc::new(header_type());
        let hdr = Header::from_type(&ty, &Options::new());
        assert_eq!(hdr.uint("sport"), Some(53));
        assert_eq!(hdr.uint("dport"), Some(53));
        assert_eq!(hdr.uint("len"), Some(8));
    }

    #[test]
    fn test_fix_length_counts_body() {
        let ty = Arc::new(header_type());
        let mut hdr = Header::from_type(&ty, &Options::new());
        hdr.set_payload(vec![0; 5]);
        fix_length(&mut hdr).unwrap();
        assert_eq!(hdr.uint("len"), Some(13));
    }

    #[test]
    fn test_checksum_tracks_payload() {
        let ip_ty = Arc::new(ipv4::header_type());
        let ip = Header::from_type(
            &ip_ty,
            &Options::new()
                .set("src", Ipv4Addr::new(10, 0, 0, 1))
                .set("dst", Ipv4Addr::new(10, 0, 0, 2)),
        );

        let ty = Arc::new(header_type());
        let mut hdr = Header::from_type(&ty, &Options::new());
        hdr.set_payload(b"hello".to_vec());
        fix_length(&mut hdr).unwrap();
        fix_checksum(&mut hdr, &ip).unwrap();
        let first = hdr.uint("chksum").unwrap();
        assert_ne!(first, 0);

        hdr.set_payload(b"hellp".to_vec());
        fix_checksum(&mut hdr, &ip).unwrap();
        assert_ne!(hdr.uint("chksum").unwrap(), first);
    }
}
