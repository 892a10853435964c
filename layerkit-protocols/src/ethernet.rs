//! Ethernet II frame layer

use layerkit_core::MacAddr;
use layerkit_engine::{FieldDesc, HeaderType, Registry};

pub const NAME: &str = "ethernet";

/// Common EtherType values
pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;
pub const ETHERTYPE_IPV6: u16 = 0x86DD;
/// Default for a freshly built frame; the build reconciliation pass
/// replaces it with the registered value for the actual inner layer
pub const ETHERTYPE_LOOPBACK: u16 = 0x9000;

pub fn header_type() -> HeaderType {
    HeaderType::new(NAME)
        .field(FieldDesc::mac("dst").default(MacAddr::broadcast()))
        .field(FieldDesc::mac("src"))
        .field(FieldDesc::uint("ethertype", 2).default(ETHERTYPE_LOOPBACK))
}

pub fn register(reg: &mut Registry) {
    reg.register(header_type());
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerkit_engine::{Header, Options};
    use std::sync::Arc;

    #[test]
    fn test_defaults() {
        let ty = Arc::new(header_type());
        let hdr = Header::new(&ty);
        assert_eq!(hdr.mac("dst"), Some(MacAddr::broadcast()));
        assert_eq!(hdr.mac("src"), Some(MacAddr::zero()));
        assert_eq!(hdr.uint("ethertype"), Some(ETHERTYPE_LOOPBACK as u64));
    }

    #[test]
    fn test_roundtrip() {
        let ty = Arc::new(header_type());
        let src = MacAddr([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        let hdr = Header::from_type(
            &ty,
            &Options::new()
                .set("src", src)
                .set("ethertype", ETHERTYPE_IPV4),
        );
        let bytes = hdr.to_bytes().unwrap();
        assert_eq!(bytes.len(), 14);
        assert_eq!(&bytes[0..6], &[0xff; 6]);
        assert_eq!(&bytes[12..14], &[0x08, 0x00]);

        let parsed = Header::parse(&ty, &bytes).unwrap();
        assert_eq!(parsed.mac("src"), Some(src));
        assert_eq!(parsed.uint("ethertype"), Some(0x0800));
        assert_eq!(parsed.to_bytes().unwrap(), bytes);
    }
}
