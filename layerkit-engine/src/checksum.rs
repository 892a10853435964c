//! Checksum and length fixup kit
//!
//! The 16-bit ones'-complement checksum shared by the IP family, plus the
//! length recomputation helper. Checksum and length fields are never
//! auto-maintained: they hold whatever the last explicit fixup call wrote.
//! Protocols whose checksum spans a pseudo-header take the enclosing layer
//! as an explicit argument; the framework keeps no upward back-references.

use crate::header::Header;
use layerkit_core::Result;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Ones'-complement sum of the buffer viewed as big-endian 16-bit words,
/// with a trailing odd byte zero-padded and carries folded back in. An
/// all-zero buffer sums to 0.
pub fn ones_complement_sum(data: &[u8]) -> u32 {
    let mut sum: u32 = 0;

    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
    }
    if let Some(&byte) = chunks.remainder().first() {
        sum += (byte as u32) << 8;
    }

    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    sum
}

/// Fold a running sum, invert the low 16 bits, and map a zero result to
/// 0xFFFF — on the wire, zero means "no checksum computed", so a computed
/// checksum is never left at literal zero
pub fn reduce(mut sum: u32) -> u16 {
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    let folded = !(sum as u16);
    if folded == 0 {
        0xFFFF
    } else {
        folded
    }
}

/// The complete checksum of a buffer
pub fn checksum(data: &[u8]) -> u16 {
    reduce(ones_complement_sum(data))
}

/// Pseudo-header contribution for transport checksums under IPv4
pub fn pseudo_sum_v4(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, len: u32) -> u32 {
    let mut pseudo = Vec::with_capacity(12);
    pseudo.extend_from_slice(&src.octets());
    pseudo.extend_from_slice(&dst.octets());
    pseudo.push(0);
    pseudo.push(protocol);
    pseudo.extend_from_slice(&(len as u16).to_be_bytes());
    ones_complement_sum(&pseudo)
}

/// Pseudo-header contribution for transport checksums under IPv6
pub fn pseudo_sum_v6(src: Ipv6Addr, dst: Ipv6Addr, next_header: u8, len: u32) -> u32 {
    let mut pseudo = Vec::with_capacity(40);
    pseudo.extend_from_slice(&src.octets());
    pseudo.extend_from_slice(&dst.octets());
    pseudo.extend_from_slice(&len.to_be_bytes());
    pseudo.extend_from_slice(&[0, 0, 0, next_header]);
    ones_complement_sum(&pseudo)
}

/// Checksum of a buffer with a pseudo-header sum mixed in
pub fn checksum_with_pseudo(pseudo: u32, data: &[u8]) -> u16 {
    reduce(pseudo + ones_complement_sum(data))
}

/// Recompute a total-length field: the layer's own encoded size plus the
/// encoded size of everything nested inside it, written back explicitly
pub fn fix_total_length(header: &mut Header, field: &str) -> Result<()> {
    let total = header.encoded_len()?;
    header.set(field, total as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_of_zeros_is_zero() {
        assert_eq!(ones_complement_sum(&[0u8; 8]), 0);
    }

    #[test]
    fn test_reduce_zero_is_all_ones() {
        assert_eq!(reduce(0), 0xFFFF);
    }

    #[test]
    fn test_never_literal_zero() {
        // A buffer whose folded sum is 0xFFFF would invert to zero; the
        // reserved-zero rule forces it to 0xFFFF instead
        assert_eq!(reduce(0xFFFF), 0xFFFF);
        assert_eq!(checksum(&[0xFF, 0xFF]), 0xFFFF);
    }

    #[test]
    fn test_odd_byte_zero_padded() {
        assert_eq!(ones_complement_sum(&[0x12]), ones_complement_sum(&[0x12, 0x00]));
    }

    #[test]
    fn test_end_around_carry() {
        // 0xFFFF + 0x0001 wraps to 0x0001 under end-around carry
        assert_eq!(ones_complement_sum(&[0xFF, 0xFF, 0x00, 0x01]), 0x0001);
    }

    #[test]
    fn test_verification_identity() {
        // Appending the checksum makes the folded sum all-ones
        let data = [0x45, 0x00, 0x00, 0x3c, 0x1c, 0x46];
        let ck = checksum(&data);
        let mut full = data.to_vec();
        full.extend_from_slice(&ck.to_be_bytes());
        assert_eq!(ones_complement_sum(&full), 0xFFFF);
    }

    #[test]
    fn test_pseudo_sum_v4() {
        let src = Ipv4Addr::new(192, 168, 1, 1);
        let dst = Ipv4Addr::new(192, 168, 1, 2);
        let direct = {
            let mut buf = vec![192, 168, 1, 1, 192, 168, 1, 2, 0, 17];
            buf.extend_from_slice(&8u16.to_be_bytes());
            ones_complement_sum(&buf)
        };
        assert_eq!(pseudo_sum_v4(src, dst, 17, 8), direct);
    }
}
