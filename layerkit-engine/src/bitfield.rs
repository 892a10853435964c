//! Named bit-range views over a scalar field
//!
//! Bit ranges are declared most-significant-bit first and must tile the full
//! scalar width with no gaps or overlaps, matching how the protocols'
//! published field diagrams read.

/// One named bit range within a scalar
#[derive(Debug, Clone)]
struct BitRange {
    name: &'static str,
    /// Bit offset of the range's MSB, counted from the scalar's MSB
    offset: u32,
    width: u32,
}

/// A complete bit layout for a scalar field of `total_bits` width
#[derive(Debug, Clone)]
pub struct BitLayout {
    ranges: Vec<BitRange>,
    total_bits: u32,
}

impl BitLayout {
    /// Declare the ranges of a scalar, MSB first, as `(name, bit_width)`
    /// pairs. `total_bits` is the scalar's wire width in bits; the ranges
    /// must cover it exactly.
    ///
    /// # Panics
    ///
    /// Panics at registration time if the ranges leave gaps or overflow the
    /// scalar.
    pub fn new(total_bits: u32, ranges: &[(&'static str, u32)]) -> Self {
        let mut out = Vec::with_capacity(ranges.len());
        let mut offset = 0u32;
        for &(name, width) in ranges {
            assert!(width > 0, "bit range '{name}' has zero width");
            out.push(BitRange {
                name,
                offset,
                width,
            });
            offset += width;
        }
        assert_eq!(
            offset, total_bits,
            "bit ranges cover {offset} of {total_bits} bits"
        );
        Self {
            ranges: out,
            total_bits,
        }
    }

    fn range(&self, name: &str) -> Option<&BitRange> {
        self.ranges.iter().find(|r| r.name == name)
    }

    fn mask_shift(&self, r: &BitRange) -> (u64, u32) {
        let shift = self.total_bits - r.offset - r.width;
        let mask = if r.width >= 64 {
            u64::MAX
        } else {
            (1u64 << r.width) - 1
        };
        (mask, shift)
    }

    /// Read one named range out of the scalar
    pub fn get(&self, scalar: u64, name: &str) -> Option<u64> {
        let r = self.range(name)?;
        let (mask, shift) = self.mask_shift(r);
        Some((scalar >> shift) & mask)
    }

    /// Write one named range, leaving every bit outside its mask untouched.
    /// The value is truncated to the range width. Returns the scalar
    /// unchanged for an unknown range name.
    pub fn set(&self, scalar: u64, name: &str, value: u64) -> u64 {
        match self.range(name) {
            Some(r) => {
                let (mask, shift) = self.mask_shift(r);
                (scalar & !(mask << shift)) | ((value & mask) << shift)
            }
            None => scalar,
        }
    }

    /// Whether the layout declares this range
    pub fn has(&self, name: &str) -> bool {
        self.range(name).is_some()
    }

    /// Width in bits of one named range
    pub fn width_of(&self, name: &str) -> Option<u32> {
        self.range(name).map(|r| r.width)
    }

    /// Total width in bits covered by the layout
    pub fn width_total(&self) -> u32 {
        self.total_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ver_ihl() -> BitLayout {
        BitLayout::new(8, &[("version", 4), ("ihl", 4)])
    }

    #[test]
    fn test_get_msb_first() {
        let layout = ver_ihl();
        assert_eq!(layout.get(0x45, "version"), Some(4));
        assert_eq!(layout.get(0x45, "ihl"), Some(5));
    }

    #[test]
    fn test_set_isolated() {
        // Writing one range must not alter bits outside its mask
        let layout = BitLayout::new(16, &[("dataofs", 4), ("reserved", 3), ("flags", 9)]);
        let scalar = layout.set(0, "dataofs", 5);
        let scalar = layout.set(scalar, "flags", 0x012);
        assert_eq!(layout.get(scalar, "dataofs"), Some(5));
        assert_eq!(layout.get(scalar, "reserved"), Some(0));
        assert_eq!(layout.get(scalar, "flags"), Some(0x012));
        assert_eq!(scalar, 0x5012);

        let scalar = layout.set(scalar, "flags", 0x002);
        assert_eq!(layout.get(scalar, "dataofs"), Some(5));
        assert_eq!(scalar, 0x5002);
    }

    #[test]
    fn test_set_truncates_to_width() {
        let layout = ver_ihl();
        let scalar = layout.set(0x45, "ihl", 0xFF);
        assert_eq!(scalar, 0x4F);
    }

    #[test]
    fn test_range_widths() {
        let layout = ver_ihl();
        assert_eq!(layout.width_of("ihl"), Some(4));
        assert_eq!(layout.width_of("tos"), None);
        assert_eq!(layout.width_total(), 8);
    }

    #[test]
    fn test_unknown_range() {
        let layout = ver_ihl();
        assert_eq!(layout.get(0x45, "tos"), None);
        assert_eq!(layout.set(0x45, "tos", 1), 0x45);
    }

    #[test]
    #[should_panic]
    fn test_gap_rejected() {
        BitLayout::new(8, &[("version", 4), ("ihl", 3)]);
    }

    #[test]
    #[should_panic]
    fn test_overflow_rejected() {
        BitLayout::new(8, &[("version", 4), ("ihl", 5)]);
    }
}
