//! Tactile frame published by the glove
//!
//! Each anatomical segment is a fixed-size array of unsigned pressure
//! samples (taxels). On the wire the segments are packed back to back in
//! `SEGMENTS` order.

/// Taxels along one finger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerTaxels<const DIP: usize, const MCP: usize, const PIP: usize> {
    pub dip: [u8; DIP],
    pub mcp: [u8; MCP],
    pub pip: [u8; PIP],
}

impl<const DIP: usize, const MCP: usize, const PIP: usize> Default for FingerTaxels<DIP, MCP, PIP> {
    fn default() -> Self {
        Self {
            dip: [0; DIP],
            mcp: [0; MCP],
            pip: [0; PIP],
        }
    }
}

pub type Thumb = FingerTaxels<6, 10, 4>;
pub type Finger = FingerTaxels<4, 2, 2>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PalmTaxels {
    pub upper: [u8; 16],
    pub middle: [u8; 16],
    pub lower: [u8; 16],
}

/// Segment names and sizes in wire order
pub const SEGMENTS: [(&str, usize); 18] = [
    ("thumb_dip", 6),
    ("thumb_mcp", 10),
    ("thumb_pip", 4),
    ("index_dip", 4),
    ("index_mcp", 2),
    ("index_pip", 2),
    ("middle_dip", 4),
    ("middle_mcp", 2),
    ("middle_pip", 2),
    ("ring_dip", 4),
    ("ring_mcp", 2),
    ("ring_pip", 2),
    ("pinky_dip", 4),
    ("pinky_mcp", 2),
    ("pinky_pip", 2),
    ("palm_upper", 16),
    ("palm_middle", 16),
    ("palm_lower", 16),
];

/// Total number of taxels in one frame
pub const TAXEL_COUNT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TactileFrame {
    pub valid: bool,
    pub timestamp_ms: u32,
    pub uid: u32,
    pub thumb: Thumb,
    pub index: Finger,
    pub middle: Finger,
    pub ring: Finger,
    pub pinky: Finger,
    pub palm: PalmTaxels,
}

impl TactileFrame {
    fn segments(&self) -> [&[u8]; 18] {
        [
            &self.thumb.dip,
            &self.thumb.mcp,
            &self.thumb.pip,
            &self.index.dip,
            &self.index.mcp,
            &self.index.pip,
            &self.middle.dip,
            &self.middle.mcp,
            &self.middle.pip,
            &self.ring.dip,
            &self.ring.mcp,
            &self.ring.pip,
            &self.pinky.dip,
            &self.pinky.mcp,
            &self.pinky.pip,
            &self.palm.upper,
            &self.palm.middle,
            &self.palm.lower,
        ]
    }

    fn segments_mut(&mut self) -> [&mut [u8]; 18] {
        [
            &mut self.thumb.dip,
            &mut self.thumb.mcp,
            &mut self.thumb.pip,
            &mut self.index.dip,
            &mut self.index.mcp,
            &mut self.index.pip,
            &mut self.middle.dip,
            &mut self.middle.mcp,
            &mut self.middle.pip,
            &mut self.ring.dip,
            &mut self.ring.mcp,
            &mut self.ring.pip,
            &mut self.pinky.dip,
            &mut self.pinky.mcp,
            &mut self.pinky.pip,
            &mut self.palm.upper,
            &mut self.palm.middle,
            &mut self.palm.lower,
        ]
    }

    /// All taxels packed in wire order
    pub fn to_packed(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(TAXEL_COUNT);
        for segment in self.segments() {
            out.extend_from_slice(segment);
        }
        out
    }

    /// Unpack taxels in wire order; `None` if the length is wrong
    pub fn from_packed(valid: bool, timestamp_ms: u32, uid: u32, packed: &[u8]) -> Option<Self> {
        if packed.len() != TAXEL_COUNT {
            return None;
        }
        let mut frame = TactileFrame {
            valid,
            timestamp_ms,
            uid,
            ..Default::default()
        };
        let mut offset = 0;
        for segment in frame.segments_mut() {
            let len = segment.len();
            segment.copy_from_slice(&packed[offset..offset + len]);
            offset += len;
        }
        Some(frame)
    }

    pub fn taxels(&self) -> impl Iterator<Item = u8> + '_ {
        self.segments().into_iter().flatten().copied()
    }

    pub fn max_pressure(&self) -> u8 {
        self.taxels().max().unwrap_or(0)
    }

    /// Whether any taxel reports non-zero pressure
    pub fn in_contact(&self) -> bool {
        self.taxels().any(|t| t > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_table_matches_layout() {
        let total: usize = SEGMENTS.iter().map(|(_, n)| n).sum();
        assert_eq!(total, TAXEL_COUNT);

        let frame = TactileFrame::default();
        for ((name, size), segment) in SEGMENTS.iter().zip(frame.segments()) {
            assert_eq!(segment.len(), *size, "{name}");
        }
    }

    #[test]
    fn test_packed_layout() {
        let packed: Vec<u8> = (0..TAXEL_COUNT as u8).collect();
        let frame = TactileFrame::from_packed(true, 10, 7, &packed).unwrap();
        assert_eq!(frame.thumb.dip, [0, 1, 2, 3, 4, 5]);
        assert_eq!(frame.thumb.mcp[0], 6);
        assert_eq!(frame.index.dip[0], 20);
        assert_eq!(frame.palm.lower[15], 99);
        assert_eq!(frame.to_packed(), packed);
        assert_eq!(frame.max_pressure(), 99);
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(TactileFrame::from_packed(true, 0, 0, &[0; 99]).is_none());
        assert!(!TactileFrame::default().in_contact());
    }
}
