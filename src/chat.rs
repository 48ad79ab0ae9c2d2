//! wirefront/src/chat.rs
//! Last-seen chat message window carried by signed chat and command packets.

use crate::cursor::ByteCursor;
use crate::error::CodecResult;
use crate::protocol::{read_since, read_varint, write_since, write_varint};
use crate::types::ProtocolVersion;
use bytes::{BufMut, BytesMut};
use std::fmt;

/// Number of messages tracked by the window.
pub const WINDOW_SIZE: usize = 20;
/// Bytes the bitset always takes on the wire.
pub const WINDOW_BYTES: usize = WINDOW_SIZE.div_ceil(8);
/// First version that appends a checksum byte to the window.
pub const CHECKSUM_SINCE: ProtocolVersion = ProtocolVersion::MINECRAFT_1_21_5;

const WINDOW_MASK: u32 = (1 << WINDOW_SIZE) - 1;

/// Which of the last [`WINDOW_SIZE`] messages were acknowledged. Bit `i` is
/// bit `i % 8` of byte `i / 8` on the wire.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AcknowledgedSet(u32);

impl AcknowledgedSet {
    pub fn from_bytes(bytes: [u8; WINDOW_BYTES]) -> Self {
        let raw = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]);
        Self(raw & WINDOW_MASK)
    }

    pub fn to_bytes(self) -> [u8; WINDOW_BYTES] {
        let [a, b, c, _] = self.0.to_le_bytes();
        [a, b, c]
    }

    /// Marks `index` as acknowledged. Returns false when it lies outside the window.
    pub fn insert(&mut self, index: usize) -> bool {
        if index >= WINDOW_SIZE {
            return false;
        }
        self.0 |= 1 << index;
        true
    }

    pub fn contains(&self, index: usize) -> bool {
        index < WINDOW_SIZE && self.0 & (1 << index) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..WINDOW_SIZE).filter(move |i| self.contains(*i))
    }
}

impl FromIterator<usize> for AcknowledgedSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = AcknowledgedSet::default();
        for index in iter {
            set.insert(index);
        }
        set
    }
}

impl fmt::Debug for AcknowledgedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LastSeenMessages {
    offset: i32,
    acknowledged: AcknowledgedSet,
    checksum: u8,
}

impl LastSeenMessages {
    pub fn new(offset: i32, acknowledged: AcknowledgedSet, checksum: u8) -> Self {
        Self {
            offset,
            acknowledged,
            checksum,
        }
    }

    pub fn decode(cur: &mut ByteCursor<'_>, version: ProtocolVersion) -> CodecResult<Self> {
        let offset = read_varint(cur)?;
        let acknowledged = AcknowledgedSet::from_bytes(cur.read_array::<WINDOW_BYTES>()?);
        let checksum = read_since(cur, version, CHECKSUM_SINCE, |c| c.read_u8())?.unwrap_or(0);
        Ok(Self {
            offset,
            acknowledged,
            checksum,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) {
        write_varint(buf, self.offset);
        buf.put_slice(&self.acknowledged.to_bytes());
        write_since(buf, version, CHECKSUM_SINCE, |b| b.put_u8(self.checksum));
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn acknowledged(&self) -> AcknowledgedSet {
        self.acknowledged
    }

    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// The same acknowledgements, `delta` messages further along the history.
    pub fn with_offset(&self, delta: i32) -> Self {
        Self {
            offset: self.offset.wrapping_add(delta),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LastSeenMessages {
        LastSeenMessages::new(5, [0, 3, 19].into_iter().collect(), 0x7F)
    }

    #[test]
    fn test_roundtrip_with_checksum() {
        let mut buf = BytesMut::new();
        sample().encode(&mut buf, ProtocolVersion::MINECRAFT_1_21_5);
        assert_eq!(&buf[..], &[0x05, 0b0000_1001, 0x00, 0b0000_1000, 0x7F]);

        let mut cur = ByteCursor::new(&buf);
        let decoded = LastSeenMessages::decode(&mut cur, ProtocolVersion::MINECRAFT_1_21_5).unwrap();
        assert_eq!(decoded, sample());
        assert_eq!(decoded.acknowledged().iter().collect::<Vec<_>>(), vec![0, 3, 19]);
        assert!(!cur.has_remaining());
    }

    #[test]
    fn test_no_checksum_before_threshold() {
        let old = ProtocolVersion::MINECRAFT_1_19_3;
        let mut buf = BytesMut::new();
        sample().encode(&mut buf, old);
        assert_eq!(buf.len(), 1 + WINDOW_BYTES);

        // A trailing byte must be left alone on old versions.
        buf.put_u8(0xEE);
        let mut cur = ByteCursor::new(&buf);
        let decoded = LastSeenMessages::decode(&mut cur, old).unwrap();
        assert_eq!(decoded.offset(), 5);
        assert_eq!(decoded.acknowledged(), sample().acknowledged());
        assert_eq!(decoded.checksum(), 0);
        assert_eq!(cur.rest(), &[0xEE]);
    }

    #[test]
    fn test_bitset_is_always_three_bytes() {
        for acknowledged in [
            AcknowledgedSet::default(),
            [0].into_iter().collect(),
            (0..WINDOW_SIZE).collect(),
        ] {
            let mut buf = BytesMut::new();
            LastSeenMessages::new(0, acknowledged, 0).encode(&mut buf, ProtocolVersion::MINECRAFT_1_19_3);
            assert_eq!(buf.len(), 1 + 3);
        }
    }

    #[test]
    fn test_padding_bits_are_dropped() {
        let set = AcknowledgedSet::from_bytes([0xFF, 0xFF, 0xFF]);
        assert_eq!(set.len(), WINDOW_SIZE);
        assert_eq!(set.to_bytes(), [0xFF, 0xFF, 0x0F]);

        let mut set = AcknowledgedSet::default();
        assert!(!set.insert(WINDOW_SIZE));
        assert!(set.is_empty());
    }

    #[test]
    fn test_truncated_window() {
        let mut cur = ByteCursor::new(&[0x01, 0x00]);
        assert!(LastSeenMessages::decode(&mut cur, ProtocolVersion::MINECRAFT_1_19_3).is_err());
    }

    #[test]
    fn test_with_offset_copies() {
        let base = sample();
        let mut shifted = base.with_offset(3);
        assert_eq!(shifted.offset(), 8);
        assert_eq!(shifted.acknowledged(), base.acknowledged());
        assert_eq!(shifted.checksum(), base.checksum());

        shifted.acknowledged.insert(1);
        assert!(!base.acknowledged().contains(1));
    }
}
