//! wirefront/src/cursor.rs
//! Read cursor over a borrowed byte slice with explicit checkpoint/restore.

use crate::error::{CodecError, CodecResult};

/// A saved cursor position. Only meaningful for the cursor that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// Forward-only reader over `&[u8]`. Nothing is ever copied; speculative reads
/// capture a [`Checkpoint`] and [`ByteCursor::restore`] it when they give up.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn has_remaining(&self) -> bool {
        self.pos < self.data.len()
    }

    /// The unread tail.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.pos)
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        debug_assert!(checkpoint.0 <= self.data.len());
        self.pos = checkpoint.0;
    }

    /// Whether the cursor moved since `checkpoint` was taken.
    pub fn advanced_since(&self, checkpoint: Checkpoint) -> bool {
        self.pos != checkpoint.0
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        let byte = *self.data.get(self.pos).ok_or(CodecError::NotEnoughData)?;
        self.pos += 1;
        Ok(byte)
    }

    /// Loads the next four bytes as a little-endian word without consuming them.
    pub fn peek_u32_le(&self) -> Option<u32> {
        let bytes = self.data.get(self.pos..self.pos + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn skip(&mut self, n: usize) -> CodecResult<()> {
        if self.remaining() < n {
            return Err(CodecError::NotEnoughData);
        }
        self.pos += n;
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::NotEnoughData);
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Consumes everything that is left.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let out = self.rest();
        self.pos = self.data.len();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_restore() {
        let mut cur = ByteCursor::new(&[1, 2, 3, 4, 5]);
        cur.read_u8().unwrap();
        let mark = cur.checkpoint();
        cur.skip(3).unwrap();
        assert!(cur.advanced_since(mark));
        cur.restore(mark);
        assert_eq!(cur.position(), 1);
        assert!(!cur.advanced_since(mark));
        assert_eq!(cur.rest(), &[2, 3, 4, 5]);
    }

    #[test]
    fn test_short_reads_do_not_move() {
        let mut cur = ByteCursor::new(&[9, 8]);
        assert_eq!(cur.read_bytes(3), Err(CodecError::NotEnoughData));
        assert_eq!(cur.position(), 0);
        assert_eq!(cur.peek_u32_le(), None);
        assert_eq!(cur.read_array::<2>().unwrap(), [9, 8]);
        assert_eq!(cur.read_u8(), Err(CodecError::NotEnoughData));
    }

    #[test]
    fn test_peek_is_little_endian() {
        let cur = ByteCursor::new(&[0x01, 0x02, 0x03, 0x04, 0x05]);
        assert_eq!(cur.peek_u32_le(), Some(0x0403_0201));
        assert_eq!(cur.position(), 0);
    }
}
