//! wirefront/src/protocol.rs
//! Minecraft protocol primitives: VarInts, strings and version-gated fields.

use crate::cursor::ByteCursor;
use crate::error::{CodecError, CodecResult};
use crate::types::ProtocolVersion;
use bytes::{BufMut, BytesMut};

/// Default cap, in characters, for length-prefixed strings.
pub const DEFAULT_MAX_STRING_SIZE: usize = 65536;

/// Reads a VarInt of at most 21 bits (3 bytes), the width used for frame lengths.
///
/// If the buffer ends before the terminating byte, the cursor is left where it
/// was and `0` is returned. Callers must detect that case by comparing cursor
/// positions, since `0` is also a valid value.
pub fn read_varint21(cur: &mut ByteCursor<'_>) -> CodecResult<i32> {
    let Some(whole_or_more) = cur.peek_u32_le() else {
        // Not enough buffered to hold a full 3 byte VarInt plus one, go byte by byte.
        return read_varint21_small(cur);
    };

    // High bit of each of the low three bytes, set where that byte terminates.
    let at_stop = !whole_or_more & 0x0080_8080;
    if at_stop == 0 {
        return Err(CodecError::VarIntTooBig);
    }

    let bits_to_keep = at_stop.trailing_zeros() + 1;
    cur.skip((bits_to_keep >> 3) as usize)?;

    // Ones at and below the lowest stop bit, zeros above it.
    let mut preserved = whole_or_more & (at_stop ^ (at_stop - 1));
    preserved = (preserved & 0x007F_007F) | ((preserved & 0x0000_7F00) >> 1);
    preserved = (preserved & 0x0000_3FFF) | ((preserved & 0x3FFF_0000) >> 2);
    Ok(preserved as i32)
}

fn read_varint21_small(cur: &mut ByteCursor<'_>) -> CodecResult<i32> {
    let mark = cur.checkpoint();
    let mut result = 0i32;
    for i in 0..3 {
        let Ok(byte) = cur.read_u8() else {
            cur.restore(mark);
            return Ok(0);
        };
        result |= ((byte & 0x7F) as i32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(CodecError::VarIntTooBig)
}

/// Reads a full-width VarInt (up to 5 bytes) from a packet body.
pub fn read_varint(cur: &mut ByteCursor<'_>) -> CodecResult<i32> {
    let mut result: i32 = 0;
    let mut shift: u32 = 0;
    loop {
        let byte = cur.read_u8()?;
        result |= ((byte & 0x7F) as i32) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 35 {
            return Err(CodecError::VarIntTooBig);
        }
    }
}

/// Writes a VarInt to the buffer.
pub fn write_varint(buf: &mut BytesMut, mut value: i32) {
    loop {
        if (value & !0x7F) == 0 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8(((value & 0x7F) | 0x80) as u8);
        value = ((value as u32) >> 7) as i32;
    }
}

/// Number of bytes `value` takes as a VarInt.
pub fn varint_len(value: i32) -> usize {
    let value = value as u32;
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

/// Reads a length-prefixed UTF-8 string, capped at `max_chars` characters.
pub fn read_string(cur: &mut ByteCursor<'_>, max_chars: usize) -> CodecResult<String> {
    let len = read_varint(cur)?;
    if len < 0 {
        return Err(CodecError::NotEnoughData);
    }
    let len = len as usize;
    // A character is at most three bytes in the wire encoding.
    if len > max_chars * 3 {
        return Err(CodecError::StringTooLong(len, max_chars * 3));
    }
    let bytes = cur.read_bytes(len)?;
    let s = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
    let chars = s.chars().count();
    if chars > max_chars {
        return Err(CodecError::StringTooLong(chars, max_chars));
    }
    Ok(s.to_owned())
}

/// Takes every remaining byte as a string, replacing invalid sequences.
pub fn read_string_without_length(cur: &mut ByteCursor<'_>) -> String {
    String::from_utf8_lossy(cur.read_rest()).into_owned()
}

/// Writes a length-prefixed UTF-8 string.
pub fn write_string(buf: &mut BytesMut, s: &str) {
    write_varint(buf, s.len() as i32);
    buf.put_slice(s.as_bytes());
}

/// Reads a field that only exists on the wire from `since` onwards.
pub fn read_since<'a, T>(
    cur: &mut ByteCursor<'a>,
    version: ProtocolVersion,
    since: ProtocolVersion,
    read: impl FnOnce(&mut ByteCursor<'a>) -> CodecResult<T>,
) -> CodecResult<Option<T>> {
    if version.no_less_than(since) {
        read(cur).map(Some)
    } else {
        Ok(None)
    }
}

/// Writes a field only when `version` is at least `since`.
pub fn write_since(
    buf: &mut BytesMut,
    version: ProtocolVersion,
    since: ProtocolVersion,
    write: impl FnOnce(&mut BytesMut),
) {
    if version.no_less_than(since) {
        write(buf);
    }
}
