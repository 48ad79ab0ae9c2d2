//! wirefront/src/decoder.rs
//! Splits a connection's receive buffer into VarInt21 length-prefixed frames.

use crate::{
    cursor::ByteCursor,
    error::FrameError,
    protocol::{read_varint21, varint_len},
    registry::{PacketRegistry, PacketType},
    state::{self, HANDSHAKE_REGISTRY},
    types::{ProtocolDirection, ProtocolState, ProtocolVersion},
};
use bytes::{Buf, Bytes, BytesMut};
use std::{ops::Deref, sync::Arc};
use tokio_util::codec::Decoder;
use tracing::{trace, warn};

/// One length-delimited packet, split off the receive buffer without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(Bytes);

impl Frame {
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

enum Peek {
    Valid,
    Incomplete,
}

pub struct FrameDecoder {
    direction: ProtocolDirection,
    state: ProtocolState,
    registry: Arc<dyn PacketRegistry>,
    debug: bool,
    active: bool,
}

impl FrameDecoder {
    /// Creates a decoder for traffic flowing in `direction`, starting in the
    /// handshake state and validated against the built-in handshake table.
    pub fn new(direction: ProtocolDirection) -> Self {
        let registry: Arc<dyn PacketRegistry> = HANDSHAKE_REGISTRY.clone();
        Self {
            direction,
            state: ProtocolState::Handshake,
            registry,
            debug: state::options().packet_decode_logging,
            active: true,
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn PacketRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn direction(&self) -> ProtocolDirection {
        self.direction
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn set_state(&mut self, state: ProtocolState) {
        self.state = state;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Marks the connection as gone; anything buffered afterwards is discarded.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Extracts the next frame from `src`.
    ///
    /// `Ok(None)` means more bytes are needed; nothing past what was actually
    /// buffered has been consumed and the call can simply be repeated once more
    /// data arrives.
    pub fn decode_frame(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        let result = self.next_frame(src);
        if let Err(e) = &result {
            if self.debug {
                warn!(direction = ?self.direction, state = ?self.state, "Exception caught while decoding frame: {}", e);
            } else {
                trace!(error = %e, "Frame decode failed");
            }
        }
        result
    }

    fn next_frame(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        loop {
            if !self.active {
                src.clear();
                return Ok(None);
            }

            // skip any runs of 0x00 we might find
            match src.iter().position(|&b| b != 0) {
                Some(start) => src.advance(start),
                None => {
                    src.clear();
                    return Ok(None);
                }
            }

            let (header_len, length) = {
                let mut cur = ByteCursor::new(&src[..]);
                let mark = cur.checkpoint();
                let length = read_varint21(&mut cur)?;
                if !cur.advanced_since(mark) {
                    return Ok(None);
                }
                if length < 0 {
                    return Err(FrameError::BadPacketLength);
                }
                if length > 0 && self.validates_handshake() {
                    if let Peek::Incomplete = self.validate_handshake(&mut cur, length)? {
                        return Ok(None);
                    }
                }
                (cur.position(), length as usize)
            };

            // zero-length packets are ignored
            if length == 0 {
                src.advance(header_len);
                continue;
            }

            let buffered = src.len() - header_len;
            if buffered < length {
                src.reserve(length - buffered);
                return Ok(None);
            }

            src.advance(header_len);
            return Ok(Some(Frame(src.split_to(length).freeze())));
        }
    }

    fn validates_handshake(&self) -> bool {
        self.state == ProtocolState::Handshake && self.direction == ProtocolDirection::Serverbound
    }

    /// Peeks at the packet id behind the length prefix and checks the declared
    /// length against the bounds of that packet. The cursor always ends up right
    /// after the length prefix again.
    fn validate_handshake(&self, cur: &mut ByteCursor<'_>, length: i32) -> Result<Peek, FrameError> {
        let registry = self
            .registry
            .lookup(self.direction, ProtocolVersion::MINIMUM_VERSION)
            .ok_or(FrameError::UnknownPacket)?;

        let index = cur.checkpoint();
        let packet_id = read_varint21(cur)?;
        if !cur.advanced_since(index) {
            return Ok(Peek::Incomplete);
        }
        let payload = cur.rest();
        cur.restore(index);

        // Every handshake packet is known; anything else means the peer is not a client.
        let packet = registry
            .create_packet(packet_id)
            .ok_or(FrameError::UnknownPacket)?;
        let payload_length = length - varint_len(packet_id) as i32;

        let version = registry.version();
        let min = packet.expected_min_length(payload, self.direction, version);
        let max = packet.expected_max_length(payload, self.direction, version);
        if max != -1 && payload_length > max {
            return Err(self.overflow(packet, max, payload_length));
        }
        if payload_length < min {
            return Err(self.underflow(packet, min, payload_length));
        }
        Ok(Peek::Valid)
    }

    fn overflow(&self, packet: &dyn PacketType, expected: i32, actual: i32) -> FrameError {
        if self.debug {
            FrameError::FrameOverflow {
                packet: packet.name(),
                expected,
                actual,
            }
        } else {
            FrameError::FrameDecodeFailed
        }
    }

    fn underflow(&self, packet: &dyn PacketType, expected: i32, actual: i32) -> FrameError {
        if self.debug {
            FrameError::FrameUnderflow {
                packet: packet.name(),
                expected,
                actual,
            }
        } else {
            FrameError::FrameDecodeFailed
        }
    }
}

impl Decoder for FrameDecoder {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        self.decode_frame(src)
    }
}
