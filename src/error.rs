//! wirefront/src/error.rs
//! Error types for framing, body codecs, channel negotiation and configuration.

use std::io;
use thiserror::Error;

/// Failures while reading primitive fields out of a packet body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Not enough data")]
    NotEnoughData,
    #[error("VarInt too big")]
    VarIntTooBig,
    #[error("String too long: {0} > {1}")]
    StringTooLong(usize, usize),
    #[error("Invalid UTF-8 in string")]
    InvalidUtf8,
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Failures of the length-prefixed frame decoder. All of them are fatal to the
/// connection: byte alignment cannot be trusted after any of these.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Bad packet length")]
    BadPacketLength,
    #[error("VarInt too big")]
    VarIntTooBig,
    #[error("Unknown packet")]
    UnknownPacket,
    #[error("Packet sent for {packet} was too big (expected {expected} bytes, got {actual} bytes)")]
    FrameOverflow {
        packet: &'static str,
        expected: i32,
        actual: i32,
    },
    #[error("Packet sent for {packet} was too small (expected {expected} bytes, got {actual} bytes)")]
    FrameUnderflow {
        packet: &'static str,
        expected: i32,
        actual: i32,
    },
    #[error(
        "A packet frame decoder failed. For more information, enable packetDecodeLogging to see more."
    )]
    FrameDecodeFailed,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<CodecError> for FrameError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::VarIntTooBig => FrameError::VarIntTooBig,
            _ => FrameError::BadPacketLength,
        }
    }
}

/// Failures while negotiating plugin channels or rewriting the client brand.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Unknown channel type {0}")]
    UnexpectedChannel(String),
    #[error("Illegal channel")]
    IllegalChannel,
    #[error("Invalid channel identifier {identifier:?}: {reason}")]
    InvalidIdentifier {
        identifier: String,
        reason: &'static str,
    },
    #[error("payload too long: {0}")]
    PayloadTooLong(usize),
    #[error("too many channels: {existing} + {new} > {max}")]
    TooManyChannels {
        existing: usize,
        new: usize,
        max: usize,
    },
    #[error("no channels specified")]
    NoChannels,
    #[error("message is not a brand plugin message")]
    NotBrandMessage,
}

/// Failures while loading options or adjusting logging at runtime.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse options JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid option {0}: {1}")]
    InvalidValue(&'static str, String),
    #[error("Logging error: {0}")]
    Logging(String),
}
