//! wirefront/src/lib.rs
//! Wire-protocol front end for a Minecraft proxy: frame decoding with handshake
//! validation, the chat last-seen window, command rate limiting and plugin
//! channel negotiation.

pub mod chat;
pub mod command;
pub mod cursor;
pub mod decoder;
pub mod error;
pub mod logging;
pub mod plugin;
pub mod protocol;
pub mod ratelimit;
pub mod registry;
pub mod state;
pub mod types;

pub use chat::{AcknowledgedSet, LastSeenMessages, WINDOW_SIZE};
pub use command::{
    CommandHandler, CommandOutcome, CommandPacket, CommandPolicy, DisconnectReason, PacketKind,
    PlayerSession, RateLimitedCommandGuard,
};
pub use cursor::{ByteCursor, Checkpoint};
pub use decoder::{Frame, FrameDecoder};
pub use error::{ChannelError, CodecError, ConfigError, FrameError};
pub use plugin::{ChannelIdentifier, ChannelLimits, PluginMessage};
pub use ratelimit::{
    GovernorRatelimiter, NoopRatelimiter, Ratelimiter, RatelimiterKind, WindowRatelimiter,
};
pub use registry::{PacketRegistry, PacketType, ProtocolRegistry, TableRegistry};
pub use types::{
    FrontendOptions, PacketBounds, ProtocolDirection, ProtocolState, ProtocolVersion, ProxyVersion,
};
