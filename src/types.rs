//! wirefront/src/types.rs
//! Core data structures, type aliases, and constants.

use crate::command::CommandPolicy;
use crate::error::ConfigError;
use crate::plugin::ChannelLimits;
use crate::ratelimit::{
    GovernorRatelimiter, NoopRatelimiter, Ratelimiter, RatelimiterKind, WindowRatelimiter,
};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ProtocolDirection {
    /// Server to client.
    Clientbound,
    /// Client to server.
    Serverbound,
}

/// Coarse phase of a connection. Owned by the connection, never advanced by the
/// decoder itself.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ProtocolState {
    Handshake,
    Status,
    Login,
    Configuration,
    Play,
}

impl ProtocolState {
    pub fn from_handshake_next(next: i32) -> Option<Self> {
        match next {
            1 => Some(ProtocolState::Status),
            2 | 3 => Some(ProtocolState::Login),
            _ => None,
        }
    }
}

/// Minecraft protocol number. Ordering follows release order, so version-gated
/// fields are decided with [`ProtocolVersion::no_less_than`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ProtocolVersion(pub i32);

impl ProtocolVersion {
    pub const MINECRAFT_1_7_2: ProtocolVersion = ProtocolVersion(4);
    pub const MINECRAFT_1_8: ProtocolVersion = ProtocolVersion(47);
    pub const MINECRAFT_1_13: ProtocolVersion = ProtocolVersion(393);
    pub const MINECRAFT_1_19_3: ProtocolVersion = ProtocolVersion(761);
    pub const MINECRAFT_1_21_5: ProtocolVersion = ProtocolVersion(770);

    pub const MINIMUM_VERSION: ProtocolVersion = Self::MINECRAFT_1_7_2;

    pub fn protocol(self) -> i32 {
        self.0
    }

    pub fn no_less_than(self, other: ProtocolVersion) -> bool {
        self >= other
    }

    pub fn less_than(self, other: ProtocolVersion) -> bool {
        self < other
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "protocol {}", self.0)
    }
}

/// Expected payload size of one packet type. `max_length == -1` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketBounds {
    pub min_length: i32,
    pub max_length: i32,
}

impl PacketBounds {
    pub const UNBOUNDED: PacketBounds = PacketBounds {
        min_length: 0,
        max_length: -1,
    };

    pub fn new(min_length: i32, max_length: i32) -> Self {
        Self {
            min_length,
            max_length,
        }
    }
}

/// Identity of the proxy, appended to the client brand.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProxyVersion {
    pub name: String,
    pub vendor: String,
    pub version: String,
}

impl ProxyVersion {
    pub fn new(name: impl Into<String>, vendor: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vendor: vendor.into(),
            version: version.into(),
        }
    }
}

impl Default for ProxyVersion {
    fn default() -> Self {
        ProxyVersion::new("Wirefront", "Wirefront", env!("CARGO_PKG_VERSION"))
    }
}

pub const DEFAULT_MAX_CLIENTSIDE_PLUGIN_CHANNELS: usize = 1024;
pub const DEFAULT_COMMAND_RATE_LIMIT_MS: u64 = 50;

fn default_max_channels() -> usize {
    DEFAULT_MAX_CLIENTSIDE_PLUGIN_CHANNELS
}

fn default_command_rate_limit() -> u64 {
    DEFAULT_COMMAND_RATE_LIMIT_MS
}

fn default_true() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FrontendOptions {
    /// Surface detailed decoder and channel failures instead of the generic ones.
    #[serde(default)]
    pub packet_decode_logging: bool,
    #[serde(default = "default_max_channels")]
    pub max_clientside_plugin_channels: usize,
    /// Minimum spacing between two admitted commands of one player. 0 disables.
    #[serde(default = "default_command_rate_limit")]
    pub command_rate_limit_ms: u64,
    #[serde(default)]
    pub command_rate_limiter_kind: RatelimiterKind,
    #[serde(default = "default_true")]
    pub forward_commands_if_rate_limited: bool,
    /// Consecutive rejected commands before the player is kicked. 0 never kicks.
    #[serde(default)]
    pub kick_after_rate_limited_commands: u32,
}

impl Default for FrontendOptions {
    fn default() -> Self {
        Self {
            packet_decode_logging: false,
            max_clientside_plugin_channels: DEFAULT_MAX_CLIENTSIDE_PLUGIN_CHANNELS,
            command_rate_limit_ms: DEFAULT_COMMAND_RATE_LIMIT_MS,
            command_rate_limiter_kind: RatelimiterKind::TokenBucket,
            forward_commands_if_rate_limited: true,
            kick_after_rate_limited_commands: 0,
        }
    }
}

impl FrontendOptions {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let options: FrontendOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clientside_plugin_channels == 0 {
            return Err(ConfigError::InvalidValue(
                "maxClientsidePluginChannels",
                "must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn kick_on_command_rate_limit(&self) -> bool {
        self.kick_after_rate_limited_commands > 0
    }

    pub fn channel_limits(&self) -> ChannelLimits {
        ChannelLimits {
            max_channels: self.max_clientside_plugin_channels,
            debug: self.packet_decode_logging,
        }
    }

    pub fn command_policy(&self) -> CommandPolicy {
        CommandPolicy {
            kick_on_limit: self.kick_on_command_rate_limit(),
            kick_after: self.kick_after_rate_limited_commands,
            forward_when_limited: self.forward_commands_if_rate_limited,
        }
    }

    /// Builds the process-wide command limiter keyed by player id.
    pub fn command_rate_limiter(&self) -> Arc<dyn Ratelimiter<Uuid>> {
        if self.command_rate_limit_ms == 0 {
            return Arc::new(NoopRatelimiter);
        }
        let period = Duration::from_millis(self.command_rate_limit_ms);
        match self.command_rate_limiter_kind {
            RatelimiterKind::Window => Arc::new(WindowRatelimiter::<Uuid>::new(period)),
            RatelimiterKind::TokenBucket => {
                let Some(limiter) = GovernorRatelimiter::<Uuid>::with_period(period) else {
                    return Arc::new(NoopRatelimiter);
                };
                Arc::new(limiter)
            }
        }
    }
}
