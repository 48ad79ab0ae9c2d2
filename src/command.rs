//! wirefront/src/command.rs
//! Rate-limited handling of player commands.

use crate::ratelimit::Ratelimiter;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Translation key of the reason shown to players kicked for command spam.
pub const COMMAND_RATE_LIMIT_KICK: &str = "velocity.kick.command-rate-limit";

/// Decoded kind of a serverbound packet that may carry a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Pre-1.19 chat message; commands are messages starting with `/`.
    LegacyChat,
    /// 1.19 to 1.19.2 signed command.
    KeyedCommand,
    /// 1.19.3+ session-signed command.
    SessionCommand,
    /// 1.20.5+ command without signatures.
    UnsignedCommand,
}

/// A command packet as seen by the guard: its kind tag, the command text and the
/// undecoded body, which is what gets forwarded when the proxy does not handle it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPacket {
    pub kind: PacketKind,
    pub command: String,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Client-side translation key.
    Translatable(&'static str),
    Text(String),
}

/// The player a guard acts for. Implemented by the connection layer.
pub trait PlayerSession: Send + Sync {
    fn id(&self) -> Uuid;
    fn disconnect(&self, reason: DisconnectReason);
}

/// Handling for one kind of command packet.
pub trait CommandHandler: Send {
    const KIND: PacketKind;

    fn handle_command(&mut self, packet: &CommandPacket);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Consumed by the proxy.
    Handled,
    /// Not ours: try the next handler or forward the raw packet to the backend.
    NotHandled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPolicy {
    pub kick_on_limit: bool,
    /// Rejections in a row that trigger the kick.
    pub kick_after: u32,
    pub forward_when_limited: bool,
}

pub struct RateLimitedCommandGuard<H, P> {
    handler: H,
    player: Arc<P>,
    limiter: Arc<dyn Ratelimiter<Uuid>>,
    policy: CommandPolicy,
    failed_attempts: u32,
}

impl<H: CommandHandler, P: PlayerSession> RateLimitedCommandGuard<H, P> {
    pub fn new(
        handler: H,
        player: Arc<P>,
        limiter: Arc<dyn Ratelimiter<Uuid>>,
        policy: CommandPolicy,
    ) -> Self {
        Self {
            handler,
            player,
            limiter,
            policy,
            failed_attempts: 0,
        }
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handle_player_command(&mut self, packet: &CommandPacket) -> CommandOutcome {
        if packet.kind != H::KIND {
            return CommandOutcome::NotHandled;
        }

        let player_id = self.player.id();
        if !self.limiter.attempt(&player_id) {
            self.failed_attempts = self.failed_attempts.saturating_add(1);
            debug!(player = %player_id, failed = self.failed_attempts, "Command rate limited");

            if self.policy.kick_on_limit && self.failed_attempts >= self.policy.kick_after {
                info!(player = %player_id, "Kicking player for exceeding the command rate limit");
                self.player
                    .disconnect(DisconnectReason::Translatable(COMMAND_RATE_LIMIT_KICK));
            }

            if self.policy.forward_when_limited {
                return CommandOutcome::NotHandled;
            }
            // Dropped without running the command.
            return CommandOutcome::Handled;
        }

        self.failed_attempts = 0;
        self.handler.handle_command(packet);
        CommandOutcome::Handled
    }
}
