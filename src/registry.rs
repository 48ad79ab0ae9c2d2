//! wirefront/src/registry.rs
//! Packet registry contract consumed by the frame decoder, plus a table-backed
//! implementation that is built once and then only read.

use crate::types::{PacketBounds, ProtocolDirection, ProtocolVersion};
use std::collections::HashMap;

/// Longest hostname a client may put in its handshake.
pub const MAXIMUM_HOSTNAME_LENGTH: i32 = 255;

/// One packet type as far as framing cares: a name for diagnostics and the
/// payload size it may legally have.
pub trait PacketType: Send + Sync {
    fn name(&self) -> &'static str;

    /// `payload` is whatever of the packet body is already buffered.
    fn expected_min_length(
        &self,
        _payload: &[u8],
        _direction: ProtocolDirection,
        _version: ProtocolVersion,
    ) -> i32 {
        0
    }

    /// `-1` means unbounded.
    fn expected_max_length(
        &self,
        _payload: &[u8],
        _direction: ProtocolDirection,
        _version: ProtocolVersion,
    ) -> i32 {
        -1
    }
}

/// Packet id table for one direction and version.
pub trait ProtocolRegistry: Send + Sync {
    fn version(&self) -> ProtocolVersion;
    fn create_packet(&self, id: i32) -> Option<&dyn PacketType>;
}

/// Resolves the id table for a direction and version.
pub trait PacketRegistry: Send + Sync {
    fn lookup(
        &self,
        direction: ProtocolDirection,
        version: ProtocolVersion,
    ) -> Option<&dyn ProtocolRegistry>;
}

/// A packet type whose bounds do not depend on the payload.
#[derive(Debug, Clone, Copy)]
pub struct FixedPacket {
    pub name: &'static str,
    pub bounds: PacketBounds,
}

impl PacketType for FixedPacket {
    fn name(&self) -> &'static str {
        self.name
    }

    fn expected_min_length(&self, _: &[u8], _: ProtocolDirection, _: ProtocolVersion) -> i32 {
        self.bounds.min_length
    }

    fn expected_max_length(&self, _: &[u8], _: ProtocolDirection, _: ProtocolVersion) -> i32 {
        self.bounds.max_length
    }
}

pub struct VersionTable {
    version: ProtocolVersion,
    packets: HashMap<i32, FixedPacket>,
}

impl ProtocolRegistry for VersionTable {
    fn version(&self) -> ProtocolVersion {
        self.version
    }

    fn create_packet(&self, id: i32) -> Option<&dyn PacketType> {
        self.packets.get(&id).map(|p| p as &dyn PacketType)
    }
}

/// Immutable id tables keyed by direction. Each direction keeps its tables sorted
/// by the version they were introduced in; a lookup picks the newest table not
/// newer than the requested version.
#[derive(Default)]
pub struct TableRegistry {
    tables: HashMap<ProtocolDirection, Vec<VersionTable>>,
}

impl TableRegistry {
    pub fn builder() -> TableRegistryBuilder {
        TableRegistryBuilder::default()
    }

    /// The vanilla handshake state: a single serverbound handshake packet.
    pub fn handshake() -> Self {
        Self::builder()
            .register(
                ProtocolDirection::Serverbound,
                ProtocolVersion::MINIMUM_VERSION,
                0x00,
                "Handshake",
                PacketBounds::new(7, 9 + MAXIMUM_HOSTNAME_LENGTH * 3),
            )
            .build()
    }
}

impl PacketRegistry for TableRegistry {
    fn lookup(
        &self,
        direction: ProtocolDirection,
        version: ProtocolVersion,
    ) -> Option<&dyn ProtocolRegistry> {
        self.tables
            .get(&direction)?
            .iter()
            .rev()
            .find(|t| version.no_less_than(t.version))
            .map(|t| t as &dyn ProtocolRegistry)
    }
}

#[derive(Default)]
pub struct TableRegistryBuilder {
    entries: HashMap<(ProtocolDirection, ProtocolVersion), HashMap<i32, FixedPacket>>,
}

impl TableRegistryBuilder {
    pub fn register(
        mut self,
        direction: ProtocolDirection,
        since: ProtocolVersion,
        id: i32,
        name: &'static str,
        bounds: PacketBounds,
    ) -> Self {
        self.entries
            .entry((direction, since))
            .or_default()
            .insert(id, FixedPacket { name, bounds });
        self
    }

    pub fn build(self) -> TableRegistry {
        let mut tables: HashMap<ProtocolDirection, Vec<VersionTable>> = HashMap::new();
        for ((direction, version), packets) in self.entries {
            tables
                .entry(direction)
                .or_default()
                .push(VersionTable { version, packets });
        }
        for list in tables.values_mut() {
            list.sort_by_key(|t| t.version);
        }
        TableRegistry { tables }
    }
}
