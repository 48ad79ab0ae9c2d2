//! wirefront/src/plugin.rs
//! Plugin message channels: (un)registration, brand rewriting and legacy name mapping.

use crate::cursor::ByteCursor;
use crate::error::ChannelError;
use crate::protocol::{DEFAULT_MAX_STRING_SIZE, read_string, read_string_without_length, write_string};
use crate::types::{DEFAULT_MAX_CLIENTSIDE_PLUGIN_CHANNELS, ProtocolVersion, ProxyVersion};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use tracing::debug;

const BRAND_CHANNEL_LEGACY: &str = "MC|Brand";
const BRAND_CHANNEL: &str = "minecraft:brand";
const REGISTER_CHANNEL_LEGACY: &str = "REGISTER";
const REGISTER_CHANNEL: &str = "minecraft:register";
const UNREGISTER_CHANNEL_LEGACY: &str = "UNREGISTER";
const UNREGISTER_CHANNEL: &str = "minecraft:unregister";

/// Largest register payload accepted, in bytes.
pub const MAX_CHANNEL_PAYLOAD: usize = i16::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMessage {
    pub channel: String,
    pub data: Bytes,
}

impl PluginMessage {
    pub fn new(channel: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            channel: channel.into(),
            data: data.into(),
        }
    }
}

/// A plugin channel, either namespaced (1.13+) or a bare legacy name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelIdentifier {
    Modern { namespace: String, name: String },
    Legacy(String),
}

fn valid_namespace(s: &str) -> bool {
    s.bytes()
        .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_'))
}

fn valid_name(s: &str) -> bool {
    s.bytes()
        .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'/' | b'-' | b'_' | b'.'))
}

impl ChannelIdentifier {
    /// Parses `namespace:name`.
    pub fn modern(identifier: &str) -> Result<Self, ChannelError> {
        let invalid = |reason| ChannelError::InvalidIdentifier {
            identifier: identifier.to_string(),
            reason,
        };
        let (namespace, name) = identifier
            .split_once(':')
            .ok_or_else(|| invalid("identifier does not contain a colon"))?;
        if namespace.is_empty() {
            return Err(invalid("namespace is empty"));
        }
        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if !valid_namespace(namespace) {
            return Err(invalid("namespace is not valid"));
        }
        if !valid_name(name) {
            return Err(invalid("name is not valid"));
        }
        Ok(ChannelIdentifier::Modern {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    pub fn legacy(name: &str) -> Result<Self, ChannelError> {
        if name.is_empty() {
            return Err(ChannelError::InvalidIdentifier {
                identifier: String::new(),
                reason: "provided name is empty",
            });
        }
        Ok(ChannelIdentifier::Legacy(name.to_string()))
    }

    /// Modern syntax from 1.13 on, legacy before.
    pub fn parse(raw: &str, version: ProtocolVersion) -> Result<Self, ChannelError> {
        if version.no_less_than(ProtocolVersion::MINECRAFT_1_13) {
            Self::modern(raw)
        } else {
            Self::legacy(raw)
        }
    }

    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ChannelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelIdentifier::Modern { namespace, name } => write!(f, "{}:{}", namespace, name),
            ChannelIdentifier::Legacy(name) => f.write_str(name),
        }
    }
}

/// Limits applied while reading (un)register payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelLimits {
    pub max_channels: usize,
    /// Surface identifier parse failures instead of the generic error.
    pub debug: bool,
}

impl Default for ChannelLimits {
    fn default() -> Self {
        Self {
            max_channels: DEFAULT_MAX_CLIENTSIDE_PLUGIN_CHANNELS,
            debug: false,
        }
    }
}

/// Whether this is a brand plugin message. This is shown on the client.
pub fn is_brand(message: &PluginMessage) -> bool {
    message.channel == BRAND_CHANNEL_LEGACY || message.channel == BRAND_CHANNEL
}

pub fn is_register(message: &PluginMessage) -> bool {
    message.channel == REGISTER_CHANNEL_LEGACY || message.channel == REGISTER_CHANNEL
}

pub fn is_unregister(message: &PluginMessage) -> bool {
    message.channel == UNREGISTER_CHANNEL_LEGACY || message.channel == UNREGISTER_CHANNEL
}

/// Reads the channels of a register or unregister message.
///
/// `existing` is the number of channels the player already has registered;
/// together with the new ones it may not exceed `limits.max_channels`.
pub fn get_channels(
    existing: usize,
    message: &PluginMessage,
    version: ProtocolVersion,
    limits: ChannelLimits,
) -> Result<Vec<ChannelIdentifier>, ChannelError> {
    if !is_register(message) && !is_unregister(message) {
        return Err(ChannelError::UnexpectedChannel(message.channel.clone()));
    }
    // Splitting "" would produce one empty channel name.
    if message.data.is_empty() {
        return Ok(Vec::new());
    }
    if message.data.len() > MAX_CHANNEL_PAYLOAD {
        return Err(ChannelError::PayloadTooLong(message.data.len()));
    }

    let payload = String::from_utf8_lossy(&message.data);
    let mut names: Vec<&str> = payload.split('\0').collect();
    while names.last().is_some_and(|n| n.is_empty()) {
        names.pop();
    }
    if existing.saturating_add(names.len()) > limits.max_channels {
        return Err(ChannelError::TooManyChannels {
            existing,
            new: names.len(),
            max: limits.max_channels,
        });
    }

    names
        .into_iter()
        .map(|name| ChannelIdentifier::parse(name, version))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            if limits.debug {
                e
            } else {
                debug!(channel = %message.channel, "Rejected illegal plugin channel");
                ChannelError::IllegalChannel
            }
        })
}

/// Builds a register message announcing `channels`.
pub fn construct_channels_packet(
    version: ProtocolVersion,
    channels: &[ChannelIdentifier],
) -> Result<PluginMessage, ChannelError> {
    if channels.is_empty() {
        return Err(ChannelError::NoChannels);
    }
    let channel = if version.no_less_than(ProtocolVersion::MINECRAFT_1_13) {
        REGISTER_CHANNEL
    } else {
        REGISTER_CHANNEL_LEGACY
    };
    let joined = channels
        .iter()
        .map(ChannelIdentifier::id)
        .collect::<Vec<_>>()
        .join("\0");
    Ok(PluginMessage::new(channel, joined.into_bytes()))
}

/// Appends ` (<proxy name>)` to the client or server brand.
pub fn rewrite_minecraft_brand(
    message: &PluginMessage,
    proxy: &ProxyVersion,
    version: ProtocolVersion,
) -> Result<PluginMessage, ChannelError> {
    if !is_brand(message) {
        return Err(ChannelError::NotBrandMessage);
    }
    let current = read_brand_message(&message.data);
    let rewritten = format!("{} ({})", current, proxy.name);

    let mut buf = BytesMut::with_capacity(rewritten.len() + 3);
    if version.no_less_than(ProtocolVersion::MINECRAFT_1_8) {
        write_string(&mut buf, &rewritten);
    } else {
        buf.put_slice(rewritten.as_bytes());
    }
    Ok(PluginMessage::new(message.channel.clone(), buf.freeze()))
}

/// Reads a brand payload. Some clients (mostly bots) do not length-prefix it, so
/// when the 1.8 format does not parse the whole payload is taken as the brand.
pub fn read_brand_message(content: &[u8]) -> String {
    match read_string(&mut ByteCursor::new(content), DEFAULT_MAX_STRING_SIZE) {
        Ok(brand) => brand,
        Err(_) => read_string_without_length(&mut ByteCursor::new(content)),
    }
}

/// Maps a pre-1.13 channel name to a namespaced one.
pub fn transform_legacy_to_modern_channel(name: &str) -> String {
    if name.contains(':') {
        // Probably valid already.
        return name.to_string();
    }
    match name {
        REGISTER_CHANNEL_LEGACY => REGISTER_CHANNEL.to_string(),
        UNREGISTER_CHANNEL_LEGACY => UNREGISTER_CHANNEL.to_string(),
        BRAND_CHANNEL_LEGACY => BRAND_CHANNEL.to_string(),
        "BungeeCord" => "bungeecord:main".to_string(),
        _ => {
            let cleaned: String = name
                .to_lowercase()
                .chars()
                .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '-' | '_'))
                .collect();
            format!("legacy:{}", cleaned)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODERN: ProtocolVersion = ProtocolVersion::MINECRAFT_1_13;
    const OLD: ProtocolVersion = ProtocolVersion::MINECRAFT_1_8;

    fn register(payload: &[u8]) -> PluginMessage {
        PluginMessage::new(REGISTER_CHANNEL, payload.to_vec())
    }

    #[test]
    fn test_classification_is_exact() {
        assert!(is_brand(&PluginMessage::new("MC|Brand", Bytes::new())));
        assert!(is_brand(&PluginMessage::new("minecraft:brand", Bytes::new())));
        assert!(is_register(&PluginMessage::new("REGISTER", Bytes::new())));
        assert!(is_unregister(&PluginMessage::new("minecraft:unregister", Bytes::new())));
        assert!(!is_register(&PluginMessage::new("minecraft:register2", Bytes::new())));
        assert!(!is_register(&PluginMessage::new("register", Bytes::new())));
    }

    #[test]
    fn test_empty_payload_has_no_channels() {
        for version in [OLD, MODERN] {
            let channels = get_channels(0, &register(b""), version, ChannelLimits::default()).unwrap();
            assert!(channels.is_empty());
        }
    }

    #[test]
    fn test_get_channels_by_version() {
        let message = register(b"foo:bar\0baz:qux/1.0\0");
        let channels = get_channels(0, &message, MODERN, ChannelLimits::default()).unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[1].id(), "baz:qux/1.0");

        let legacy = get_channels(0, &register(b"FML|HS\0WECUI"), OLD, ChannelLimits::default()).unwrap();
        assert_eq!(
            legacy,
            vec![
                ChannelIdentifier::Legacy("FML|HS".to_string()),
                ChannelIdentifier::Legacy("WECUI".to_string())
            ]
        );
    }

    #[test]
    fn test_get_channels_rejects_other_channels() {
        let message = PluginMessage::new("minecraft:brand", b"x".to_vec());
        assert_eq!(
            get_channels(0, &message, MODERN, ChannelLimits::default()),
            Err(ChannelError::UnexpectedChannel("minecraft:brand".to_string()))
        );
    }

    #[test]
    fn test_channel_count_limit() {
        let limits = ChannelLimits {
            max_channels: 20,
            debug: false,
        };
        let payload = |n: usize| {
            (0..n)
                .map(|i| format!("test:c{}", i))
                .collect::<Vec<_>>()
                .join("\0")
        };

        // Exactly at the cap is fine, one more is not.
        let ok = register(payload(limits.max_channels - 10).as_bytes());
        assert_eq!(get_channels(10, &ok, MODERN, limits).unwrap().len(), 10);

        let too_many = register(payload(limits.max_channels - 9).as_bytes());
        assert_eq!(
            get_channels(10, &too_many, MODERN, limits),
            Err(ChannelError::TooManyChannels {
                existing: 10,
                new: 11,
                max: 20
            })
        );
    }

    #[test]
    fn test_huge_existing_count_is_rejected() {
        let limits = ChannelLimits {
            max_channels: 20,
            debug: false,
        };
        let one = register(b"test:only");
        assert_eq!(
            get_channels(usize::MAX, &one, MODERN, limits),
            Err(ChannelError::TooManyChannels {
                existing: usize::MAX,
                new: 1,
                max: 20
            })
        );
    }

    #[test]
    fn test_payload_too_long() {
        let huge = vec![b'a'; MAX_CHANNEL_PAYLOAD + 1];
        assert_eq!(
            get_channels(0, &register(&huge), OLD, ChannelLimits::default()),
            Err(ChannelError::PayloadTooLong(MAX_CHANNEL_PAYLOAD + 1))
        );
    }

    #[test]
    fn test_illegal_channel_detail_only_in_debug() {
        let message = register(b"good:one\0Not Valid");
        assert_eq!(
            get_channels(0, &message, MODERN, ChannelLimits::default()),
            Err(ChannelError::IllegalChannel)
        );
        let debug = ChannelLimits {
            debug: true,
            ..Default::default()
        };
        assert!(matches!(
            get_channels(0, &message, MODERN, debug),
            Err(ChannelError::InvalidIdentifier { .. })
        ));
        // An empty name between separators is illegal on old versions too.
        assert_eq!(
            get_channels(0, &register(b"a\0\0b"), OLD, ChannelLimits::default()),
            Err(ChannelError::IllegalChannel)
        );
    }

    #[test]
    fn test_construct_channels_packet() {
        let channels = vec![
            ChannelIdentifier::modern("foo:bar").unwrap(),
            ChannelIdentifier::modern("velocity:main").unwrap(),
        ];
        let message = construct_channels_packet(MODERN, &channels).unwrap();
        assert_eq!(message.channel, "minecraft:register");
        assert_eq!(&message.data[..], b"foo:bar\0velocity:main");

        let legacy = construct_channels_packet(OLD, &[ChannelIdentifier::legacy("WECUI").unwrap()]).unwrap();
        assert_eq!(legacy.channel, "REGISTER");
        assert_eq!(&legacy.data[..], b"WECUI");

        assert_eq!(construct_channels_packet(MODERN, &[]), Err(ChannelError::NoChannels));
    }

    #[test]
    fn test_rewrite_brand() {
        let proxy = ProxyVersion::new("Wirefront", "Wirefront", "0.1.0");

        let mut data = BytesMut::new();
        write_string(&mut data, "vanilla");
        let message = PluginMessage::new("minecraft:brand", data.freeze());
        let rewritten = rewrite_minecraft_brand(&message, &proxy, ProtocolVersion::MINECRAFT_1_13).unwrap();
        assert_eq!(rewritten.channel, "minecraft:brand");
        assert_eq!(read_brand_message(&rewritten.data), "vanilla (Wirefront)");
        assert_eq!(rewritten.data[0] as usize, "vanilla (Wirefront)".len());

        let old = PluginMessage::new("MC|Brand", b"vanilla".to_vec());
        let rewritten = rewrite_minecraft_brand(&old, &proxy, ProtocolVersion::MINECRAFT_1_7_2).unwrap();
        assert_eq!(&rewritten.data[..], b"vanilla (Wirefront)");

        let not_brand = PluginMessage::new("minecraft:register", Bytes::new());
        assert_eq!(
            rewrite_minecraft_brand(&not_brand, &proxy, MODERN),
            Err(ChannelError::NotBrandMessage)
        );
    }

    #[test]
    fn test_read_brand_falls_back_to_raw() {
        // 'f' as a length prefix claims 102 bytes that are not there.
        assert_eq!(read_brand_message(b"fabric"), "fabric");
        assert_eq!(read_brand_message(b""), "");
    }

    #[test]
    fn test_transform_legacy_to_modern_channel() {
        assert_eq!(transform_legacy_to_modern_channel("REGISTER"), "minecraft:register");
        assert_eq!(transform_legacy_to_modern_channel("UNREGISTER"), "minecraft:unregister");
        assert_eq!(transform_legacy_to_modern_channel("MC|Brand"), "minecraft:brand");
        assert_eq!(transform_legacy_to_modern_channel("BungeeCord"), "bungeecord:main");
        assert_eq!(transform_legacy_to_modern_channel("My Weird Channel!"), "legacy:myweirdchannel");
        assert_eq!(transform_legacy_to_modern_channel("foo:Bar"), "foo:Bar");
    }

    #[test]
    fn test_modern_identifier_rules() {
        assert!(ChannelIdentifier::modern("minecraft:brand").is_ok());
        for bad in ["nocolon", "ns:", ":name", "Caps:name", "ns:na me"] {
            assert!(ChannelIdentifier::modern(bad).is_err(), "{} should be rejected", bad);
        }
        assert!(ChannelIdentifier::legacy("").is_err());
    }
}
