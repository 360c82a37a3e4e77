use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::channel::Channel;
use crate::error::{CodecError, Result};
use crate::message::Message;
use crate::wire::{FromWireData, ToWireData, WireValue};

/// Turns messages into bytes and back.
///
/// Implementors only provide the byte-level half (`encode_wire` /
/// `decode_wire`). The provided `encode` / `decode` walk the whole message
/// tree and run the wire-data hooks on every channel they meet, so no codec
/// can skip them.
pub trait MessageCodec: Send + Sync + fmt::Debug {
    /// Short name, used in diagnostics and carried by identifiers so a
    /// resolved channel decodes with the same codec.
    fn name(&self) -> &'static str;

    fn encode_wire(&self, value: &WireValue) -> std::result::Result<Vec<u8>, CodecError>;

    fn decode_wire(&self, data: &[u8]) -> std::result::Result<WireValue, CodecError>;

    /// Encode a message, replacing embedded channels with their wire data.
    fn encode(&self, message: &Message) -> Result<Vec<u8>> {
        let value = to_wire_value(message)?;
        Ok(self.encode_wire(&value)?)
    }

    /// Decode a message, resolving embedded wire data into channels.
    fn decode(&self, data: &[u8]) -> Result<Message> {
        from_wire_value(self.decode_wire(data)?)
    }
}

/// JSON codec over the externally tagged [`WireValue`] tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode_wire(&self, value: &WireValue) -> std::result::Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode_wire(&self, data: &[u8]) -> std::result::Result<WireValue, CodecError> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Name of the codec channels use unless told otherwise.
pub const DEFAULT_CODEC: &str = "json";

static CODECS: OnceLock<RwLock<HashMap<&'static str, Arc<dyn MessageCodec>>>> = OnceLock::new();

fn codecs() -> &'static RwLock<HashMap<&'static str, Arc<dyn MessageCodec>>> {
    CODECS.get_or_init(|| {
        let json: Arc<dyn MessageCodec> = Arc::new(JsonCodec);
        RwLock::new(HashMap::from([(DEFAULT_CODEC, json)]))
    })
}

/// Make `codec` resolvable by name for the rest of the process.
///
/// A later registration under the same name replaces the earlier one.
pub fn register_codec(codec: Arc<dyn MessageCodec>) {
    let mut codecs = codecs().write().unwrap_or_else(PoisonError::into_inner);
    codecs.insert(codec.name(), codec);
}

/// The codec registered under `name`. JSON is always available.
pub fn codec_by_name(name: &str) -> Option<Arc<dyn MessageCodec>> {
    let codecs = codecs().read().unwrap_or_else(PoisonError::into_inner);
    codecs.get(name).cloned()
}

fn to_wire_value(message: &Message) -> Result<WireValue> {
    Ok(match message {
        Message::Null => WireValue::Null,
        Message::Bool(b) => WireValue::Bool(*b),
        Message::Int(i) => WireValue::Int(*i),
        Message::Float(f) if f.is_finite() => WireValue::Float(*f),
        Message::Float(f) => {
            return Err(CodecError::Unrepresentable(format!("non-finite float {f}")).into())
        }
        Message::Str(s) => WireValue::Str(s.clone()),
        Message::Bytes(b) => WireValue::Bytes(b.clone()),
        Message::List(items) => {
            WireValue::List(items.iter().map(to_wire_value).collect::<Result<_>>()?)
        }
        Message::Map(entries) => WireValue::Map(
            entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), to_wire_value(v)?)))
                .collect::<Result<_>>()?,
        ),
        Message::Channel(channel) => WireValue::Wire(channel.to_wire_data()?),
    })
}

fn from_wire_value(value: WireValue) -> Result<Message> {
    Ok(match value {
        WireValue::Null => Message::Null,
        WireValue::Bool(b) => Message::Bool(b),
        WireValue::Int(i) => Message::Int(i),
        WireValue::Float(f) => Message::Float(f),
        WireValue::Str(s) => Message::Str(s),
        WireValue::Bytes(b) => Message::Bytes(b),
        WireValue::List(items) => Message::List(
            items
                .into_iter()
                .map(from_wire_value)
                .collect::<Result<_>>()?,
        ),
        WireValue::Map(entries) => Message::Map(
            entries
                .into_iter()
                .map(|(k, v)| Ok((k, from_wire_value(v)?)))
                .collect::<Result<_>>()?,
        ),
        WireValue::Wire(data) => Message::Channel(<Box<dyn Channel>>::from_wire_data(data)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::GetOptions;
    use crate::error::ChannelError;
    use crate::identifier::Identifier;

    /// A channel that can describe itself but never moves data.
    #[derive(Debug, Clone)]
    struct Described(Option<Identifier>);

    impl Channel for Described {
        fn put(&mut self, _message: &Message) -> Result<()> {
            Err(ChannelError::Direction("described channels are inert".into()))
        }

        fn get(&mut self, _options: GetOptions) -> Result<Message> {
            Err(ChannelError::Direction("described channels are inert".into()))
        }

        fn is_connected(&self) -> bool {
            false
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }

        fn identifier(&self) -> Result<Identifier> {
            match &self.0 {
                Some(id) => Ok(id.clone()),
                None => Err(ChannelError::unimplemented(self.kind(), "identifier")),
            }
        }

        fn kind(&self) -> &'static str {
            "described"
        }

        fn try_clone(&self) -> Result<Box<dyn Channel>> {
            Ok(Box::new(self.clone()))
        }
    }

    #[test]
    fn plain_data_round_trips() {
        let message = Message::map([
            ("n", Message::Int(-3)),
            ("f", Message::Float(0.25)),
            ("raw", Message::bytes(vec![0, 255])),
            ("list", Message::from(vec![Message::Null, Message::from("s")])),
        ]);
        let bytes = JsonCodec.encode(&message).unwrap();
        assert_eq!(JsonCodec.decode(&bytes).unwrap(), message);
    }

    #[test]
    fn nested_channels_are_replaced_by_identifiers() {
        let id = Identifier::beanstalk("memory://codec-nested", "replies");
        let message = Message::map([(
            "envelope",
            Message::from(vec![Message::Channel(Box::new(Described(Some(id.clone()))))]),
        )]);

        let bytes = JsonCodec.encode(&message).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            json["map"]["envelope"]["list"][0]["wire"]["channel"]["tube"],
            "replies"
        );

        let decoded = JsonCodec.decode(&bytes).unwrap();
        let channel = &decoded.get("envelope").unwrap().as_list().unwrap()[0];
        match channel {
            Message::Channel(channel) => {
                assert_eq!(channel.kind(), "beanstalk");
                assert_eq!(channel.identifier().unwrap(), id);
            }
            other => panic!("expected a channel, got {other:?}"),
        }
    }

    #[test]
    fn channel_without_identifier_cannot_be_sent() {
        let message = Message::Channel(Box::new(Described(None)));
        assert!(matches!(
            JsonCodec.encode(&message),
            Err(ChannelError::Unimplemented {
                variant: "described",
                ..
            })
        ));
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        assert!(matches!(
            JsonCodec.encode(&Message::Float(f64::NAN)),
            Err(ChannelError::Codec(CodecError::Unrepresentable(_)))
        ));
    }

    #[test]
    fn floats_survive_bit_for_bit() {
        let mut state = 0x9E37_79B9_7F4A_7C15_u64;
        let mut checked = 0;
        while checked < 2_000 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let f = f64::from_bits(state);
            if !f.is_finite() {
                continue;
            }
            checked += 1;
            let bytes = JsonCodec.encode(&Message::Float(f)).unwrap();
            match JsonCodec.decode(&bytes).unwrap() {
                Message::Float(back) => assert_eq!(back.to_bits(), f.to_bits(), "{f:e}"),
                other => panic!("expected a float, got {other:?}"),
            }
        }
    }

    #[test]
    fn json_is_always_registered() {
        assert_eq!(codec_by_name(DEFAULT_CODEC).unwrap().name(), "json");
        assert!(codec_by_name("never-registered").is_none());
    }

    #[test]
    fn garbage_is_a_codec_error() {
        assert!(matches!(
            JsonCodec.decode(b"not json"),
            Err(ChannelError::Codec(CodecError::Json(_)))
        ));
    }
}
