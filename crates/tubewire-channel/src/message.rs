use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Number, Value};

use crate::channel::Channel;
use crate::error::{CodecError, Result};

/// A dynamically typed message.
///
/// Besides plain data a message may carry channel handles anywhere in its
/// tree. Two messages are equal when their data is equal and their channels
/// identify the same destination.
#[derive(Debug)]
pub enum Message {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Message>),
    Map(BTreeMap<String, Message>),
    Channel(Box<dyn Channel>),
}

impl Message {
    /// Opaque binary payload.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(data.into())
    }

    /// Build a map message from `(key, value)` pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Message)>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Convert any serializable value into a message (via its JSON form).
    pub fn from_serialize<T: Serialize>(value: &T) -> std::result::Result<Self, CodecError> {
        Ok(Self::from(serde_json::to_value(value)?))
    }

    /// Read a plain-data message back into a typed value.
    ///
    /// Fails for messages that contain channels.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> std::result::Result<T, CodecError> {
        Ok(serde_json::from_value(self.to_json()?)?)
    }

    /// The JSON form of a plain-data message.
    ///
    /// Bytes become arrays of numbers; non-finite floats become `null`.
    pub fn to_json(&self) -> std::result::Result<Value, CodecError> {
        Ok(match self {
            Message::Null => Value::Null,
            Message::Bool(b) => Value::Bool(*b),
            Message::Int(i) => Value::from(*i),
            Message::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Message::Str(s) => Value::String(s.clone()),
            Message::Bytes(b) => Value::from(b.clone()),
            Message::List(items) => Value::Array(
                items
                    .iter()
                    .map(Message::to_json)
                    .collect::<std::result::Result<_, _>>()?,
            ),
            Message::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.to_json()?)))
                    .collect::<std::result::Result<_, CodecError>>()?,
            ),
            Message::Channel(channel) => {
                return Err(CodecError::Unrepresentable(format!(
                    "{} channel handle in plain data",
                    channel.kind()
                )))
            }
        })
    }

    /// A second message with duplicated channel handles.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(match self {
            Message::Null => Message::Null,
            Message::Bool(b) => Message::Bool(*b),
            Message::Int(i) => Message::Int(*i),
            Message::Float(f) => Message::Float(*f),
            Message::Str(s) => Message::Str(s.clone()),
            Message::Bytes(b) => Message::Bytes(b.clone()),
            Message::List(items) => {
                Message::List(items.iter().map(Message::try_clone).collect::<Result<_>>()?)
            }
            Message::Map(entries) => Message::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.try_clone()?)))
                    .collect::<Result<_>>()?,
            ),
            Message::Channel(channel) => Message::Channel(channel.try_clone()?),
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Message::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Message::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Message::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Message::Float(f) => Some(*f),
            Message::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Message::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Message::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Message]> {
        match self {
            Message::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Message>> {
        match self {
            Message::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up `key` in a map message.
    pub fn get(&self, key: &str) -> Option<&Message> {
        self.as_map()?.get(key)
    }

    /// Take the value at `key` out of a map message.
    pub fn take(&mut self, key: &str) -> Option<Message> {
        match self {
            Message::Map(entries) => entries.remove(key),
            _ => None,
        }
    }

    pub fn as_channel_mut(&mut self) -> Option<&mut Box<dyn Channel>> {
        match self {
            Message::Channel(channel) => Some(channel),
            _ => None,
        }
    }

    pub fn into_channel(self) -> Option<Box<dyn Channel>> {
        match self {
            Message::Channel(channel) => Some(channel),
            _ => None,
        }
    }

    /// True if a channel handle appears anywhere in this message.
    pub fn contains_channel(&self) -> bool {
        match self {
            Message::Channel(_) => true,
            Message::List(items) => items.iter().any(Message::contains_channel),
            Message::Map(entries) => entries.values().any(Message::contains_channel),
            _ => false,
        }
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Message::Null, Message::Null) => true,
            (Message::Bool(a), Message::Bool(b)) => a == b,
            (Message::Int(a), Message::Int(b)) => a == b,
            (Message::Float(a), Message::Float(b)) => a == b,
            (Message::Str(a), Message::Str(b)) => a == b,
            (Message::Bytes(a), Message::Bytes(b)) => a == b,
            (Message::List(a), Message::List(b)) => a == b,
            (Message::Map(a), Message::Map(b)) => a == b,
            (Message::Channel(a), Message::Channel(b)) => {
                matches!((a.identifier(), b.identifier()), (Ok(x), Ok(y)) if x == y)
            }
            _ => false,
        }
    }
}

impl From<Value> for Message {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Message::Null,
            Value::Bool(b) => Message::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Message::Int(i),
                None => Message::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Message::Str(s),
            Value::Array(items) => Message::List(items.into_iter().map(Message::from).collect()),
            Value::Object(entries) => Message::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Message::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<()> for Message {
    fn from(_: ()) -> Self {
        Message::Null
    }
}

impl From<bool> for Message {
    fn from(value: bool) -> Self {
        Message::Bool(value)
    }
}

impl From<i64> for Message {
    fn from(value: i64) -> Self {
        Message::Int(value)
    }
}

impl From<i32> for Message {
    fn from(value: i32) -> Self {
        Message::Int(value.into())
    }
}

impl From<u32> for Message {
    fn from(value: u32) -> Self {
        Message::Int(value.into())
    }
}

impl From<f64> for Message {
    fn from(value: f64) -> Self {
        Message::Float(value)
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Message::Str(value.to_string())
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Message::Str(value)
    }
}

impl From<Vec<Message>> for Message {
    fn from(value: Vec<Message>) -> Self {
        Message::List(value)
    }
}

impl From<BTreeMap<String, Message>> for Message {
    fn from(value: BTreeMap<String, Message>) -> Self {
        Message::Map(value)
    }
}

impl From<Box<dyn Channel>> for Message {
    fn from(value: Box<dyn Channel>) -> Self {
        Message::Channel(value)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Order {
        id: u32,
        items: Vec<String>,
        rush: bool,
    }

    #[test]
    fn typed_values_round_trip_through_messages() {
        let order = Order {
            id: 7,
            items: vec!["tea".into(), "cake".into()],
            rush: true,
        };
        let message = Message::from_serialize(&order).unwrap();
        assert_eq!(message.get("id"), Some(&Message::Int(7)));
        assert_eq!(message.deserialize_into::<Order>().unwrap(), order);
    }

    #[test]
    fn json_numbers_keep_integer_precision() {
        assert_eq!(Message::from(json!(9_007_199_254_740_993_i64)), Message::Int(9_007_199_254_740_993));
        assert_eq!(Message::from(json!(1.5)), Message::Float(1.5));
        assert_eq!(Message::from(json!(u64::MAX)).as_f64(), Some(u64::MAX as f64));
    }

    #[test]
    fn map_builder_and_accessors() {
        let mut message = Message::map([("name", Message::from("a")), ("n", Message::from(2))]);
        assert_eq!(message.get("name").and_then(Message::as_str), Some("a"));
        assert_eq!(message.take("n"), Some(Message::Int(2)));
        assert!(message.get("n").is_none());
        assert!(!message.contains_channel());
    }

    #[test]
    fn bytes_serialize_as_number_arrays() {
        assert_eq!(Message::bytes(*b"\x01\x02").to_json().unwrap(), json!([1, 2]));
    }

    #[test]
    fn plain_clone_is_structural() {
        let message = Message::from(vec![Message::Null, Message::from(true), Message::bytes("x")]);
        assert_eq!(message.try_clone().unwrap(), message);
    }
}
