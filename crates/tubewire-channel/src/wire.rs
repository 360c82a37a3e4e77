//! Wire forms of messages.
//!
//! Codecs never serialize a [`Message`](crate::Message) directly. They first
//! build a [`WireValue`] tree, in which every channel handle has been swapped
//! for [`WireData`] through [`ToWireData`]; decoding swaps it back through
//! [`FromWireData`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::error::Result;
use crate::identifier::Identifier;

/// Serializable stand-in for a value that cannot travel as itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireData {
    Channel(Identifier),
}

/// Values that replace themselves with [`WireData`] when sent.
pub trait ToWireData {
    fn to_wire_data(&self) -> Result<WireData>;
}

/// Values that rebuild themselves from received [`WireData`].
pub trait FromWireData: Sized {
    fn from_wire_data(data: WireData) -> Result<Self>;
}

impl<C: Channel + ?Sized> ToWireData for C {
    fn to_wire_data(&self) -> Result<WireData> {
        Ok(WireData::Channel(self.identifier()?))
    }
}

impl FromWireData for Box<dyn Channel> {
    fn from_wire_data(data: WireData) -> Result<Self> {
        match data {
            WireData::Channel(identifier) => identifier.resolve(None),
        }
    }
}

/// A message tree ready for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<WireValue>),
    Map(BTreeMap<String, WireValue>),
    Wire(WireData),
}
