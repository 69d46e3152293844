//! A dynamic, tagged-value tree: the decoder's output when the destination is schema-less.

use std::collections::BTreeMap;

use crate::codec::Decode;
use crate::decode::Decoder;
use crate::error::Result;

/// A decoded MCPACKv2 item with no statically-known destination type.
///
/// Containers own their children; string and binary leaves own their bytes (the decoder copies
/// out of its input buffer rather than borrowing from it, so a `Value` always outlives the buffer
/// it was parsed from).
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Widen any of the integer variants to `i64`, if the value is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int8(v) => Some(v as i64),
            Value::Int16(v) => Some(v as i64),
            Value::Int32(v) => Some(v as i64),
            Value::Int64(v) => Some(v),
            Value::Uint8(v) => Some(v as i64),
            Value::Uint16(v) => Some(v as i64),
            Value::Uint32(v) => Some(v as i64),
            Value::Uint64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(v) => Some(v),
            _ => None,
        }
    }
}

/// The schema-less destination: decodes whatever item is next, materializing the whole thing
/// rather than matching it against a struct's fields. Backs `unmarshal::<Value>`.
impl Decode for Value {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        dec.decode_value()
    }
}
