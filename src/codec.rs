//! Top-level marshal/unmarshal entry points and the `Encode`/`Decode` trait pair.
//!
//! Every encodable type writes itself into an [`Encoder`] under a key its container chose (the
//! empty key `""` for a bare top-level value or an array element); every decodable type reads
//! itself from wherever the [`Decoder`]'s cursor currently sits. Structs normally don't implement
//! these by hand — `#[derive(mcpackv2_derive::Mcpack)]` generates both impls, dispatching field by
//! field through [`crate::field::descriptors`].

use std::collections::BTreeMap;

use crate::decode::{Decoder, RawCapture};
use crate::encode::Encoder;
use crate::error::{Error, Result};
use crate::tag::Tag;

fn next_is_null(dec: &Decoder) -> bool {
    matches!(dec.peek_tag(), Ok(Tag::Null))
}

/// Write `self` as one MCPACKv2 item under `key`.
pub trait Encode {
    fn encode(&self, key: &str, enc: &mut Encoder) -> Result<()>;
}

/// Read one MCPACKv2 item from the decoder's current position.
pub trait Decode: Sized {
    fn decode(dec: &mut Decoder) -> Result<Self>;
}

/// Backs `#[mcpack(omit_empty)]`: whether a field's current value counts as "empty" and should be
/// left out of its container entirely rather than encoded.
pub trait IsEmpty {
    fn is_empty_value(&self) -> bool;
}

macro_rules! impl_is_empty_zero {
    ($($ty:ty),*) => {
        $(impl IsEmpty for $ty {
            fn is_empty_value(&self) -> bool {
                *self == Default::default()
            }
        })*
    };
}

impl_is_empty_zero!(bool, i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

impl IsEmpty for String {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsEmpty for Option<T> {
    fn is_empty_value(&self) -> bool {
        self.is_none()
    }
}

impl<T> IsEmpty for Vec<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T> IsEmpty for BTreeMap<String, T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

/// Encode `value` as a standalone buffer.
pub fn marshal<T: Encode>(value: &T) -> Result<Vec<u8>> {
    let mut enc = Encoder::new();
    value.encode("", &mut enc)?;
    Ok(enc.into_bytes())
}

/// Decode a standalone buffer produced by [`marshal`]. The whole buffer must be consumed by
/// exactly one top-level item.
pub fn unmarshal<T: Decode>(buf: &[u8]) -> Result<T> {
    let mut dec = Decoder::new(buf);
    let value = T::decode(&mut dec)?;
    if !dec.is_empty() {
        return Err(Error::UnexpectedTrailing { remaining: dec.remaining() });
    }
    Ok(value)
}

macro_rules! impl_scalar {
    ($ty:ty, $write:ident, $read:ident) => {
        impl Encode for $ty {
            fn encode(&self, key: &str, enc: &mut Encoder) -> Result<()> {
                enc.$write(key, *self)
            }
        }

        impl Decode for $ty {
            fn decode(dec: &mut Decoder) -> Result<Self> {
                dec.$read()
            }
        }
    };
}

impl_scalar!(bool, write_bool, read_bool);
impl_scalar!(i8, write_i8, read_i8);
impl_scalar!(u8, write_u8, read_u8);
impl_scalar!(i16, write_i16, read_i16);
impl_scalar!(u16, write_u16, read_u16);
impl_scalar!(i32, write_i32, read_i32);
impl_scalar!(u32, write_u32, read_u32);
impl_scalar!(i64, write_i64, read_i64);
impl_scalar!(u64, write_u64, read_u64);
impl_scalar!(f32, write_f32, read_f32);
impl_scalar!(f64, write_f64, read_f64);

impl Encode for str {
    fn encode(&self, key: &str, enc: &mut Encoder) -> Result<()> {
        enc.write_str(key, self)
    }
}

impl Encode for String {
    fn encode(&self, key: &str, enc: &mut Encoder) -> Result<()> {
        enc.write_str(key, self)
    }
}

impl Decode for String {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        dec.read_str()
    }
}

/// `Vec<u8>` encodes as BINARY/SHORT_BINARY, not as an ARRAY of Uint8 — the common case for byte
/// payloads. Use a newtype wrapping `Vec<Value>` if an actual array of bytes is ever wanted.
impl Encode for Vec<u8> {
    fn encode(&self, key: &str, enc: &mut Encoder) -> Result<()> {
        enc.write_binary(key, self)
    }
}

impl Decode for Vec<u8> {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        dec.read_binary()
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, key: &str, enc: &mut Encoder) -> Result<()> {
        match self {
            Some(v) => v.encode(key, enc),
            None => enc.write_null(key),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        if next_is_null(dec) {
            dec.skip_item()?;
            Ok(None)
        } else {
            Ok(Some(T::decode(dec)?))
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, key: &str, enc: &mut Encoder) -> Result<()> {
        let handle = enc.start_container(Tag::Array, key, self.len() as u32)?;
        for item in self {
            item.encode("", enc)?;
        }
        enc.end_container(handle);
        Ok(())
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        dec.read_container(Tag::Array, |sub| {
            let mut out = Vec::new();
            while !sub.is_empty() {
                out.push(T::decode(sub)?);
                sub.finish_item();
            }
            Ok(out)
        })
    }
}

impl<T: Encode> Encode for BTreeMap<String, T> {
    fn encode(&self, key: &str, enc: &mut Encoder) -> Result<()> {
        let handle = enc.start_container(Tag::Object, key, self.len() as u32)?;
        for (k, v) in self {
            v.encode(k, enc)?;
        }
        enc.end_container(handle);
        Ok(())
    }
}

impl<T: Decode> Decode for BTreeMap<String, T> {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        dec.read_container(Tag::Object, |sub| {
            let mut out = BTreeMap::new();
            while !sub.is_empty() {
                let key = String::from_utf8_lossy(sub.peek_object_key()?).into_owned();
                out.insert(key, T::decode(sub)?);
                sub.finish_item();
            }
            Ok(out)
        })
    }
}

/// An already-encoded MCPACKv2 item, captured verbatim rather than interpreted. The RPC layer uses
/// this to forward a request or reply body it doesn't need to inspect without paying to decode and
/// re-encode it.
///
/// [`RawCapture`] exists as a separate trait rather than a blanket `Decode` impl over it: a blanket
/// `impl<T: RawCapture> Decode for T` would conflict with every other `Decode` impl in the crate
/// (the compiler can't prove some future `T` won't implement both), so `RawItem` is the one
/// concrete type wired up this way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem(pub Vec<u8>);

impl RawCapture for RawItem {
    fn from_raw(bytes: &[u8]) -> Result<Self> {
        Ok(RawItem(bytes.to_vec()))
    }
}

impl Decode for RawItem {
    fn decode(dec: &mut Decoder) -> Result<Self> {
        let raw = dec.capture_raw()?;
        RawItem::from_raw(raw)
    }
}

impl Encode for RawItem {
    fn encode(&self, _key: &str, enc: &mut Encoder) -> Result<()> {
        enc.write_raw(&self.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_marshal_roundtrip() {
        let buf = marshal(&42i32).unwrap();
        let back: i32 = unmarshal(&buf).unwrap();
        assert_eq!(back, 42);
    }

    #[test]
    fn vec_marshal_roundtrip() {
        let v = vec![1i32, 2, 3];
        let buf = marshal(&v).unwrap();
        let back: Vec<i32> = unmarshal(&buf).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn map_marshal_roundtrip() {
        let mut m = BTreeMap::new();
        m.insert("a".to_string(), 1i32);
        m.insert("b".to_string(), 2i32);
        let buf = marshal(&m).unwrap();
        let back: BTreeMap<String, i32> = unmarshal(&buf).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn option_roundtrip() {
        let v: Option<i32> = Some(5);
        let buf = marshal(&v).unwrap();
        let back: Option<i32> = unmarshal(&buf).unwrap();
        assert_eq!(back, Some(5));

        let n: Option<i32> = None;
        let buf = marshal(&n).unwrap();
        let back: Option<i32> = unmarshal(&buf).unwrap();
        assert_eq!(back, None);
    }

    #[test]
    fn raw_item_round_trips_without_interpretation() {
        let buf = marshal(&42i32).unwrap();
        let captured: RawItem = unmarshal(&buf).unwrap();
        assert_eq!(captured.0, buf);

        let replayed = marshal(&captured).unwrap();
        assert_eq!(replayed, buf);
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut buf = marshal(&1i32).unwrap();
        buf.push(0xff);
        let result: Result<i32> = unmarshal(&buf);
        assert!(matches!(result, Err(Error::UnexpectedTrailing { .. })));
    }
}
