//! MCPACKv2 binary codec and NPC framed RPC transport.
//!
//! [`marshal`]/[`unmarshal`] encode and decode any type implementing [`Encode`]/[`Decode`] —
//! either hand-written for a primitive, or generated by `#[derive(mcpackv2_derive::Mcpack)]` for a
//! struct. [`Value`] is the schema-less counterpart, for callers that don't know the shape of the
//! data ahead of time.
//!
//! The [`npc`] module layers a length-prefixed framed transport and a small request/response RPC
//! convention on top of the codec.

#![allow(dead_code)]

extern crate byteorder;
extern crate log;
extern crate rand;
// Lets the derive macro's generated code refer to this crate as `::mcpackv2::...` even from
// within this crate itself (e.g. when `#[derive(Mcpack)]` is used on an NPC message type).
extern crate self as mcpackv2;

mod bytes;
mod codec;
mod decode;
mod encode;
mod error;
pub mod field;
mod tag;
mod value;

pub mod npc;
pub mod rpc;

pub use codec::{marshal, unmarshal, Decode, Encode, IsEmpty, RawItem};
pub use decode::{Decoder, RawCapture};
pub use encode::Encoder;
pub use error::{Error, Result};
pub use field::{Described, FieldDescriptor, RawFieldDescriptor};
pub use mcpackv2_derive::Mcpack;
pub use tag::Tag;
pub use value::Value;
