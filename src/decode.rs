//! The buffer decoder (§4.D).
//!
//! A [`Decoder`] walks a borrowed `&[u8]` item by item without ever copying the input. Structured
//! destinations (`#[derive(Mcpack)]` types) get a schema-directed walk: for each field, matching
//! keys are read directly and any keys that don't match any remaining field are skipped over using
//! the skip table below, without being parsed into a [`Value`](crate::value::Value). A schema-less
//! destination (`Value`) gets the same walk but every item is materialized.
//!
//! A container's own declared content length is never trusted to bound its members: a producer
//! can get that field wrong (or an attacker can forge it) without touching the member count or the
//! members themselves, so entering an OBJECT/ARRAY always walks exactly `count` children, each
//! sized by its own header, and the container's true end is wherever that walk actually finishes.
//! The declared length is still used — bounds-checked — to size an item being skipped wholesale
//! rather than decoded into, which is the one place the wire format asks for it.

use crate::bytes;
use crate::error::{Error, Result};
use crate::tag::{Layout, Tag};
use crate::value::Value;
use std::collections::BTreeMap;

/// A cursor over a borrowed MCPACKv2 buffer.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
    /// `Some(n)` when this decoder is scoped to a container's members: `n` members remain to be
    /// read, and emptiness is judged by this count, not by how much of `buf` is left. `None` for
    /// the top-level document decoder, where emptiness means the buffer is exhausted.
    items_left: Option<u32>,
}

/// One item read off the wire: its tag, key, and where its value bytes begin and end.
struct Item<'a> {
    tag: Tag,
    key: &'a [u8],
    /// Offset (from the start of the whole buffer) of the first value byte.
    value_start: usize,
    /// Offset one past the item's last byte, i.e. where the next item (if any) begins, as implied
    /// by this item's own declared length. Trustworthy for an item being skipped or read as a
    /// scalar; not used to bound a container's children (see the module doc).
    item_end: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Decoder { buf, pos: 0, items_left: None }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        match self.items_left {
            Some(n) => n == 0,
            None => self.pos >= self.buf.len(),
        }
    }

    /// Mark one member of a container decoder as consumed. No-op on the top-level decoder.
    pub fn finish_item(&mut self) {
        if let Some(n) = self.items_left {
            self.items_left = Some(n.saturating_sub(1));
        }
    }

    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Parse the item's header (tag, length field, key) starting at the current position, and
    /// compute where its value begins and where the whole item ends, without reading the value
    /// payload itself. The on-wire order is `tag | keylen | len-field? | key? | value`: the
    /// length field (when the tag has one) sits *before* the key, not after it.
    fn peek_item(&self) -> Result<Item<'a>> {
        self.peek_item_at(self.pos)
    }

    /// Like [`Decoder::peek_item`] but at an explicit absolute buffer offset, for walking a
    /// container's children without needing a throwaway `Decoder` per child.
    fn peek_item_at(&self, pos: usize) -> Result<Item<'a>> {
        if self.buf.len() < pos {
            return Err(Error::Truncated);
        }
        let rest = &self.buf[pos..];
        let tag_byte = bytes::read_u8(rest)?;
        let tag = Tag::from_u8(tag_byte)?;
        let key_len = bytes::read_u8(&rest[1..])? as usize;

        let value_len = match tag.layout() {
            Layout::Fixed(n) => n,
            Layout::ShortVarLen => bytes::read_u8(&rest[2..])? as usize,
            Layout::LongVarLen => bytes::read_u32(&rest[2..])? as usize,
        };

        let key_start = tag.key_start();
        let (key, after_key) = if key_len == 0 {
            (&rest[0..0], key_start)
        } else {
            let total = key_start + key_len;
            if rest.len() < total {
                return Err(Error::Truncated);
            }
            // key_len includes the trailing NUL.
            (&rest[key_start..key_start + key_len - 1], total)
        };

        let value_start = after_key;
        let item_end_rel = value_start + value_len;
        if rest.len() < item_end_rel {
            return Err(Error::Truncated);
        }

        Ok(Item {
            tag,
            key,
            value_start: pos + value_start,
            item_end: pos + item_end_rel,
        })
    }

    /// Compute an item's total size using the skip table (tag + key-start + value length) without
    /// materializing its value. Used to step over a key that a structured destination didn't ask
    /// for; this is the one place a container's own declared length is trusted, per the wire
    /// format's skip table.
    pub fn skip_item(&mut self) -> Result<()> {
        let item = self.peek_item()?;
        self.pos = item.item_end;
        Ok(())
    }

    /// Read one top-level value into a dynamic [`Value`] tree.
    pub fn decode_value(&mut self) -> Result<Value> {
        let item = self.peek_item()?;
        let (value, end) = self.decode_item_value(&item)?;
        self.pos = end;
        Ok(value)
    }

    /// Decode `item`'s payload. Returns the value together with the absolute offset one past its
    /// last byte — for a container this is derived from walking exactly its declared member count,
    /// not from `item.item_end`.
    fn decode_item_value(&self, item: &Item<'a>) -> Result<(Value, usize)> {
        let raw = &self.buf[item.value_start..item.item_end];
        let value = match item.tag {
            Tag::Null => Value::Null,
            Tag::Bool => Value::Bool(raw[0] != 0),
            Tag::Int8 => Value::Int8(raw[0] as i8),
            Tag::Uint8 => Value::Uint8(raw[0]),
            Tag::Int16 => Value::Int16(bytes::read_i16(raw)?),
            Tag::Uint16 => Value::Uint16(bytes::read_u16(raw)?),
            Tag::Int32 => Value::Int32(bytes::read_i32(raw)?),
            Tag::Uint32 => Value::Uint32(bytes::read_u32(raw)?),
            Tag::Int64 => Value::Int64(bytes::read_i64(raw)?),
            Tag::Uint64 => Value::Uint64(bytes::read_u64(raw)?),
            Tag::Float => Value::Float(bytes::read_f32(raw)?),
            Tag::Double => Value::Double(bytes::read_f64(raw)?),
            Tag::String | Tag::ShortString => {
                let without_nul = if raw.is_empty() { raw } else { &raw[..raw.len() - 1] };
                return Ok((
                    Value::String(String::from_utf8_lossy(without_nul).into_owned()),
                    item.item_end,
                ));
            }
            Tag::Binary | Tag::ShortBinary => {
                return Ok((Value::Binary(raw.to_vec()), item.item_end));
            }
            Tag::Array => {
                let (count, mut pos) = self.read_count(item.value_start)?;
                let mut items = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let child = self.peek_item_at(pos)?;
                    let (v, end) = self.decode_item_value(&child)?;
                    items.push(v);
                    pos = end;
                }
                return Ok((Value::Array(items), pos));
            }
            Tag::Object => {
                let (count, mut pos) = self.read_count(item.value_start)?;
                let mut map = BTreeMap::new();
                for _ in 0..count {
                    let child = self.peek_item_at(pos)?;
                    if child.key.is_empty() {
                        return Err(Error::EmptyKey);
                    }
                    let key = String::from_utf8_lossy(child.key).into_owned();
                    let (v, end) = self.decode_item_value(&child)?;
                    pos = end;
                    map.insert(key, v);
                }
                return Ok((Value::Object(map), pos));
            }
        };
        Ok((value, item.item_end))
    }

    /// Read a container's 4-byte member count at `value_start`, returning it along with the
    /// absolute offset where the first member begins.
    fn read_count(&self, value_start: usize) -> Result<(u32, usize)> {
        if self.buf.len() < value_start + 4 {
            return Err(Error::Truncated);
        }
        let count = bytes::read_u32(&self.buf[value_start..])?;
        Ok((count, value_start + 4))
    }

    /// Read the next item's key without consuming it, so a schema-directed caller can decide
    /// whether it wants this field before paying to parse it.
    pub fn peek_key(&self) -> Result<&'a [u8]> {
        Ok(self.peek_item()?.key)
    }

    /// Like [`Decoder::peek_key`], but for a decoder positioned over an OBJECT's members: a
    /// zero-length key here means the producer embedded an anonymous item where a named member
    /// was expected, which is invalid.
    pub fn peek_object_key(&self) -> Result<&'a [u8]> {
        let key = self.peek_key()?;
        if key.is_empty() {
            return Err(Error::EmptyKey);
        }
        Ok(key)
    }

    /// The next item's tag, without consuming it.
    pub fn peek_tag(&self) -> Result<Tag> {
        Ok(self.peek_item()?.tag)
    }

    fn expect_tag(&self, item: &Item, want: &[Tag]) -> Result<()> {
        if want.contains(&item.tag) {
            Ok(())
        } else {
            Err(Error::InvalidDestination(format!(
                "expected one of {want:?}, found {:?}",
                item.tag
            )))
        }
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        let item = self.peek_item()?;
        self.expect_tag(&item, &[Tag::Bool])?;
        let v = self.buf[item.value_start] != 0;
        self.pos = item.item_end;
        Ok(v)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        let item = self.peek_item()?;
        self.expect_tag(&item, &[Tag::Int8])?;
        let v = self.buf[item.value_start] as i8;
        self.pos = item.item_end;
        Ok(v)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let item = self.peek_item()?;
        self.expect_tag(&item, &[Tag::Uint8])?;
        let v = self.buf[item.value_start];
        self.pos = item.item_end;
        Ok(v)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let item = self.peek_item()?;
        self.expect_tag(&item, &[Tag::Int16])?;
        let v = bytes::read_i16(&self.buf[item.value_start..])?;
        self.pos = item.item_end;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let item = self.peek_item()?;
        self.expect_tag(&item, &[Tag::Uint16])?;
        let v = bytes::read_u16(&self.buf[item.value_start..])?;
        self.pos = item.item_end;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let item = self.peek_item()?;
        self.expect_tag(&item, &[Tag::Int32])?;
        let v = bytes::read_i32(&self.buf[item.value_start..])?;
        self.pos = item.item_end;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let item = self.peek_item()?;
        self.expect_tag(&item, &[Tag::Uint32])?;
        let v = bytes::read_u32(&self.buf[item.value_start..])?;
        self.pos = item.item_end;
        Ok(v)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let item = self.peek_item()?;
        self.expect_tag(&item, &[Tag::Int64])?;
        let v = bytes::read_i64(&self.buf[item.value_start..])?;
        self.pos = item.item_end;
        Ok(v)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let item = self.peek_item()?;
        self.expect_tag(&item, &[Tag::Uint64])?;
        let v = bytes::read_u64(&self.buf[item.value_start..])?;
        self.pos = item.item_end;
        Ok(v)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let item = self.peek_item()?;
        self.expect_tag(&item, &[Tag::Float])?;
        let v = bytes::read_f32(&self.buf[item.value_start..])?;
        self.pos = item.item_end;
        Ok(v)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let item = self.peek_item()?;
        self.expect_tag(&item, &[Tag::Double])?;
        let v = bytes::read_f64(&self.buf[item.value_start..])?;
        self.pos = item.item_end;
        Ok(v)
    }

    pub fn read_str(&mut self) -> Result<String> {
        let item = self.peek_item()?;
        self.expect_tag(&item, &[Tag::String, Tag::ShortString])?;
        let raw = &self.buf[item.value_start..item.item_end];
        let without_nul = if raw.is_empty() { raw } else { &raw[..raw.len() - 1] };
        let s = String::from_utf8_lossy(without_nul).into_owned();
        self.pos = item.item_end;
        Ok(s)
    }

    pub fn read_binary(&mut self) -> Result<Vec<u8>> {
        let item = self.peek_item()?;
        self.expect_tag(&item, &[Tag::Binary, Tag::ShortBinary])?;
        let v = self.buf[item.value_start..item.item_end].to_vec();
        self.pos = item.item_end;
        Ok(v)
    }

    /// Enter an OBJECT or ARRAY: read its member count, then hand a decoder scoped to exactly that
    /// many children to `f`. The count — not the container's own declared content length — is what
    /// the walk trusts; the parent cursor is advanced to wherever `f` actually finished reading.
    pub fn read_container<R>(
        &mut self,
        want: Tag,
        f: impl FnOnce(&mut Decoder<'a>) -> Result<R>,
    ) -> Result<R> {
        let item = self.peek_item()?;
        self.expect_tag(&item, &[want])?;
        let (count, start) = self.read_count(item.value_start)?;
        let mut sub = Decoder { buf: self.buf, pos: start, items_left: Some(count) };
        let result = f(&mut sub)?;
        self.pos = sub.pos;
        Ok(result)
    }

    /// Give the caller the exact, unparsed bytes of the next whole item (tag through end of
    /// value), advancing past it. Used by the `RawCapture` hook so a destination type can store an
    /// already-encoded sub-item verbatim instead of decoding and re-encoding it. Like
    /// [`Decoder::skip_item`], this trusts the item's own declared length.
    pub fn capture_raw(&mut self) -> Result<&'a [u8]> {
        let item = self.peek_item()?;
        let raw = &self.buf[self.pos..item.item_end];
        self.pos = item.item_end;
        Ok(raw)
    }
}

/// Implemented by destination types that want the raw, unparsed bytes of an item instead of a
/// decoded value (e.g. to forward an opaque sub-document unchanged).
pub trait RawCapture: Sized {
    fn from_raw(bytes: &[u8]) -> Result<Self>;
}
