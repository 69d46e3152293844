//! The byte-buffer encoder (§4.C).
//!
//! An [`Encoder`] owns a growing `Vec<u8>` and writes items to it tag-first, mirroring the wire
//! layout directly: no intermediate tree is built before encoding. Every item is
//! `tag | keylen | len-field? | key? | value`: the length field (absent for fixed-width scalars,
//! one byte for SHORT_STRING/SHORT_BINARY, four bytes for STRING/BINARY/OBJECT/ARRAY) comes
//! *before* the key, not after it. Containers reserve their content-length field up front and
//! patch it once their children are written, rather than buffering a child and copying it in
//! afterwards.

use crate::bytes;
use crate::error::{Error, Result};
use crate::tag::{self, Tag};

/// Growable output buffer for MCPACKv2 items.
pub struct Encoder {
    buf: Vec<u8>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Returned by [`Encoder::start_container`]; fed back to [`Encoder::end_container`] once the
/// container's children have all been written.
pub struct ContainerHandle {
    len_offset: usize,
    content_begin: usize,
}

impl Encoder {
    pub fn new() -> Self {
        Encoder { buf: Vec::with_capacity(256) }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    fn reserve_more(&mut self, additional: usize) {
        // Amortized doubling: grow past the immediate need so a run of small writes doesn't
        // re-allocate on every call.
        let want = self.buf.len() + additional;
        if self.buf.capacity() < want {
            self.buf.reserve(want.max(self.buf.capacity()) - self.buf.len());
        }
    }

    /// `0` for an anonymous item (array element or document root); otherwise `len(key) + 1`
    /// (the trailing NUL is always counted), erroring if that exceeds the wire maximum.
    fn key_len_byte(&self, key: &str) -> Result<u8> {
        if key.is_empty() {
            return Ok(0);
        }
        let len_with_nul = key.len() + 1;
        if len_with_nul > tag::MCPACKV2_KEY_MAX_LEN {
            return Err(Error::KeyTooLong { len: key.len() });
        }
        Ok(len_with_nul as u8)
    }

    fn push_key_bytes(&mut self, key: &str) {
        if key.is_empty() {
            return;
        }
        self.reserve_more(key.len() + 1);
        self.buf.extend_from_slice(key.as_bytes());
        self.buf.push(0);
    }

    fn write_tag(&mut self, t: Tag) {
        self.buf.push(t.into_u8());
    }

    fn push_fixed(&mut self, width: usize, write: impl FnOnce(&mut [u8])) {
        self.reserve_more(width);
        let start = self.buf.len();
        self.buf.resize(start + width, 0);
        write(&mut self.buf[start..]);
    }

    /// Begin a fixed-width scalar: `tag | keylen | key?`. The caller appends the value bytes.
    fn start_scalar(&mut self, t: Tag, key: &str) -> Result<()> {
        let klen = self.key_len_byte(key)?;
        self.write_tag(t);
        self.buf.push(klen);
        self.push_key_bytes(key);
        Ok(())
    }

    pub fn write_null(&mut self, key: &str) -> Result<()> {
        self.start_scalar(Tag::Null, key)?;
        self.buf.push(0);
        Ok(())
    }

    pub fn write_bool(&mut self, key: &str, v: bool) -> Result<()> {
        self.start_scalar(Tag::Bool, key)?;
        self.buf.push(v as u8);
        Ok(())
    }

    pub fn write_i8(&mut self, key: &str, v: i8) -> Result<()> {
        self.start_scalar(Tag::Int8, key)?;
        self.buf.push(v as u8);
        Ok(())
    }

    pub fn write_u8(&mut self, key: &str, v: u8) -> Result<()> {
        self.start_scalar(Tag::Uint8, key)?;
        self.buf.push(v);
        Ok(())
    }

    pub fn write_i16(&mut self, key: &str, v: i16) -> Result<()> {
        self.start_scalar(Tag::Int16, key)?;
        self.push_fixed(2, |b| bytes::write_i16(b, v));
        Ok(())
    }

    pub fn write_u16(&mut self, key: &str, v: u16) -> Result<()> {
        self.start_scalar(Tag::Uint16, key)?;
        self.push_fixed(2, |b| bytes::write_u16(b, v));
        Ok(())
    }

    pub fn write_i32(&mut self, key: &str, v: i32) -> Result<()> {
        self.start_scalar(Tag::Int32, key)?;
        self.push_fixed(4, |b| bytes::write_i32(b, v));
        Ok(())
    }

    pub fn write_u32(&mut self, key: &str, v: u32) -> Result<()> {
        self.start_scalar(Tag::Uint32, key)?;
        self.push_fixed(4, |b| bytes::write_u32(b, v));
        Ok(())
    }

    pub fn write_i64(&mut self, key: &str, v: i64) -> Result<()> {
        self.start_scalar(Tag::Int64, key)?;
        self.push_fixed(8, |b| bytes::write_i64(b, v));
        Ok(())
    }

    pub fn write_u64(&mut self, key: &str, v: u64) -> Result<()> {
        self.start_scalar(Tag::Uint64, key)?;
        self.push_fixed(8, |b| bytes::write_u64(b, v));
        Ok(())
    }

    pub fn write_f32(&mut self, key: &str, v: f32) -> Result<()> {
        self.start_scalar(Tag::Float, key)?;
        self.push_fixed(4, |b| bytes::write_f32(b, v));
        Ok(())
    }

    pub fn write_f64(&mut self, key: &str, v: f64) -> Result<()> {
        self.start_scalar(Tag::Double, key)?;
        self.push_fixed(8, |b| bytes::write_f64(b, v));
        Ok(())
    }

    /// SHORT_STRING when `len(value) + 1 < 255`, STRING otherwise. Readers must accept either
    /// form; this encoder always prefers the shorter one.
    pub fn write_str(&mut self, key: &str, v: &str) -> Result<()> {
        let v_bytes = v.as_bytes();
        let len_with_nul = v_bytes.len() + 1;
        let klen = self.key_len_byte(key)?;
        if len_with_nul < tag::MAX_SHORT_VITEM_LEN {
            self.write_tag(Tag::ShortString);
            self.buf.push(klen);
            self.buf.push(len_with_nul as u8);
        } else {
            self.write_tag(Tag::String);
            self.buf.push(klen);
            self.push_fixed(4, |b| bytes::write_u32(b, len_with_nul as u32));
        }
        self.push_key_bytes(key);
        self.reserve_more(v_bytes.len() + 1);
        self.buf.extend_from_slice(v_bytes);
        self.buf.push(0);
        Ok(())
    }

    /// SHORT_BINARY when `len(value) < 255`, BINARY otherwise. Binary has no NUL terminator.
    pub fn write_binary(&mut self, key: &str, v: &[u8]) -> Result<()> {
        let klen = self.key_len_byte(key)?;
        if v.len() < tag::MAX_SHORT_VITEM_LEN {
            self.write_tag(Tag::ShortBinary);
            self.buf.push(klen);
            self.buf.push(v.len() as u8);
        } else {
            self.write_tag(Tag::Binary);
            self.buf.push(klen);
            self.push_fixed(4, |b| bytes::write_u32(b, v.len() as u32));
        }
        self.push_key_bytes(key);
        self.reserve_more(v.len());
        self.buf.extend_from_slice(v);
        Ok(())
    }

    /// Begin an OBJECT or ARRAY: `tag | keylen | contentLen(4, placeholder) | key? | count(4)`.
    /// `count` is the element/member count (written immediately, not patched): for a struct this
    /// is its field-descriptor count, for a sequence its length. [`Encoder::end_container`] patches
    /// the content-length placeholder once the children (and nothing else) have been appended.
    pub fn start_container(&mut self, t: Tag, key: &str, count: u32) -> Result<ContainerHandle> {
        debug_assert!(t.is_container());
        let klen = self.key_len_byte(key)?;
        self.write_tag(t);
        self.buf.push(klen);
        let len_offset = self.buf.len();
        self.push_fixed(4, |_| {});
        self.push_key_bytes(key);
        let content_begin = self.buf.len();
        self.push_fixed(4, |b| bytes::write_u32(b, count));
        Ok(ContainerHandle { len_offset, content_begin })
    }

    /// Patch the content-length field reserved by [`Encoder::start_container`]. The recorded
    /// length covers the member count plus all children, but not the container's own
    /// tag/keylen/length-field/key bytes.
    pub fn end_container(&mut self, handle: ContainerHandle) {
        let content_len = (self.buf.len() - handle.content_begin) as u32;
        bytes::write_u32(&mut self.buf[handle.len_offset..handle.len_offset + 4], content_len);
    }

    /// Append an already-encoded item's bytes verbatim — tag, keylen, length field, key and value
    /// all as captured — without re-deriving any of them. Backs
    /// [`RawCapture`](crate::decode::RawCapture): a value captured raw by the decoder is replayed
    /// unchanged by the encoder rather than re-interpreted.
    pub fn write_raw(&mut self, item: &[u8]) {
        self.reserve_more(item.len());
        self.buf.extend_from_slice(item);
    }
}
