//! MCPACKv2 type tags. For internal use only.

use crate::error::{Error, Result};

/// Wire width of an item's variable-length prefix, and how to compute its total on-wire size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// OBJECT/ARRAY/STRING/BINARY: a 4-byte length, followed by that many payload bytes.
    LongVarLen,
    /// SHORT_STRING/SHORT_BINARY: a 1-byte length, followed by that many payload bytes.
    ShortVarLen,
    /// A scalar of fixed width (in bytes), no length prefix at all.
    Fixed(usize),
}

/// A single-byte MCPACKv2 type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Object,
    Array,
    String,
    ShortString,
    Binary,
    ShortBinary,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Bool,
    Float,
    Double,
    Null,
}

pub const OBJECT: u8 = 0x10;
pub const ARRAY: u8 = 0x20;
pub const STRING: u8 = 0x50;
pub const SHORT_STRING: u8 = 0xD0;
pub const BINARY: u8 = 0x60;
pub const SHORT_BINARY: u8 = 0xE0;
pub const INT8: u8 = 0x11;
pub const INT16: u8 = 0x12;
pub const INT32: u8 = 0x14;
pub const INT64: u8 = 0x18;
pub const UINT8: u8 = 0x21;
pub const UINT16: u8 = 0x22;
pub const UINT32: u8 = 0x24;
pub const UINT64: u8 = 0x28;
pub const BOOL: u8 = 0x31;
pub const FLOAT: u8 = 0x44;
pub const DOUBLE: u8 = 0x48;
pub const NULL: u8 = 0x61;

/// Reserved but never produced or consumed by this implementation.
pub const DATE: u8 = 0x58;

/// Maximum short-form content length (value length, including any trailing terminator).
pub const MAX_SHORT_VITEM_LEN: usize = 255;

/// Maximum key length on the wire, including its trailing 0x00 terminator.
pub const MCPACKV2_KEY_MAX_LEN: usize = 255;

impl Tag {
    pub fn from_u8(n: u8) -> Result<Tag> {
        Ok(match n {
            OBJECT => Tag::Object,
            ARRAY => Tag::Array,
            STRING => Tag::String,
            SHORT_STRING => Tag::ShortString,
            BINARY => Tag::Binary,
            SHORT_BINARY => Tag::ShortBinary,
            INT8 => Tag::Int8,
            INT16 => Tag::Int16,
            INT32 => Tag::Int32,
            INT64 => Tag::Int64,
            UINT8 => Tag::Uint8,
            UINT16 => Tag::Uint16,
            UINT32 => Tag::Uint32,
            UINT64 => Tag::Uint64,
            BOOL => Tag::Bool,
            FLOAT => Tag::Float,
            DOUBLE => Tag::Double,
            NULL => Tag::Null,
            other => return Err(Error::UnsupportedTag(other)),
        })
    }

    pub fn into_u8(self) -> u8 {
        match self {
            Tag::Object => OBJECT,
            Tag::Array => ARRAY,
            Tag::String => STRING,
            Tag::ShortString => SHORT_STRING,
            Tag::Binary => BINARY,
            Tag::ShortBinary => SHORT_BINARY,
            Tag::Int8 => INT8,
            Tag::Int16 => INT16,
            Tag::Int32 => INT32,
            Tag::Int64 => INT64,
            Tag::Uint8 => UINT8,
            Tag::Uint16 => UINT16,
            Tag::Uint32 => UINT32,
            Tag::Uint64 => UINT64,
            Tag::Bool => BOOL,
            Tag::Float => FLOAT,
            Tag::Double => DOUBLE,
            Tag::Null => NULL,
        }
    }

    /// Is this tag a container (OBJECT/ARRAY)?
    pub fn is_container(self) -> bool {
        matches!(self, Tag::Object | Tag::Array)
    }

    /// The layout used by the skip table (§4.D) to compute an item's total size, and by the key
    /// lookup to find where the key bytes start.
    pub fn layout(self) -> Layout {
        match self {
            Tag::Object | Tag::Array | Tag::String | Tag::Binary => Layout::LongVarLen,
            Tag::ShortString | Tag::ShortBinary => Layout::ShortVarLen,
            Tag::Int8 | Tag::Uint8 | Tag::Bool | Tag::Null => Layout::Fixed(1),
            Tag::Int16 | Tag::Uint16 => Layout::Fixed(2),
            Tag::Int32 | Tag::Uint32 | Tag::Float => Layout::Fixed(4),
            Tag::Int64 | Tag::Uint64 | Tag::Double => Layout::Fixed(8),
        }
    }

    /// Offset of the key's first byte from the start of the item (tag byte included), per the
    /// skip table's key-start column.
    pub fn key_start(self) -> usize {
        match self.layout() {
            Layout::Fixed(_) => 2,
            Layout::ShortVarLen => 3,
            Layout::LongVarLen => 6,
        }
    }
}

impl From<u8> for Tag {
    fn from(val: u8) -> Tag {
        // Only used where the caller has already validated the byte via `Tag::from_u8`.
        Tag::from_u8(val).expect("invalid tag byte")
    }
}

impl From<Tag> for u8 {
    fn from(val: Tag) -> u8 {
        val.into_u8()
    }
}
