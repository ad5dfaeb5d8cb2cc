//! Fixed layout records of an RMHG container.
//!
//! None of these carry an endianness attribute, the byte order is chosen at runtime from the
//! container magic and supplied by [`crate::cursor::ByteCursor::read`] and
//! [`crate::cursor::ByteWriter::write`].

use binrw::{BinRead, BinWrite};

/// Size of the container header on disk, including the magic.
pub const HEADER_SIZE: u32 = 32;

/// Stride of one entry record.
pub const ENTRY_SIZE: u32 = 32;

/// Deepest chain of nested containers accepted when decoding or encoding.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Value of the string table's pointer-to-pointers field, the offset of the offsets array.
pub const STRING_POINTER_OFFSET: u32 = 16;

/// Container header following the four byte magic
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    /// The number of entries in the entry table
    pub resource_count: u32,

    /// Offset of the entry table from the start of the container
    pub attribute_offset: u32,

    /// Container version, decides string obfuscation for the current format
    pub version: u32,

    /// Offset of the string table from the start of the container, zero when absent
    #[brw(pad_after = 12)]
    pub string_table_offset: u32,
}

/// One record of the entry table
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct EntryRecord {
    /// Offset of the payload from the start of the owning container
    pub payload_offset: u32,

    /// Payload length in bytes
    pub size: u32,

    /// Attribute flags, in the legacy format 0 (file), 1 (attribute) or 2 (disabled)
    pub flags: u32,

    /// Per-entry version tag
    pub version: u32,

    /// Index into the visible string table, -1 for no name
    #[brw(pad_after = 12)]
    pub resource_id: i32,
}

/// String table header and its per-string offsets
#[derive(BinRead, BinWrite, Debug, Default, Clone, PartialEq, Eq)]
pub struct StringTableHeader {
    /// The number of strings
    pub count: u32,

    /// Offset of the offsets array, always [`STRING_POINTER_OFFSET`]
    pub pointer_offset: u32,

    /// Opaque value preserved across decode and encode
    #[brw(pad_after = 4)]
    pub flag: u32,

    /// Offset of each string from the start of the table
    #[br(count = count)]
    pub offsets: Vec<u32>,
}
