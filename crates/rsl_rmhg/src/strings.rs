//! String table encoding and decoding.
//!
//! | Offset (bytes) | Field          | Description                                                |
//! |----------------|----------------|------------------------------------------------------------|
//! | 0x0000         | Count          | 4 bytes: number of strings                                 |
//! | 0x0004         | Pointer offset | 4 bytes: always 16, the offset of the offsets array        |
//! | 0x0008         | Flag           | 4 bytes: opaque, preserved                                 |
//! | 0x000C         | Padding        | 4 bytes                                                    |
//! | 0x0010         | Offsets        | Count * 4 bytes: offset of each string from the table start |
//! | ...            | Strings        | Null terminated strings, optionally XOR-ed with `0x8D`     |
//!
//! Only the first offset is used when decoding, the strings are read back to back from there.

use std::io::SeekFrom;

use tracing::{instrument, trace, warn};

use crate::cursor::{ByteCursor, ByteWriter};
use crate::error::{Error, Result};
use crate::tree::StringTable;
use crate::types::{StringTableHeader, STRING_POINTER_OFFSET};

/// Key every string blob byte is XOR-ed with when obfuscated.
pub const XOR_KEY: u8 = 0x8D;

/// Toggle the obfuscation of a string blob in place.
pub fn obfuscate(bytes: &mut [u8]) {
    bytes.iter_mut().for_each(|b| *b ^= XOR_KEY);
}

/// Serialize `strings` into a blob of null terminated strings, returning the blob and the offset
/// of each string inside it.
pub fn encode_strings(strings: &[String], obfuscated: bool) -> Result<(Vec<u8>, Vec<u32>)> {
    let mut blob = ByteWriter::default();
    let mut offsets = Vec::with_capacity(strings.len());

    for string in strings {
        offsets.push(blob.position() as u32);
        blob.write_cstring(string)?;
    }

    let mut blob = blob.into_inner();
    if obfuscated {
        obfuscate(&mut blob);
    }
    Ok((blob, offsets))
}

/// Read `count` consecutive null terminated strings from the start of `blob`.
pub fn decode_strings(blob: &[u8], count: u32, obfuscated: bool) -> Result<Vec<String>> {
    let mut blob = blob.to_vec();
    if obfuscated {
        obfuscate(&mut blob);
    }

    let mut cursor = ByteCursor::new(&blob);
    (0..count)
        .map(|_| {
            if cursor.remaining() == 0 {
                return Err(Error::UnexpectedEof {
                    offset: cursor.position(),
                    needed: 1,
                    available: 0,
                });
            }
            let raw = cursor.read_cstring()?;
            Ok(String::from_utf8_lossy(raw).into_owned())
        })
        .collect()
}

/// Decode the string table starting at the cursor's position.
///
/// The strings run from the first offset to the end of the buffer at most.
#[instrument(skip(cursor), fields(offset = cursor.position()), err(level = "debug"))]
pub fn read_string_table(cursor: &mut ByteCursor<'_>, obfuscated: bool) -> Result<StringTable> {
    let table_start = cursor.position();
    let header = cursor.read::<StringTableHeader>()?;

    if header.pointer_offset != STRING_POINTER_OFFSET {
        warn!(
            pointer_offset = header.pointer_offset,
            "unexpected string pointer offset"
        );
    }

    let Some(first) = header.offsets.first() else {
        return Ok(StringTable {
            flag: header.flag,
            strings: Vec::new(),
        });
    };

    let blob = cursor.scoped(SeekFrom::Start(table_start + *first as u64), |c| {
        c.read_bytes(c.remaining())
    })?;
    let strings = decode_strings(blob, header.count, obfuscated)?;
    trace!(count = strings.len(), "decoded strings");

    Ok(StringTable {
        flag: header.flag,
        strings,
    })
}

/// Encode a string table at the writer's position.
#[instrument(skip(writer, strings), fields(count = strings.len()), err)]
pub fn write_string_table(
    writer: &mut ByteWriter,
    flag: u32,
    strings: &[String],
    obfuscated: bool,
) -> Result<()> {
    let table_size = 4 * strings.len() as u32 + STRING_POINTER_OFFSET;
    let (blob, offsets) = encode_strings(strings, obfuscated)?;

    writer.write(&StringTableHeader {
        count: strings.len() as u32,
        pointer_offset: STRING_POINTER_OFFSET,
        flag,
        offsets: offsets.into_iter().map(|o| o + table_size).collect(),
    })?;
    writer.write_bytes(&blob)
}
