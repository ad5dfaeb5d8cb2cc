//! Types for reading RMHG containers
//!

use std::io::SeekFrom;

use bon::Builder;
use tracing::{debug, instrument, trace, warn};

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::revision::FormatRevision;
use crate::strings::read_string_table;
use crate::tree::{Container, Entry, Magic, Payload};
use crate::types::{ContainerHeader, EntryRecord, HEADER_SIZE, MAX_NESTING_DEPTH};

/// Options for how a container should be decoded
#[derive(Debug, Clone, Default, Builder)]
pub struct ReadOptions {
    /// The format revision of little endian containers, big endian ones are always legacy
    #[builder(default)]
    pub revision: FormatRevision,

    /// Decode plain file entries that are themselves containers, see [`ReadOptions::extension`]
    #[builder(default)]
    pub recursive: bool,

    /// File extension of the outer container, e.g. `rsl`.
    ///
    /// With [`ReadOptions::recursive`] set, a file entry whose name ends in this extension is
    /// decoded as a nested container when its payload parses as one.
    #[builder(into)]
    pub extension: Option<String>,
}

impl ReadOptions {
    fn matches_extension(&self, name: &str) -> bool {
        let Some(extension) = &self.extension else {
            return false;
        };
        let suffix = format!(".{}", extension.trim_start_matches('.')).to_lowercase();
        name.to_lowercase().ends_with(&suffix)
    }
}

/// RMHG container reader
///
/// ```no_run
/// fn list_entries(data: &[u8]) -> rsl_rmhg::error::Result<()> {
///     let container = rsl_rmhg::ContainerReader::new(data, Default::default()).read()?;
///
///     for item in container.walk() {
///         println!("{:?}/{}", item.parents, item.entry.file_name(item.index));
///     }
///
///     Ok(())
/// }
/// ```
pub struct ContainerReader<'a> {
    cursor: ByteCursor<'a>,
    options: ReadOptions,
}

impl<'a> ContainerReader<'a> {
    pub fn new(data: &'a [u8], options: ReadOptions) -> Self {
        Self {
            cursor: ByteCursor::new(data),
            options,
        }
    }

    /// Decode the container starting at the beginning of the buffer.
    pub fn read(mut self) -> Result<Container> {
        read_container(
            &mut self.cursor,
            &self.options,
            &[],
            self.options.revision,
            0,
        )
    }
}

impl Container {
    /// Decode a container from a complete buffer.
    pub fn from_bytes(data: &[u8], options: ReadOptions) -> Result<Container> {
        ContainerReader::new(data, options).read()
    }
}

/// Decode the container whose magic starts at the cursor.
///
/// `inherited` is the string list visible from the enclosing container, used when this one does
/// not declare a table of its own. `depth` counts the containers enclosing this one.
#[instrument(
    skip(cursor, options, inherited),
    fields(offset = cursor.position()),
    err(level = "debug")
)]
fn read_container(
    cursor: &mut ByteCursor<'_>,
    options: &ReadOptions,
    inherited: &[String],
    revision: FormatRevision,
    depth: usize,
) -> Result<Container> {
    if depth > MAX_NESTING_DEPTH {
        return Err(Error::NestingTooDeep(MAX_NESTING_DEPTH));
    }
    let header_start = cursor.position();

    let tag = cursor.read_bytes(4)?;
    let magic = Magic::from_bytes(tag).ok_or_else(|| {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(tag);
        Error::InvalidMagic(bytes)
    })?;
    if magic == Magic::Ghmr {
        cursor.set_endian(magic.endian());
    }
    let revision = revision.for_magic(magic);

    let header = cursor.read::<ContainerHeader>()?;
    debug!(?magic, ?revision, ?header, "container header");

    let string_table = if header.string_table_offset > 0 {
        let obfuscated = revision.obfuscates_strings(header.version);
        Some(cursor.scoped(
            SeekFrom::Start(header_start + header.string_table_offset as u64),
            |c| read_string_table(c, obfuscated),
        )?)
    } else {
        None
    };
    let strings = string_table
        .as_ref()
        .map_or(inherited, |table| table.strings.as_slice());

    cursor.seek(SeekFrom::Start(header_start + header.attribute_offset as u64))?;
    let entries = (0..header.resource_count)
        .map(|_| read_entry(cursor, options, header_start, strings, revision, depth))
        .collect::<Result<Vec<_>>>()?;

    Ok(Container {
        magic,
        version: header.version,
        string_table,
        entries,
    })
}

fn read_entry(
    cursor: &mut ByteCursor<'_>,
    options: &ReadOptions,
    header_start: u64,
    strings: &[String],
    revision: FormatRevision,
    depth: usize,
) -> Result<Entry> {
    let record = cursor.read::<EntryRecord>()?;
    let name = revision.resolve_name(record.resource_id, strings);
    trace!(?record, ?name, "entry");

    let payload = if revision.has_payload(&record) {
        read_payload(
            cursor,
            options,
            header_start,
            &record,
            name.as_deref(),
            strings,
            revision,
            depth,
        )?
    } else {
        Payload::NoFile
    };

    Ok(Entry {
        flags: record.flags,
        version: record.version,
        resource_id: record.resource_id,
        name,
        payload,
    })
}

#[allow(clippy::too_many_arguments)]
fn read_payload(
    cursor: &mut ByteCursor<'_>,
    options: &ReadOptions,
    header_start: u64,
    record: &EntryRecord,
    name: Option<&str>,
    strings: &[String],
    revision: FormatRevision,
    depth: usize,
) -> Result<Payload> {
    let start = header_start + record.payload_offset as u64;
    let end = start + record.size as u64;
    if end > cursor.len() as u64 {
        return Err(Error::PayloadOutOfBounds {
            offset: start,
            size: record.size,
            len: cursor.len(),
        });
    }

    // a nested container always starts past its parent's header, which also rules out cycles
    let can_nest = record.payload_offset > 0 && record.size >= HEADER_SIZE;

    if let Some(magic) = can_nest.then(|| peek_magic(cursor, start)).flatten() {
        if revision.nests(magic, record.flags) {
            let container = read_nested(cursor, options, start, strings, revision, depth + 1)?;
            return Ok(Payload::Container(Box::new(container)));
        }
    }

    if can_nest
        && options.recursive
        && record.flags == 0
        && name.is_some_and(|n| options.matches_extension(n))
    {
        match read_nested(cursor, options, start, strings, revision, depth + 1) {
            Ok(container) => {
                debug!(?name, "decoded file entry as a nested container");
                return Ok(Payload::Container(Box::new(container)));
            }
            Err(e) => warn!(?name, error = %e, "not a container, keeping the file as is"),
        }
    }

    let data = &cursor.get_ref()[start as usize..end as usize];
    Ok(Payload::File {
        data: Some(data.to_vec()),
    })
}

fn read_nested(
    cursor: &mut ByteCursor<'_>,
    options: &ReadOptions,
    start: u64,
    strings: &[String],
    revision: FormatRevision,
    depth: usize,
) -> Result<Container> {
    cursor.scoped(SeekFrom::Start(start), |c| {
        read_container(c, options, strings, revision, depth)
    })
}

/// Read the four bytes at `offset` as a container tag.
///
/// Anything that is not a readable tag is treated as an opaque payload.
fn peek_magic(cursor: &mut ByteCursor<'_>, offset: u64) -> Option<Magic> {
    match cursor.scoped(SeekFrom::Start(offset), |c| c.read_fixed_str(4)) {
        Ok(tag) => Magic::from_bytes(tag.as_bytes()),
        Err(e) => {
            trace!(offset, error = %e, "payload has no readable magic");
            None
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::error::{Error, Result};
    use crate::read::{ContainerReader, ReadOptions};
    use crate::revision::FormatRevision;
    use crate::tree::{Container, Entry, Magic, Payload};
    use crate::types::MAX_NESTING_DEPTH;
    use crate::write::{InMemory, WriteOptions};

    #[rustfmt::skip]
    fn single_file_container() -> Vec<u8> {
        let mut data = vec![
            // Header
            b'R', b'M', b'H', b'G',
            0x01, 0x00, 0x00, 0x00,
            0x20, 0x00, 0x00, 0x00,
            0x11, 0x04, 0x00, 0x00,
            0x44, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            // Entry
            0x40, 0x00, 0x00, 0x00,
            0x04, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            // Payload
            0xDE, 0xAD, 0xBE, 0xEF,
            // String table
            0x01, 0x00, 0x00, 0x00,
            0x10, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x14, 0x00, 0x00, 0x00,
        ];
        data.extend(b"a.bin\0".iter().map(|b| b ^ 0x8D));
        data
    }

    #[traced_test]
    #[test]
    fn read_single_file() -> Result<()> {
        let data = single_file_container();
        let container = ContainerReader::new(&data, ReadOptions::default()).read()?;

        assert_eq!(container.magic, Magic::Rmhg);
        assert_eq!(container.version, 1041);
        assert_eq!(container.len(), 1);

        let table = container.string_table.as_ref().expect("string table");
        assert_eq!(table.flag, 0);
        assert_eq!(table.strings, vec!["a.bin".to_string()]);

        let entry = &container.entries[0];
        assert_eq!(entry.version, 2);
        assert_eq!(entry.resource_id, 0);
        assert_eq!(entry.name.as_deref(), Some("a.bin"));
        assert_eq!(
            entry.payload,
            Payload::File {
                data: Some(vec![0xDE, 0xAD, 0xBE, 0xEF])
            }
        );

        Ok(())
    }

    #[test]
    fn read_invalid_magic() {
        let mut data = single_file_container();
        data[0] = b'X';

        match Container::from_bytes(&data, ReadOptions::default()) {
            Err(Error::InvalidMagic(tag)) => assert_eq!(&tag, b"XMHG"),
            other => panic!("expected invalid magic, got {other:?}"),
        }
    }

    #[test]
    fn read_truncated_header() {
        let data = single_file_container();
        assert!(Container::from_bytes(&data[..20], ReadOptions::default()).is_err());
    }

    #[test]
    fn read_payload_out_of_bounds() {
        let mut data = single_file_container();
        // size of the first entry
        data[36] = 0xFF;

        assert!(matches!(
            Container::from_bytes(&data, ReadOptions::default()),
            Err(Error::PayloadOutOfBounds { size: 0xFF, .. })
        ));
    }

    #[test]
    fn read_with_wrong_version_garbles_names() -> Result<()> {
        let mut data = single_file_container();
        // version 1040 stops the current revision from undoing the obfuscation
        data[12] = 0x10;

        let container = Container::from_bytes(&data, ReadOptions::default())?;
        assert_ne!(container.entries[0].name.as_deref(), Some("a.bin"));

        let legacy = Container::from_bytes(
            &data,
            ReadOptions::builder()
                .revision(FormatRevision::Legacy)
                .build(),
        )?;
        assert_eq!(legacy.entries[0].name.as_deref(), Some("a.bin"));

        Ok(())
    }

    #[test]
    fn read_placeholder_entry() -> Result<()> {
        let mut data = single_file_container();
        // zero size
        data[36] = 0x00;

        let container = Container::from_bytes(&data, ReadOptions::default())?;
        assert_eq!(container.entries[0].payload, Payload::NoFile);

        Ok(())
    }

    /// `levels` containers of 64 bytes, each holding the next one as its only entry.
    fn nested_chain(levels: usize) -> Vec<u8> {
        let total = levels * 64;
        let mut data = Vec::with_capacity(total);

        for level in 0..levels {
            let last = level + 1 == levels;

            data.extend(b"RMHG");
            data.extend(u32::from(!last).to_le_bytes());
            data.extend(32u32.to_le_bytes());
            data.extend(1041u32.to_le_bytes());
            data.extend([0u8; 16]);

            if last {
                data.extend([0u8; 32]);
            } else {
                data.extend(64u32.to_le_bytes());
                data.extend(((total - 64 * (level + 1)) as u32).to_le_bytes());
                data.extend(1u32.to_le_bytes());
                data.extend(0u32.to_le_bytes());
                data.extend((-1i32).to_le_bytes());
                data.extend([0u8; 12]);
            }
        }
        data
    }

    #[test]
    fn read_nested_chain() -> Result<()> {
        let container = Container::from_bytes(&nested_chain(8), ReadOptions::default())?;
        assert_eq!(container.walk().len(), 7);

        let deepest = nested_chain(MAX_NESTING_DEPTH + 1);
        assert!(Container::from_bytes(&deepest, ReadOptions::default()).is_ok());

        Ok(())
    }

    #[traced_test]
    #[test]
    fn read_too_deeply_nested_fails() {
        let data = nested_chain(MAX_NESTING_DEPTH + 2);

        assert!(matches!(
            Container::from_bytes(&data, ReadOptions::default()),
            Err(Error::NestingTooDeep(MAX_NESTING_DEPTH))
        ));
    }

    #[test]
    fn non_text_payload_stays_opaque() -> Result<()> {
        let mut payload = vec![0xFF, 0xFE, 0x00, 0x00];
        payload.extend([0xAB; 36]);

        let mut container = Container::new(1041);
        container.entries.push(Entry {
            flags: 1,
            version: 0,
            resource_id: -1,
            name: None,
            payload: Payload::File {
                data: Some(payload.clone()),
            },
        });
        let data = container.to_bytes(WriteOptions::default(), &mut InMemory)?;

        for revision in [FormatRevision::Current, FormatRevision::Legacy] {
            let options = ReadOptions::builder().revision(revision).build();
            let decoded = Container::from_bytes(&data, options)?;
            assert_eq!(
                decoded.entries[0].payload,
                Payload::File {
                    data: Some(payload.clone())
                }
            );
        }

        Ok(())
    }

    #[test]
    fn extension_matching_is_case_insensitive() {
        let options = ReadOptions::builder()
            .recursive(true)
            .extension(".rsl")
            .build();

        assert!(options.matches_extension("inner.RSL"));
        assert!(!options.matches_extension("inner.rsl.png"));
        assert!(!ReadOptions::default().matches_extension("inner.rsl"));
    }
}
