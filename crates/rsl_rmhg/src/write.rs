//! Types for writing RMHG containers
//!
//! A container is laid out as its 32 byte header, the entry table, the payloads of every entry in
//! order and finally its string table. Entries are encoded first so the string table offset is
//! known by the time it is written.

use std::io::Write;
use std::path::PathBuf;

use binrw::Endian;
use bon::Builder;
use tracing::{debug, instrument, trace};

use crate::cursor::ByteWriter;
use crate::error::{Error, Result};
use crate::revision::FormatRevision;
use crate::strings::write_string_table;
use crate::tree::{Container, Magic, Payload};
use crate::types::{ContainerHeader, EntryRecord, ENTRY_SIZE, HEADER_SIZE, MAX_NESTING_DEPTH};

/// Position of the string table offset inside a container header
const STRING_TABLE_OFFSET_FIELD: u64 = 16;

/// Options for how a container should be encoded
#[derive(Debug, Clone, Copy, Default, Builder)]
pub struct WriteOptions {
    /// The format revision of little endian containers, big endian ones are always legacy
    #[builder(default)]
    pub revision: FormatRevision,
}

/// Supplies the bytes of file entries whose payload is not held in the tree
pub trait PayloadSource {
    /// Load the payload of the entry named `file_name`, nested below the container entries named
    /// in `parents` (outermost first).
    fn load(&mut self, parents: &[String], file_name: &str) -> Result<Vec<u8>>;
}

/// A source without any payloads, for trees that carry all of their bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct InMemory;

impl PayloadSource for InMemory {
    fn load(&mut self, parents: &[String], file_name: &str) -> Result<Vec<u8>> {
        let path: PathBuf = parents.iter().map(String::as_str).chain([file_name]).collect();
        Err(Error::PayloadNotFound(path))
    }
}

/// RMHG container generator
///
/// ```
/// # fn doit() -> rsl_rmhg::error::Result<()>
/// # {
/// use rsl_rmhg::tree::{Container, Entry, Payload, StringTable};
/// use rsl_rmhg::write::{ContainerWriter, InMemory, WriteOptions};
///
/// let mut container = Container::new(1041);
/// container.string_table = Some(StringTable { flag: 0, strings: vec!["hello.txt".into()] });
/// container.entries.push(Entry {
///     flags: 0,
///     version: 0,
///     resource_id: 0,
///     name: Some("hello.txt".into()),
///     payload: Payload::File { data: Some(b"Hello, World!".to_vec()) },
/// });
///
/// let writer = ContainerWriter::new(Vec::new(), WriteOptions::default());
/// let bytes = writer.write(&container, &mut InMemory)?;
/// assert_eq!(&bytes[..4], b"RMHG");
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct ContainerWriter<W: Write> {
    inner: W,
    options: WriteOptions,
}

impl<W: Write> ContainerWriter<W> {
    pub fn new(inner: W, options: WriteOptions) -> ContainerWriter<W> {
        ContainerWriter { inner, options }
    }

    /// Encode `container` into the inner writer and return it.
    ///
    /// File entries without bytes in the tree are loaded from `source`.
    #[instrument(skip_all, err)]
    pub fn write<S: PayloadSource>(mut self, container: &Container, source: &mut S) -> Result<W> {
        let encoded = encode_container(
            container,
            source,
            &mut Vec::new(),
            Endian::Little,
            self.options.revision,
        )?;
        self.inner.write_all(&encoded.into_inner())?;
        Ok(self.inner)
    }
}

impl Container {
    /// Encode a container into a new buffer.
    pub fn to_bytes<S: PayloadSource>(
        &self,
        options: WriteOptions,
        source: &mut S,
    ) -> Result<Vec<u8>> {
        ContainerWriter::new(Vec::new(), options).write(self, source)
    }
}

#[instrument(
    skip(container, source, parents),
    fields(entries = container.len()),
    err(level = "debug")
)]
fn encode_container<S: PayloadSource>(
    container: &Container,
    source: &mut S,
    parents: &mut Vec<String>,
    endian: Endian,
    revision: FormatRevision,
) -> Result<ByteWriter> {
    // parents holds one name per enclosing container
    if parents.len() > MAX_NESTING_DEPTH {
        return Err(Error::NestingTooDeep(MAX_NESTING_DEPTH));
    }
    let endian = match container.magic {
        Magic::Ghmr => Endian::Big,
        Magic::Rmhg => endian,
    };
    let revision = revision.for_magic(container.magic);

    let mut writer = ByteWriter::new(endian);
    writer.write_bytes(container.magic.as_bytes())?;
    writer.write(&ContainerHeader {
        resource_count: container.len() as u32,
        attribute_offset: HEADER_SIZE,
        version: container.version,
        string_table_offset: 0,
    })?;

    let header_end = HEADER_SIZE + container.len() as u32 * ENTRY_SIZE;
    let mut payloads = ByteWriter::new(endian);

    for (index, entry) in container.entries.iter().enumerate() {
        let record_start = writer.position();
        let payload_start = payloads.position();
        let payload_offset = match entry.payload {
            Payload::NoFile => 0,
            _ => payload_start as u32 + header_end,
        };

        writer.write(&EntryRecord {
            payload_offset,
            size: 0,
            flags: entry.flags,
            version: entry.version,
            resource_id: entry.resource_id,
        })?;

        match &entry.payload {
            Payload::NoFile => continue,
            Payload::File { data: Some(data) } => payloads.write_bytes(data)?,
            Payload::File { data: None } => {
                let file_name = entry.file_name(index);
                let data = source.load(parents, &file_name)?;
                trace!(%file_name, size = data.len(), "loaded payload");
                payloads.write_bytes(&data)?;
            }
            Payload::Container(child) => {
                parents.push(entry.file_name(index).into_owned());
                let nested = encode_container(child, source, parents, endian, revision);
                parents.pop();
                payloads.extend(nested?)?;
            }
        }

        let size = (payloads.position() - payload_start) as u32;
        writer.patch_u32(record_start + 4, size)?;
    }

    writer.extend(payloads)?;

    if let Some(table) = &container.string_table {
        let table_offset = writer.position() as u32;
        writer.patch_u32(STRING_TABLE_OFFSET_FIELD, table_offset)?;

        let strings = scoped_strings(container, &table.strings);
        debug!(table_offset, count = strings.len(), "writing string table");
        write_string_table(
            &mut writer,
            table.flag,
            &strings,
            revision.obfuscates_strings(container.version),
        )?;
    }

    Ok(writer)
}

/// The string list a container with its own table writes.
///
/// Entry names are the source of truth, so every named entry in the table's scope (this
/// container and nested ones without a table of their own) overwrites the string at its id.
fn scoped_strings(container: &Container, declared: &[String]) -> Vec<String> {
    let mut strings = declared.to_vec();
    apply_names(container, &mut strings);
    strings
}

fn apply_names(container: &Container, strings: &mut Vec<String>) {
    for entry in &container.entries {
        if let (Some(name), Ok(index)) = (&entry.name, usize::try_from(entry.resource_id)) {
            if index >= strings.len() {
                strings.resize(index + 1, String::new());
            }
            strings[index].clone_from(name);
        }

        if let Payload::Container(child) = &entry.payload {
            if child.string_table.is_none() {
                apply_names(child, strings);
            }
        }
    }
}
