//! This library handles reading and creating **RMHG** resource containers.
//!
//! # RMHG Container Format
//!
//! An RMHG container is a header, a table of fixed size entries, the payloads of those entries and
//! an optional string table naming them. A payload may itself be a complete container, in which
//! case every offset inside it is relative to its own header and not to the start of the file.
//!
//! ## Header
//!
//! | Offset (bytes) | Field               | Description                                              |
//! |----------------|---------------------|----------------------------------------------------------|
//! | 0x0000         | Magic number        | 4 bytes: "RMHG" little endian, "GHMR" big endian         |
//! | 0x0004         | Resource Count      | 4 bytes: Number of entries                               |
//! | 0x0008         | Attribute Offset    | 4 bytes: Offset of the entry table, always 32            |
//! | 0x000C         | Version             | 4 bytes: Container version, gates string obfuscation     |
//! | 0x0010         | String Table Offset | 4 bytes: Offset of the string table, 0 when there is none |
//! | 0x0014         | Padding             | 12 bytes                                                 |
//!
//! The byte order named by the magic applies to every integer of the container and of everything
//! nested in it.
//!
//! ## Entry
//!
//! | Offset (bytes) | Field          | Description                                               |
//! |----------------|----------------|-----------------------------------------------------------|
//! | 0x0000         | Payload Offset | 4 bytes: Offset of the payload from the owning header     |
//! | 0x0004         | Size           | 4 bytes: Payload size in bytes                            |
//! | 0x0008         | Flags          | 4 bytes: Non zero marks a nested container                |
//! | 0x000C         | Version        | 4 bytes: Opaque, preserved                                |
//! | 0x0010         | Resource Id    | 4 bytes: Signed index into the visible string table       |
//! | 0x0014         | Padding        | 12 bytes                                                  |
//!
//! - **Payload Offset** and **Size** are both zero for placeholder entries without data.
//! - **Resource Id** is `-1` for unnamed entries. A container without a string table of its own
//!   resolves names against the table of its closest ancestor that has one.
//!
//! ## String Table
//!
//! See [`strings`] for the layout. The strings are XOR-ed with `0x8D` depending on the container
//! version and the [`FormatRevision`].
//!
//! # Example
//!
//! ```no_run
//! use rsl_rmhg::{Container, ReadOptions, WriteOptions, InMemory};
//!
//! fn round_trip(data: &[u8]) -> rsl_rmhg::error::Result<Vec<u8>> {
//!     let container = Container::from_bytes(data, ReadOptions::default())?;
//!     container.to_bytes(WriteOptions::default(), &mut InMemory)
//! }
//! ```

pub mod cursor;
pub mod error;
pub mod layout;
pub mod read;
pub mod revision;
pub mod strings;
pub mod tree;
pub mod types;
pub mod write;

pub use read::{ContainerReader, ReadOptions};
pub use revision::FormatRevision;
pub use tree::{Container, Entry, Magic, Payload, StringTable, WalkItem};
pub use write::{ContainerWriter, InMemory, PayloadSource, WriteOptions};
