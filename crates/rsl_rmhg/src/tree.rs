//! In-memory representation of a decoded container.
//!
//! The same tree is produced by [`crate::read::ContainerReader`], consumed by
//! [`crate::write::ContainerWriter`] and persisted as the editable JSON document between an
//! extract and a repack.

use std::borrow::Cow;

use binrw::Endian;
use serde::{Deserialize, Serialize};

/// Four byte tag opening every container
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Magic {
    /// Little endian container
    #[serde(rename = "RMHG")]
    Rmhg,

    /// Big endian container, legacy format only
    #[serde(rename = "GHMR")]
    Ghmr,
}

impl Magic {
    pub const RMHG: [u8; 4] = *b"RMHG";
    pub const GHMR: [u8; 4] = *b"GHMR";

    /// Recognize a container tag.
    pub fn from_bytes(bytes: &[u8]) -> Option<Magic> {
        match bytes {
            b"RMHG" => Some(Magic::Rmhg),
            b"GHMR" => Some(Magic::Ghmr),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> &'static [u8; 4] {
        match self {
            Magic::Rmhg => &Self::RMHG,
            Magic::Ghmr => &Self::GHMR,
        }
    }

    /// Byte order of every integer inside a container with this tag.
    pub fn endian(&self) -> Endian {
        match self {
            Magic::Rmhg => Endian::Little,
            Magic::Ghmr => Endian::Big,
        }
    }
}

/// Names declared by a container for itself and any nested container without its own table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringTable {
    /// Opaque value carried through unchanged
    pub flag: u32,

    /// Names, indexed by an entry's `resource_id`
    pub strings: Vec<String>,
}

/// One RMHG/GHMR block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub magic: Magic,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_table: Option<StringTable>,
    pub entries: Vec<Entry>,
}

impl Container {
    /// An empty little endian container without a string table.
    pub fn new(version: u32) -> Self {
        Self {
            magic: Magic::Rmhg,
            version,
            string_table: None,
            entries: Vec::new(),
        }
    }

    /// Number of entries directly inside this container.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Visit every entry of the tree depth first.
    ///
    /// Each item carries the file names of the enclosing container entries, outermost first.
    pub fn walk(&self) -> Vec<WalkItem<'_>> {
        let mut items = Vec::new();
        self.walk_into(&mut Vec::new(), &mut items);
        items
    }

    fn walk_into<'a>(&'a self, parents: &mut Vec<Cow<'a, str>>, items: &mut Vec<WalkItem<'a>>) {
        for (index, entry) in self.entries.iter().enumerate() {
            items.push(WalkItem {
                parents: parents.clone(),
                index,
                entry,
            });
            if let Payload::Container(child) = &entry.payload {
                parents.push(entry.file_name(index));
                child.walk_into(parents, items);
                parents.pop();
            }
        }
    }
}

impl<'a> IntoIterator for &'a Container {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An entry reached by [`Container::walk`]
#[derive(Debug, Clone)]
pub struct WalkItem<'a> {
    /// File names of the enclosing container entries, outermost first
    pub parents: Vec<Cow<'a, str>>,
    /// Position of the entry inside its container
    pub index: usize,
    pub entry: &'a Entry,
}

/// One resource slot of a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Attribute flags, see [`crate::types::EntryRecord::flags`]
    pub flags: u32,
    pub version: u32,
    pub resource_id: i32,
    /// Name resolved through the nearest enclosing string table
    pub name: Option<String>,
    pub payload: Payload,
}

impl Entry {
    /// Name used for the entry's payload on disk.
    ///
    /// Unnamed entries fall back to their position so extraction and repacking agree on the path.
    pub fn file_name(&self, index: usize) -> Cow<'_, str> {
        match &self.name {
            Some(name) if !name.is_empty() => Cow::Borrowed(name),
            _ => Cow::Owned(format!("resource_{index}")),
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.payload, Payload::Container(_))
    }
}

/// What an entry's payload region holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// Placeholder without any payload bytes
    NoFile,

    /// Opaque bytes copied verbatim
    File {
        /// Payload bytes, absent when the tree was loaded from a document and the bytes live in
        /// a payload file instead
        #[serde(skip)]
        data: Option<Vec<u8>>,
    },

    /// A nested container with its own offset origin
    Container(Box<Container>),
}
