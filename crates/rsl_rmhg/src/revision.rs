//! Format revision policies.
//!
//! The container format exists in two revisions which disagree on how strings are obfuscated, how
//! a missing payload is signalled and how resource names are looked up. Every decision that
//! differs between them lives here so the reader and writer share a single control flow.

use serde::{Deserialize, Serialize};

use crate::tree::Magic;
use crate::types::EntryRecord;

/// Containers with a version above this obfuscate their string table in the current revision.
pub const OBFUSCATION_VERSION: u32 = 1040;

/// Identifies which revision of the container format is being read or written
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatRevision {
    /// Big endian capable revision with always-on string obfuscation and tri-state attributes
    Legacy,

    /// Little endian revision with version gated obfuscation and size based payload detection
    #[default]
    Current,
}

impl FormatRevision {
    /// The policy that applies to a container with the given magic.
    ///
    /// Big endian containers only exist in the legacy revision, so they always select it.
    pub fn for_magic(self, magic: Magic) -> FormatRevision {
        match magic {
            Magic::Ghmr => FormatRevision::Legacy,
            Magic::Rmhg => self,
        }
    }

    /// Whether a string table owned by a container of `version` is XOR obfuscated.
    pub fn obfuscates_strings(self, version: u32) -> bool {
        match self {
            FormatRevision::Legacy => true,
            FormatRevision::Current => version > OBFUSCATION_VERSION,
        }
    }

    /// Whether the entry points at payload bytes at all.
    pub fn has_payload(self, record: &EntryRecord) -> bool {
        match self {
            FormatRevision::Legacy => record.flags < 2,
            FormatRevision::Current => record.size != 0,
        }
    }

    /// Resolve an entry's name from the visible string list.
    pub fn resolve_name(self, resource_id: i32, strings: &[String]) -> Option<String> {
        let index = match self {
            FormatRevision::Legacy => resource_id as u32 as usize,
            FormatRevision::Current => usize::try_from(resource_id).ok()?,
        };
        strings.get(index).cloned()
    }

    /// Whether a payload starting with `magic` is decoded as a nested container, before any
    /// recursive extraction heuristics are considered.
    pub fn nests(self, magic: Magic, flags: u32) -> bool {
        match self {
            FormatRevision::Legacy => true,
            FormatRevision::Current => magic == Magic::Rmhg && flags > 0,
        }
    }
}
