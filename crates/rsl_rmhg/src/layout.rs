//! Extraction of a container tree to a directory and the way back.
//!
//! An extracted container is a directory holding one file per opaque entry, one sub-directory per
//! nested container and the tree itself as [`DOCUMENT_NAME`]. The document can be edited before
//! repacking, payload files are looked up again by the same path they were extracted to.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::read::ReadOptions;
use crate::revision::FormatRevision;
use crate::tree::{Container, Payload};
use crate::write::{PayloadSource, WriteOptions};

/// File name of the tree document inside an extraction directory
pub const DOCUMENT_NAME: &str = "rsl_data.json";

/// Extension used for repacked files when the input had none
pub const DEFAULT_EXTENSION: &str = "rsl";

/// Join names below `root`, keeping only plain path components.
///
/// Names come from the archive and may contain separators, `..` or absolute paths, none of which
/// may lead outside of `root`.
pub fn entry_path<S: AsRef<str>>(root: &Path, parents: &[S], file_name: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for name in parents.iter().map(AsRef::as_ref).chain([file_name]) {
        for component in Path::new(name).components() {
            if let Component::Normal(part) = component {
                path.push(part);
            }
        }
    }
    path
}

/// Outcome of writing the payloads of a tree to disk
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractReport {
    /// Payload files written
    pub files: usize,
    /// Payload files that could not be written
    pub failed: usize,
}

/// Write every in-memory payload of `container` below `dir`.
///
/// A payload that cannot be written is logged and counted, the remaining ones are still written.
/// Entries resolving to the same path overwrite each other, the last one wins.
#[instrument(skip_all, fields(dir = %dir.display()), err)]
pub fn extract(container: &Container, dir: &Path) -> Result<ExtractReport> {
    fs::create_dir_all(dir)?;

    let document = dir.join(DOCUMENT_NAME);
    let mut written_paths = HashSet::new();

    let mut report = ExtractReport::default();
    for item in container.walk() {
        let Payload::File { data: Some(data) } = &item.entry.payload else {
            continue;
        };

        let path = entry_path(dir, &item.parents, &item.entry.file_name(item.index));
        if path == document {
            warn!(path = %path.display(), "payload is replaced by the document");
        } else if !written_paths.insert(path.clone()) {
            warn!(path = %path.display(), "payload overwrites an earlier entry");
        }

        let written = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::write(&path, data));

        match written {
            Ok(()) => report.files += 1,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unable to write payload");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

/// The editable document of an extraction directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Revision the tree was decoded with, repacking uses it unless told otherwise
    #[serde(default)]
    pub revision: FormatRevision,

    #[serde(flatten)]
    pub container: Container,
}

/// Persist the document of an extraction directory.
pub fn write_document(document: &Document, dir: &Path) -> Result<()> {
    let file = File::create(dir.join(DOCUMENT_NAME))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, document)?;
    writer.flush()?;
    Ok(())
}

/// Load the document of an extraction directory.
pub fn read_document(dir: &Path) -> Result<Document> {
    let path = dir.join(DOCUMENT_NAME);
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::DocumentNotFound(path)),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Loads file payloads from an extraction directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PayloadSource for DirectorySource {
    fn load(&mut self, parents: &[String], file_name: &str) -> Result<Vec<u8>> {
        let path = entry_path(&self.root, parents, file_name);
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::PayloadNotFound(path)),
            Err(e) => Err(e.into()),
        }
    }
}

/// Directory an input file is extracted to, the input path without its extension.
pub fn extraction_dir(input: &Path) -> PathBuf {
    input.with_extension("")
}

/// File an extraction directory is repacked into, `dir` with `extension` appended.
pub fn repack_path(dir: &Path, extension: &str) -> PathBuf {
    let mut path = dir.as_os_str().to_owned();
    path.push(".");
    path.push(extension.trim_start_matches('.'));
    PathBuf::from(path)
}

/// Decode `input` and extract it next to itself.
///
/// When `options` names no extension the input's own extension is used for recursive extraction.
#[instrument(skip_all, fields(input = %input.display()), err)]
pub fn unpack(input: &Path, options: ReadOptions) -> Result<(Container, ExtractReport)> {
    let data = fs::read(input)?;

    let revision = options.revision;
    let options = ReadOptions {
        extension: options.extension.or_else(|| {
            input
                .extension()
                .map(|extension| extension.to_string_lossy().into_owned())
        }),
        ..options
    };
    let container = Container::from_bytes(&data, options)?;

    let dir = extraction_dir(input);
    let report = extract(&container, &dir)?;
    let document = Document {
        revision,
        container,
    };
    write_document(&document, &dir)?;
    info!(files = report.files, failed = report.failed, "unpacked");

    Ok((document.container, report))
}

/// Encode the extraction directory `dir` back into `output`.
///
/// Without an explicit `revision` the one recorded in the document is used. An existing `output`
/// is only replaced when `overwrite` is set.
#[instrument(skip_all, fields(dir = %dir.display(), output = %output.display()), err)]
pub fn repack(
    dir: &Path,
    output: &Path,
    revision: Option<FormatRevision>,
    overwrite: bool,
) -> Result<()> {
    let document = read_document(dir)?;
    let revision = revision.unwrap_or(document.revision);
    debug!(?revision, "encoding");

    let options = WriteOptions::builder().revision(revision).build();
    let data = document
        .container
        .to_bytes(options, &mut DirectorySource::new(dir))?;

    let mut out = if overwrite {
        File::create(output)?
    } else {
        File::create_new(output)?
    };
    out.write_all(&data)?;
    info!("repacked");
    Ok(())
}
