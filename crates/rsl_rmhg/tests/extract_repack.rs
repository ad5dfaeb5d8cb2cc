use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use miette::{IntoDiagnostic, Result};
use pretty_assertions::assert_eq;
use rsl_rmhg::{
    error::Error,
    layout::{self, ExtractReport, DOCUMENT_NAME},
    Container, Entry, FormatRevision, InMemory, Payload, ReadOptions, StringTable, WriteOptions,
};
use tracing_test::traced_test;
use walkdir::WalkDir;

fn file(resource_id: i32, name: Option<&str>, data: &[u8]) -> Entry {
    Entry {
        flags: 0,
        version: 0,
        resource_id,
        name: name.map(Into::into),
        payload: Payload::File {
            data: Some(data.to_vec()),
        },
    }
}

fn archive() -> Container {
    let mut inner = Container::new(1041);
    inner.entries.push(file(2, Some("inner.txt"), b"hello"));

    let mut outer = Container::new(1041);
    outer.string_table = Some(StringTable {
        flag: 0,
        strings: vec!["icon.png".into(), "nested".into(), "inner.txt".into()],
    });
    outer.entries.push(file(0, Some("icon.png"), &[0x5A; 2048]));
    outer.entries.push(Entry {
        flags: 1,
        version: 0,
        resource_id: 1,
        name: Some("nested".into()),
        payload: Payload::Container(Box::new(inner)),
    });
    outer.entries.push(Entry {
        flags: 0,
        version: 0,
        resource_id: -1,
        name: None,
        payload: Payload::NoFile,
    });
    outer.entries.push(file(-1, None, b"anon"));
    outer
}

fn files_below(dir: &Path) -> Vec<String> {
    let mut files = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.path()
                .strip_prefix(dir)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect::<Vec<_>>();
    files.sort();
    files
}

#[traced_test]
#[test]
fn extract_then_repack_is_identity() -> Result<()> {
    let tmp = tempfile::tempdir().into_diagnostic()?;
    let input = tmp.path().join("archive.rsl");
    let original = archive().to_bytes(WriteOptions::default(), &mut InMemory)?;
    fs::write(&input, &original).into_diagnostic()?;

    let (_, report) = layout::unpack(&input, ReadOptions::default())?;
    assert_eq!(report, ExtractReport { files: 3, failed: 0 });

    let dir = tmp.path().join("archive");
    assert_eq!(
        files_below(&dir),
        vec!["icon.png", "nested/inner.txt", "resource_3", DOCUMENT_NAME]
    );
    assert_eq!(
        fs::read(dir.join("nested").join("inner.txt")).into_diagnostic()?,
        b"hello"
    );

    // the input is only replaced on request
    match layout::repack(&dir, &input, None, false) {
        Err(Error::IOError(e)) => assert_eq!(e.kind(), ErrorKind::AlreadyExists),
        other => panic!("expected the input to be kept, got {other:?}"),
    }

    layout::repack(&dir, &input, None, true)?;
    assert_eq!(fs::read(&input).into_diagnostic()?, original);

    Ok(())
}

#[traced_test]
#[test]
fn repack_picks_up_edits() -> Result<()> {
    let tmp = tempfile::tempdir().into_diagnostic()?;
    let input = tmp.path().join("archive.rsl");
    let original = archive().to_bytes(WriteOptions::default(), &mut InMemory)?;
    fs::write(&input, &original).into_diagnostic()?;

    layout::unpack(&input, ReadOptions::default())?;
    let dir = layout::extraction_dir(&input);

    fs::write(dir.join("nested").join("inner.txt"), b"changed payload").into_diagnostic()?;

    let mut document = layout::read_document(&dir)?;
    document.container.entries[0].name = Some("logo.png".into());
    layout::write_document(&document, &dir)?;
    fs::rename(dir.join("icon.png"), dir.join("logo.png")).into_diagnostic()?;

    let output = tmp.path().join("edited.rsl");
    layout::repack(&dir, &output, None, false)?;

    let bytes = fs::read(&output).into_diagnostic()?;
    let edited = Container::from_bytes(&bytes, ReadOptions::default())?;
    assert_eq!(edited.entries[0].name.as_deref(), Some("logo.png"));
    assert_eq!(
        edited.string_table.map(|table| table.strings),
        Some(vec![
            "logo.png".to_string(),
            "nested".to_string(),
            "inner.txt".to_string(),
        ])
    );

    let Payload::Container(inner) = &edited.entries[1].payload else {
        panic!("expected a nested container");
    };
    assert_eq!(
        inner.entries[0].payload,
        Payload::File {
            data: Some(b"changed payload".to_vec())
        }
    );

    Ok(())
}

#[test]
fn repack_without_payload_file_fails() -> Result<()> {
    let tmp = tempfile::tempdir().into_diagnostic()?;
    let input = tmp.path().join("archive.rsl");
    let original = archive().to_bytes(WriteOptions::default(), &mut InMemory)?;
    fs::write(&input, &original).into_diagnostic()?;

    layout::unpack(&input, ReadOptions::default())?;
    let dir = layout::extraction_dir(&input);
    fs::remove_file(dir.join("resource_3")).into_diagnostic()?;

    let output = tmp.path().join("broken.rsl");
    assert!(matches!(
        layout::repack(&dir, &output, None, false),
        Err(Error::PayloadNotFound(path)) if path.ends_with("resource_3")
    ));
    assert!(!output.exists());

    Ok(())
}

#[test]
fn repack_without_document_fails() -> Result<()> {
    let tmp = tempfile::tempdir().into_diagnostic()?;

    assert!(matches!(
        layout::repack(
            tmp.path(),
            &tmp.path().join("out.rsl"),
            None,
            true
        ),
        Err(Error::DocumentNotFound(_))
    ));

    Ok(())
}

#[traced_test]
#[test]
fn legacy_revision_survives_the_round_trip() -> Result<()> {
    let mut container = Container::new(1000);
    container.string_table = Some(StringTable {
        flag: 0,
        strings: vec!["old.bin".into()],
    });
    container.entries.push(file(0, Some("old.bin"), b"old"));
    container.entries.push(Entry {
        flags: 2,
        version: 0,
        resource_id: -1,
        name: None,
        payload: Payload::NoFile,
    });

    let legacy = FormatRevision::Legacy;
    let original = container.to_bytes(
        WriteOptions::builder().revision(legacy).build(),
        &mut InMemory,
    )?;

    let tmp = tempfile::tempdir().into_diagnostic()?;
    let input = tmp.path().join("old.rsl");
    fs::write(&input, &original).into_diagnostic()?;

    let (decoded, _) = layout::unpack(&input, ReadOptions::builder().revision(legacy).build())?;
    assert_eq!(decoded.entries[0].name.as_deref(), Some("old.bin"));

    let dir = layout::extraction_dir(&input);
    assert_eq!(layout::read_document(&dir)?.revision, legacy);

    // no revision given, the recorded one applies
    let output = tmp.path().join("repacked.rsl");
    layout::repack(&dir, &output, None, false)?;
    assert_eq!(fs::read(&output).into_diagnostic()?, original);

    let current = tmp.path().join("current.rsl");
    layout::repack(&dir, &current, Some(FormatRevision::Current), false)?;
    assert_ne!(fs::read(&current).into_diagnostic()?, original);

    Ok(())
}
