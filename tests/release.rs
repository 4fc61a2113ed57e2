//! Release packaging integration tests
//!
//! End-to-end build + package with mock components, archive content
//! verification, and the reproducibility and all-or-nothing guarantees.

use std::io::Read;

use voicepack_builder::{Catalog, Pipeline, package};

mod common;

use common::{CopyTranscoder, MockVoiceSource, TestWorkspace};

/// Entry names inside a gzip-compressed tar archive
fn archive_entries(path: &std::path::Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let decoder = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);

    archive
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[tokio::test]
async fn end_to_end_build_then_release() {
    let ws = TestWorkspace::new();
    let catalog = Catalog::parse("0;The bin is full.\n1;Cleaning complete.\n");

    let pipeline = Pipeline::new(
        MockVoiceSource::new(),
        CopyTranscoder::new(),
        ws.store(),
        2,
    );
    let report = pipeline.run(&catalog).await.unwrap();
    assert!(report.is_complete());

    let archive_path = ws.dir.path().join("voice_pack.tar.gz");
    let info = package::package(
        &ws.out_dir,
        &catalog,
        &archive_path,
        Some("https://example.com/voice_pack.tar.gz".to_string()),
    )
    .unwrap();

    // One entry per catalog index, named per the firmware convention
    let mut entries = archive_entries(&archive_path);
    entries.sort();
    assert_eq!(entries, vec!["0.ogg", "1.ogg"]);

    // Reported checksum and size match the archive just written
    assert_eq!(info.md5, package::compute_md5(&archive_path).unwrap());
    assert_eq!(info.size_bytes, std::fs::metadata(&archive_path).unwrap().len());
    assert_eq!(
        info.url.as_deref(),
        Some("https://example.com/voice_pack.tar.gz")
    );
}

#[tokio::test]
async fn archive_content_matches_encoded_clips() {
    let ws = TestWorkspace::new();
    let catalog = Catalog::parse("3;Charging.\n");

    let pipeline = Pipeline::new(
        MockVoiceSource::new(),
        CopyTranscoder::new(),
        ws.store(),
        1,
    );
    pipeline.run(&catalog).await.unwrap();

    let archive_path = ws.dir.path().join("voice_pack.tar.gz");
    package::package(&ws.out_dir, &catalog, &archive_path, None).unwrap();

    let encoded = std::fs::read(ws.store().ogg_path(&catalog.entries()[0])).unwrap();

    let file = std::fs::File::open(&archive_path).unwrap();
    let decoder = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(decoder);
    let mut entry = archive.entries().unwrap().next().unwrap().unwrap();

    assert_eq!(entry.path().unwrap().to_string_lossy(), "3.ogg");
    let mut contents = Vec::new();
    entry.read_to_end(&mut contents).unwrap();
    assert_eq!(contents, encoded);
}

#[tokio::test]
async fn release_is_reproducible() {
    let ws = TestWorkspace::new();
    let catalog = Catalog::parse("0;a\n1;b\n2;c\n");

    let pipeline = Pipeline::new(
        MockVoiceSource::new(),
        CopyTranscoder::new(),
        ws.store(),
        3,
    );
    pipeline.run(&catalog).await.unwrap();

    let first_path = ws.dir.path().join("first.tar.gz");
    let second_path = ws.dir.path().join("second.tar.gz");
    let first = package::package(&ws.out_dir, &catalog, &first_path, None).unwrap();
    let second = package::package(&ws.out_dir, &catalog, &second_path, None).unwrap();

    assert_eq!(first.md5, second.md5);
    assert_eq!(first.size_bytes, second.size_bytes);
    assert_eq!(
        std::fs::read(&first_path).unwrap(),
        std::fs::read(&second_path).unwrap(),
        "identical inputs must produce byte-identical archives"
    );
}

#[tokio::test]
async fn incomplete_clip_set_produces_no_archive() {
    let ws = TestWorkspace::new();

    // Build only part of the catalog, then release against the full one
    let partial = Catalog::parse("0;present\n");
    let pipeline = Pipeline::new(
        MockVoiceSource::new(),
        CopyTranscoder::new(),
        ws.store(),
        1,
    );
    pipeline.run(&partial).await.unwrap();

    let full = Catalog::parse("0;present\n1;missing\n2;also missing\n");
    let archive_path = ws.dir.path().join("voice_pack.tar.gz");
    let err = package::package(&ws.out_dir, &full, &archive_path, None).unwrap_err();

    assert!(err.to_string().contains("missing"), "{err}");
    assert!(err.to_string().contains("1, 2"), "{err}");
    assert!(!archive_path.exists(), "no partial archive may be published");
}

#[test]
fn empty_working_directory_refuses_to_package() {
    let ws = TestWorkspace::new();
    ws.store().ensure_dirs().unwrap();

    let catalog = Catalog::parse("0;a\n");
    let archive_path = ws.dir.path().join("voice_pack.tar.gz");
    let err = package::package(&ws.out_dir, &catalog, &archive_path, None).unwrap_err();

    assert!(err.to_string().contains("no encoded clips"), "{err}");
    assert!(!archive_path.exists());
}

#[tokio::test]
async fn release_replaces_previous_archive() {
    let ws = TestWorkspace::new();
    let catalog = Catalog::parse("0;a\n");

    let pipeline = Pipeline::new(
        MockVoiceSource::new(),
        CopyTranscoder::new(),
        ws.store(),
        1,
    );
    pipeline.run(&catalog).await.unwrap();

    let archive_path = ws.dir.path().join("voice_pack.tar.gz");
    std::fs::write(&archive_path, b"stale archive from a previous run").unwrap();

    let info = package::package(&ws.out_dir, &catalog, &archive_path, None).unwrap();
    assert_eq!(info.md5, package::compute_md5(&archive_path).unwrap());
    assert_eq!(archive_entries(&archive_path), vec!["0.ogg"]);
}
