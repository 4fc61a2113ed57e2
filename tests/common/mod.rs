//! Shared test utilities
//!
//! Mock pipeline components so integration tests run without the network or
//! an ffmpeg install.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use voicepack_builder::{ClipStore, Error, Result, Transcoder, VoiceSource};

/// Marker: a mock source fails any entry whose text contains this
pub const FAIL_MARKER: &str = "FAIL";

/// Voice source that renders every request as a tiny valid WAV on disk
pub struct MockVoiceSource {
    fetches: AtomicUsize,
}

impl MockVoiceSource {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fetches: AtomicUsize::new(0),
        })
    }

    /// Number of fetch calls made so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceSource for MockVoiceSource {
    async fn fetch_wav(&self, text: &str, wav_path: &Path) -> Result<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if text.contains(FAIL_MARKER) {
            return Err(Error::Fetch(format!("mock refused to render: {text}")));
        }

        write_test_wav(wav_path);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Transcoder that derives OGG bytes from the WAV content without ffmpeg
pub struct CopyTranscoder {
    encodes: AtomicUsize,
}

impl CopyTranscoder {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            encodes: AtomicUsize::new(0),
        })
    }

    /// Number of transcode calls made so far
    pub fn encode_count(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(&self, wav_path: &Path, ogg_path: &Path) -> Result<()> {
        self.encodes.fetch_add(1, Ordering::SeqCst);

        let wav = std::fs::read(wav_path)
            .map_err(|e| Error::Encode(format!("read {}: {e}", wav_path.display())))?;

        // Deterministic stand-in for encoded output
        let mut ogg = b"OggS".to_vec();
        ogg.extend_from_slice(&wav);
        std::fs::write(ogg_path, ogg)
            .map_err(|e| Error::Encode(format!("write {}: {e}", ogg_path.display())))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "copy"
    }
}

/// Write a short valid mono WAV clip
pub fn write_test_wav(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create wav parent dir");
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("create test wav");
    for i in 0..220i16 {
        writer.write_sample(i * 50).expect("write sample");
    }
    writer.finalize().expect("finalize test wav");
}

/// Temp workspace with separate working and stale directories
pub struct TestWorkspace {
    pub dir: tempfile::TempDir,
    pub out_dir: PathBuf,
    pub stale_dir: PathBuf,
}

impl TestWorkspace {
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp workspace");
        let out_dir = dir.path().join("output");
        let stale_dir = dir.path().join("output_archive");
        Self {
            dir,
            out_dir,
            stale_dir,
        }
    }

    #[must_use]
    pub fn store(&self) -> ClipStore {
        ClipStore::new(self.out_dir.clone(), self.stale_dir.clone())
    }
}
