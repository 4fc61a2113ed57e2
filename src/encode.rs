//! WAV to OGG/Vorbis transcoding via an ffmpeg subprocess
//!
//! The firmware plays back OGG/Vorbis. Encoding applies a gain boost chained
//! with a peak limiter because the generated clips are quiet relative to the
//! robot's stock voice lines.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::{Error, Result};

/// Encoder settings for the OGG output
#[derive(Debug, Clone)]
pub struct EncodeSettings {
    /// Vorbis qscale, 0-10 (higher = better quality, larger files)
    pub vorbis_quality: u8,

    /// Gain applied before the limiter, in dB
    pub gain_db: f64,

    /// Peak limiter ceiling, 0.0-1.0, keeps the boosted signal from clipping
    pub limit_peak: f64,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            vorbis_quality: 5,
            gain_db: 8.0,
            limit_peak: 0.95,
        }
    }
}

/// Converts a WAV clip into the firmware's playback codec
///
/// Trait seam so pipeline tests can run without ffmpeg installed.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Encode `wav_path` into `ogg_path`
    ///
    /// # Errors
    ///
    /// Returns error on malformed input audio or encoder failure
    async fn transcode(&self, wav_path: &Path, ogg_path: &Path) -> Result<()>;

    /// Transcoder name for logging
    fn name(&self) -> &'static str;
}

/// OGG/Vorbis transcoder backed by the system ffmpeg binary
pub struct FfmpegTranscoder {
    ffmpeg: PathBuf,
    settings: EncodeSettings,
}

impl FfmpegTranscoder {
    /// Probe for ffmpeg on PATH and build a transcoder
    ///
    /// # Errors
    ///
    /// Returns error if ffmpeg is not installed
    pub fn new(settings: EncodeSettings) -> Result<Self> {
        let ffmpeg = which::which("ffmpeg").map_err(|_| {
            Error::Config("ffmpeg not found on PATH; install it to encode clips".to_string())
        })?;

        tracing::debug!(ffmpeg = %ffmpeg.display(), "found ffmpeg");
        Ok(Self { ffmpeg, settings })
    }

    /// ffmpeg audio filter chain: gain into peak limiter
    fn audio_filter(&self) -> String {
        format!(
            "volume={}dB,alimiter=limit={}",
            self.settings.gain_db, self.settings.limit_peak
        )
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, wav_path: &Path, ogg_path: &Path) -> Result<()> {
        if let Some(parent) = ogg_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let output = Command::new(&self.ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(wav_path)
            .arg("-filter:a")
            .arg(self.audio_filter())
            .arg("-codec:a")
            .arg("libvorbis")
            .arg("-qscale:a")
            .arg(self.settings.vorbis_quality.to_string())
            .arg(ogg_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| Error::Encode(format!("failed to spawn ffmpeg: {e}")))?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Encode(format!(
                "ffmpeg exited with code {code} for {}: {}",
                wav_path.display(),
                stderr_tail(&stderr)
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}

/// Last few lines of ffmpeg's stderr, where the actual error lives
fn stderr_tail(stderr: &str) -> String {
    const TAIL_LINES: usize = 4;

    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(TAIL_LINES);
    lines[start..].join(" | ")
}
