//! Configuration management for the voice pack builder
//!
//! Runtime configuration is assembled from built-in defaults, an optional
//! partial TOML overlay (see [`file`]), and per-invocation CLI overrides
//! applied by `main`.

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::encode::EncodeSettings;
use crate::fetch::RetryPolicy;
use crate::{Error, Result};

use file::PackConfigFile;

/// Default voice generation endpoint
pub const DEFAULT_GENERATE_URL: &str = "https://glados.c-net.org/generate";

/// Default download URL published in installation instructions
pub const DEFAULT_RELEASE_URL: &str =
    "https://github.com/padok/voice_pack_dreame/raw/main/voice_pack.tar.gz";

/// Voice pack builder configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Voice-pack language code published alongside the archive
    pub language: String,

    /// Path to the sound list file
    pub sound_list: PathBuf,

    /// Working directory for intermediate clips
    pub out_dir: PathBuf,

    /// Directory for stale outputs moved aside on text changes
    pub stale_dir: PathBuf,

    /// Parallel fetch/encode workers
    pub workers: usize,

    /// Fetcher configuration
    pub fetch: FetchConfig,

    /// Encoder settings
    pub encode: EncodeSettings,

    /// Release packaging configuration
    pub release: ReleaseConfig,
}

/// Fetcher configuration
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Generation endpoint URL
    pub generate_url: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Retry policy for transient failures
    pub retry: RetryPolicy,
}

/// Release packaging configuration
#[derive(Debug, Clone)]
pub struct ReleaseConfig {
    /// Output path for the release archive
    pub archive_path: PathBuf,

    /// README to rewrite with the published checksum and size
    pub readme_path: PathBuf,

    /// Download URL published for the firmware's voice-pack loader
    pub url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: "GL".to_string(),
            sound_list: PathBuf::from("sound_list.csv"),
            out_dir: PathBuf::from("output"),
            stale_dir: PathBuf::from("output_archive"),
            workers: 3,
            fetch: FetchConfig {
                generate_url: DEFAULT_GENERATE_URL.to_string(),
                timeout: Duration::from_secs(60),
                retry: RetryPolicy::default(),
            },
            encode: EncodeSettings::default(),
            release: ReleaseConfig {
                archive_path: PathBuf::from("voice_pack.tar.gz"),
                readme_path: PathBuf::from("README.md"),
                url: DEFAULT_RELEASE_URL.to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration: defaults overlaid by the TOML file
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file cannot be loaded or a value
    /// is out of range
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let overlay = file::load_config_file(config_path)?;
        let config = Self::default().with_overlay(overlay);
        config.validate()?;
        Ok(config)
    }

    /// Apply a partial TOML overlay on top of this configuration
    #[must_use]
    pub fn with_overlay(mut self, overlay: PackConfigFile) -> Self {
        if let Some(language) = overlay.language {
            self.language = language;
        }

        if let Some(url) = overlay.fetch.generate_url {
            self.fetch.generate_url = url;
        }
        if let Some(secs) = overlay.fetch.timeout_secs {
            self.fetch.timeout = Duration::from_secs(secs);
        }
        if let Some(max_retries) = overlay.fetch.max_retries {
            self.fetch.retry.max_retries = max_retries;
        }
        if let Some(ms) = overlay.fetch.base_delay_ms {
            self.fetch.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = overlay.fetch.max_delay_secs {
            self.fetch.retry.max_delay = Duration::from_secs(secs);
        }

        if let Some(quality) = overlay.encode.vorbis_quality {
            self.encode.vorbis_quality = quality;
        }
        if let Some(gain) = overlay.encode.gain_db {
            self.encode.gain_db = gain;
        }
        if let Some(peak) = overlay.encode.limit_peak {
            self.encode.limit_peak = peak;
        }

        if let Some(path) = overlay.build.sound_list {
            self.sound_list = path;
        }
        if let Some(path) = overlay.build.out_dir {
            self.out_dir = path;
        }
        if let Some(path) = overlay.build.stale_dir {
            self.stale_dir = path;
        }
        if let Some(workers) = overlay.build.workers {
            self.workers = workers;
        }

        if let Some(path) = overlay.release.archive_path {
            self.release.archive_path = path;
        }
        if let Some(path) = overlay.release.readme_path {
            self.release.readme_path = path;
        }
        if let Some(url) = overlay.release.url {
            self.release.url = url;
        }

        self
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns error if a value is out of range
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        if self.encode.vorbis_quality > 10 {
            return Err(Error::Config(format!(
                "vorbis_quality must be 0-10, got {}",
                self.encode.vorbis_quality
            )));
        }
        if !(0.0..=1.0).contains(&self.encode.limit_peak) {
            return Err(Error::Config(format!(
                "limit_peak must be 0.0-1.0, got {}",
                self.encode.limit_peak
            )));
        }
        if self.fetch.retry.max_retries == 0 {
            return Err(Error::Config("max_retries must be at least 1".to_string()));
        }
        Ok(())
    }
}
