//! TOML configuration file loading
//!
//! Supports `~/.config/voicepack/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct PackConfigFile {
    /// Voice-pack language code published alongside the archive
    #[serde(default)]
    pub language: Option<String>,

    /// Fetcher configuration
    #[serde(default)]
    pub fetch: FetchFileConfig,

    /// Encoder configuration
    #[serde(default)]
    pub encode: EncodeFileConfig,

    /// Build/working-directory configuration
    #[serde(default)]
    pub build: BuildFileConfig,

    /// Release packaging configuration
    #[serde(default)]
    pub release: ReleaseFileConfig,
}

/// Fetcher-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct FetchFileConfig {
    /// Generation endpoint URL
    pub generate_url: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Maximum download attempts per clip
    pub max_retries: Option<u32>,

    /// Base backoff delay in milliseconds
    pub base_delay_ms: Option<u64>,

    /// Backoff cap in seconds
    pub max_delay_secs: Option<u64>,
}

/// Encoder configuration
#[derive(Debug, Default, Deserialize)]
pub struct EncodeFileConfig {
    /// Vorbis qscale, 0-10
    pub vorbis_quality: Option<u8>,

    /// Gain in dB applied before the limiter
    pub gain_db: Option<f64>,

    /// Peak limiter ceiling, 0.0-1.0
    pub limit_peak: Option<f64>,
}

/// Build/working-directory configuration
#[derive(Debug, Default, Deserialize)]
pub struct BuildFileConfig {
    /// Path to the sound list file
    pub sound_list: Option<PathBuf>,

    /// Working directory for intermediate clips
    pub out_dir: Option<PathBuf>,

    /// Directory for stale outputs moved aside on text changes
    pub stale_dir: Option<PathBuf>,

    /// Parallel fetch/encode workers
    pub workers: Option<usize>,
}

/// Release packaging configuration
#[derive(Debug, Default, Deserialize)]
pub struct ReleaseFileConfig {
    /// Output path for the release archive
    pub archive_path: Option<PathBuf>,

    /// README to rewrite with the published checksum and size
    pub readme_path: Option<PathBuf>,

    /// Download URL published for the firmware's voice-pack loader
    pub url: Option<String>,
}

/// Load the TOML config file.
///
/// An explicit path must exist and parse; the default path is a soft
/// dependency — missing or unparsable files fall back to defaults with a
/// warning.
///
/// # Errors
///
/// Returns error if an explicitly given path cannot be read or parsed.
pub fn load_config_file(explicit: Option<&Path>) -> Result<PackConfigFile> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        return Ok(config);
    }

    let Some(path) = config_file_path() else {
        return Ok(PackConfigFile::default());
    };
    if !path.exists() {
        return Ok(PackConfigFile::default());
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                Ok(config)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                Ok(PackConfigFile::default())
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            Ok(PackConfigFile::default())
        }
    }
}

/// Return the default config file path: `~/.config/voicepack/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voicepack").join("config.toml"))
}
