//! Voice pack builder for Valetudo-compatible vacuum robots
//!
//! This library produces a distributable voice pack archive from a sound
//! list: every firmware sound event is rendered by an external generation
//! endpoint, transcoded to OGG/Vorbis, and packed into `voice_pack.tar.gz`
//! together with the MD5 checksum and byte size the firmware's voice-pack
//! loader is configured with.
//!
//! # Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Sound list    │──▶│ Fetcher     │──▶│ Transcoder   │──▶│ Archiver     │
//! │ index;text    │   │ HTTP → WAV  │   │ ffmpeg → OGG │   │ tar.gz + MD5 │
//! └──────────────┘   └─────────────┘   └──────────────┘   └──────────────┘
//! ```
//!
//! Fetch and encode run per clip on a bounded worker pool; the archiver runs
//! strictly afterwards and refuses to package an incomplete clip set.

pub mod catalog;
pub mod config;
pub mod encode;
pub mod error;
pub mod fetch;
pub mod package;
pub mod pipeline;
pub mod store;

pub use catalog::{Catalog, SoundEntry};
pub use config::Config;
pub use encode::{EncodeSettings, FfmpegTranscoder, Transcoder};
pub use error::{Error, Result};
pub use fetch::{GladosVoice, RetryPolicy, VoiceSource};
pub use package::ReleaseInfo;
pub use pipeline::{BuildReport, ClipStatus, Pipeline};
pub use store::ClipStore;
