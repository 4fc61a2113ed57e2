//! Audio clip retrieval from the external generation endpoint
//!
//! The endpoint renders a line of text to a WAV clip over plain HTTP GET.
//! It is a public best-effort service, so downloads retry with exponential
//! backoff (see [`retry`]) and every fetched body is checked to actually be
//! a WAV container before it enters the working directory.

pub mod retry;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::{Error, Result};

pub use retry::RetryPolicy;

/// Produces a WAV rendering for a line of text
///
/// Trait seam so pipeline tests can substitute a local source instead of
/// hitting the network.
#[async_trait]
pub trait VoiceSource: Send + Sync {
    /// Fetch a WAV rendering of `text` and write it to `wav_path`
    ///
    /// # Errors
    ///
    /// Returns error if the clip cannot be retrieved or is not valid WAV
    async fn fetch_wav(&self, text: &str, wav_path: &Path) -> Result<()>;

    /// Source name for logging
    fn name(&self) -> &'static str;
}

/// Download failure classification for the retry loop
enum DownloadError {
    /// Worth retrying: rate limits, server errors, network-level failures
    Transient(String),
    /// Success status but the body is not a WAV container; retried a few
    /// times in case of truncation, then fatal
    BadBody(String),
    /// Retrying won't help: client errors, local disk failures
    Fatal(String),
}

/// Consecutive non-WAV success responses tolerated before giving up.
/// A 200 carrying an HTML error page rarely heals on retry, so this stays
/// far below the transient retry budget.
const MAX_BAD_BODY_ATTEMPTS: u32 = 3;

/// Fetches clips from the GLaDOS voice generation endpoint
pub struct GladosVoice {
    client: reqwest::Client,
    generate_url: String,
    policy: RetryPolicy,
}

impl GladosVoice {
    /// Create a client for the given generation endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(generate_url: String, timeout: Duration, policy: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            generate_url,
            policy,
        })
    }

    /// Single download attempt: GET the clip and stream the body to disk
    async fn try_download(&self, text: &str, wav_path: &Path) -> std::result::Result<(), DownloadError> {
        let response = self
            .client
            .get(&self.generate_url)
            .query(&[("text", text)])
            .send()
            .await
            .map_err(|e| DownloadError::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let msg = format!("endpoint returned {status}: {body}");
            return if retry::is_recoverable(status.as_u16()) {
                Err(DownloadError::Transient(msg))
            } else {
                Err(DownloadError::Fatal(msg))
            };
        }

        let mut file = tokio::fs::File::create(wav_path)
            .await
            .map_err(|e| DownloadError::Fatal(format!("create {}: {e}", wav_path.display())))?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| DownloadError::Transient(format!("body read failed: {e}")))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::Fatal(format!("write {}: {e}", wav_path.display())))?;
        }

        file.flush()
            .await
            .map_err(|e| DownloadError::Fatal(format!("flush {}: {e}", wav_path.display())))?;

        if let Err(e) = validate_wav(wav_path) {
            let _ = std::fs::remove_file(wav_path);
            return Err(DownloadError::BadBody(e));
        }

        Ok(())
    }

    /// Count an attempt against the retry budget and back off before the
    /// next one; errors once the budget is exhausted
    async fn backoff(&self, attempt: &mut u32, msg: &str) -> Result<()> {
        *attempt += 1;
        if *attempt >= self.policy.max_retries {
            return Err(Error::Fetch(format!(
                "giving up after {attempt} attempts: {msg}"
            )));
        }

        let delay = retry::delay_for_attempt(&self.policy, *attempt - 1);
        tracing::warn!(
            attempt = *attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %msg,
            "download failed, retrying"
        );
        tokio::time::sleep(delay).await;
        Ok(())
    }
}

#[async_trait]
impl VoiceSource for GladosVoice {
    async fn fetch_wav(&self, text: &str, wav_path: &Path) -> Result<()> {
        if let Some(parent) = wav_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut attempt = 0u32;
        let mut bad_bodies = 0u32;
        loop {
            match self.try_download(text, wav_path).await {
                Ok(()) => return Ok(()),
                Err(DownloadError::Fatal(msg)) => return Err(Error::Fetch(msg)),
                Err(DownloadError::BadBody(msg)) => {
                    bad_bodies += 1;
                    if bad_bodies >= MAX_BAD_BODY_ATTEMPTS {
                        return Err(Error::Fetch(format!(
                            "{msg} ({bad_bodies} consecutive non-audio responses)"
                        )));
                    }
                    self.backoff(&mut attempt, &msg).await?;
                }
                Err(DownloadError::Transient(msg)) => {
                    bad_bodies = 0;
                    self.backoff(&mut attempt, &msg).await?;
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "glados"
    }
}

/// Check that the file on disk parses as a RIFF/WAVE container
fn validate_wav(path: &Path) -> std::result::Result<(), String> {
    hound::WavReader::open(path)
        .map(|_| ())
        .map_err(|e| format!("downloaded clip is not valid WAV: {e}"))
}
