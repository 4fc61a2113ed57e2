//! Sound list loading and normalization
//!
//! The sound list is a semicolon-separated file mapping firmware clip
//! indices to the text spoken for that sound event:
//!
//! ```text
//! 0;Starting cleaning.
//! 1;Cleaning complete.
//! 12.ogg;The bin is full.
//! ```
//!
//! The first column accepts a plain number or a filename-like field; the
//! second column is the text sent to the generation endpoint. Each entry
//! carries the MD5 of its normalized text so a changed line produces a new
//! intermediate file.

use std::path::Path;
use std::sync::LazyLock;

use md5::{Digest, Md5};
use regex::Regex;

use crate::{Error, Result};

/// Matches the index column: a plain number with an optional extension
/// ("0", "003", "12.ogg", "7.WAV")
static INDEX_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)(?:\.[A-Za-z0-9]+)?\s*$").expect("valid regex"));

/// A single sound event to synthesize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundEntry {
    /// Firmware clip index
    pub index: u32,

    /// Normalized text sent to the generation endpoint
    pub text: String,

    /// Lowercase-hex MD5 of the normalized text
    pub text_md5: String,
}

impl SoundEntry {
    /// Create an entry, normalizing and hashing the text
    #[must_use]
    pub fn new(index: u32, text: &str) -> Self {
        let text = normalize_text(text);
        let text_md5 = text_hash(&text);
        Self {
            index,
            text,
            text_md5,
        }
    }

    /// Intermediate basename in the working directory: `{index}-{md5}`
    #[must_use]
    pub fn hashed_basename(&self) -> String {
        format!("{}-{}", self.index, self.text_md5)
    }

    /// Final filename inside the release archive: `{index}.ogg`
    #[must_use]
    pub fn target_filename(&self) -> String {
        format!("{}.ogg", self.index)
    }
}

/// Ordered list of sound events loaded from the sound list file
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<SoundEntry>,
}

impl Catalog {
    /// Build a catalog from pre-parsed entries (used by tests)
    #[must_use]
    pub fn from_entries(entries: Vec<SoundEntry>) -> Self {
        Self { entries }
    }

    /// Load the sound list from a semicolon-separated file.
    ///
    /// Malformed rows (missing column, unparsable index, empty text) are
    /// skipped with a warning identifying the row. Duplicate indices are
    /// reported as a warning but kept.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or contains no valid rows.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::parse(&content);

        if catalog.is_empty() {
            return Err(Error::Catalog(format!(
                "no valid rows in {}; expected 'index;text' per line",
                path.display()
            )));
        }

        let dups = catalog.duplicate_indices();
        if !dups.is_empty() {
            tracing::warn!(
                indices = ?dups,
                "duplicate indices in sound list; older variants will be archived"
            );
        }

        tracing::info!(
            path = %path.display(),
            entries = catalog.len(),
            "loaded sound list"
        );
        Ok(catalog)
    }

    /// Parse sound list content, skipping malformed rows with warnings
    #[must_use]
    pub fn parse(content: &str) -> Self {
        // Tolerate a UTF-8 BOM from spreadsheet exports
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let mut entries = Vec::new();
        for (row, line) in content.lines().enumerate() {
            let row = row + 1;
            if line.trim().is_empty() {
                continue;
            }

            // Split at the first semicolon only; text may contain semicolons
            let Some((index_field, text_field)) = line.split_once(';') else {
                tracing::warn!(row, "expected 2 columns, skipped");
                continue;
            };

            let Some(index) = parse_index_field(index_field) else {
                tracing::warn!(row, field = index_field, "could not parse index, skipped");
                continue;
            };

            let text = normalize_text(text_field);
            if text.is_empty() {
                tracing::warn!(row, "empty text, skipped");
                continue;
            }

            entries.push(SoundEntry::new(index, &text));
        }

        Self { entries }
    }

    /// Entries in file order
    #[must_use]
    pub fn entries(&self) -> &[SoundEntry] {
        &self.entries
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indices appearing more than once, sorted ascending
    #[must_use]
    pub fn duplicate_indices(&self) -> Vec<u32> {
        let mut seen = std::collections::BTreeMap::new();
        for entry in &self.entries {
            *seen.entry(entry.index).or_insert(0u32) += 1;
        }
        seen.into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(index, _)| index)
            .collect()
    }
}

/// Normalize typographic characters the same way as the text that was
/// originally hashed and sent to the API
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.replace('\u{2026}', "...")
        .replace('\u{2019}', "'")
        .replace('\u{2011}', "-")
        .replace('\u{2014}', "- ")
        .trim()
        .to_string()
}

/// Parse the index column: a plain number ("0", "003") or a filename-like
/// field ("12.ogg"). Returns `None` if it cannot be parsed.
#[must_use]
pub fn parse_index_field(field: &str) -> Option<u32> {
    let captures = INDEX_FIELD.captures(field)?;
    captures[1].parse().ok()
}

/// Lowercase-hex MD5 of the text, used in intermediate filenames
#[must_use]
pub fn text_hash(text: &str) -> String {
    format!("{:x}", Md5::digest(text.as_bytes()))
}
