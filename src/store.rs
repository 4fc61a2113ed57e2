//! Working-directory layout and stale-output archiving
//!
//! Intermediate clips live in the working directory as `{index}-{md5}.wav`
//! and `{index}-{md5}.ogg`, where the hash covers the normalized text. When
//! a voice line changes, outputs carrying the old hash are moved aside into
//! the stale archive directory instead of being deleted, so a bad edit can
//! be recovered.

use std::path::{Path, PathBuf};

use crate::Result;
use crate::catalog::SoundEntry;

/// Working-directory paths for intermediate clips
#[derive(Debug, Clone)]
pub struct ClipStore {
    out_dir: PathBuf,
    archive_dir: PathBuf,
}

impl ClipStore {
    /// Create a store over the given working and stale-archive directories
    #[must_use]
    pub fn new(out_dir: PathBuf, archive_dir: PathBuf) -> Self {
        Self {
            out_dir,
            archive_dir,
        }
    }

    /// Create both directories if missing
    ///
    /// # Errors
    ///
    /// Returns error if a directory cannot be created
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.out_dir)?;
        std::fs::create_dir_all(&self.archive_dir)?;
        Ok(())
    }

    /// Working directory holding intermediate and final clips
    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Intermediate WAV path for an entry: `{index}-{md5}.wav`
    #[must_use]
    pub fn wav_path(&self, entry: &SoundEntry) -> PathBuf {
        self.out_dir.join(format!("{}.wav", entry.hashed_basename()))
    }

    /// Encoded OGG path for an entry: `{index}-{md5}.ogg`
    #[must_use]
    pub fn ogg_path(&self, entry: &SoundEntry) -> PathBuf {
        self.out_dir.join(format!("{}.ogg", entry.hashed_basename()))
    }

    /// Move any output for this entry's index whose embedded hash no longer
    /// matches the entry's text hash into the stale archive directory.
    ///
    /// Returns `(archived, checked)` counts.
    ///
    /// # Errors
    ///
    /// Returns error if the working directory cannot be listed or a stale
    /// file cannot be moved.
    pub fn archive_stale(&self, entry: &SoundEntry) -> Result<(usize, usize)> {
        let mut archived = 0;
        let mut checked = 0;

        let prefix = format!("{}-", entry.index);
        for dir_entry in std::fs::read_dir(&self.out_dir)? {
            let path = dir_entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if !name.starts_with(&prefix) {
                continue;
            }
            let is_clip = name.ends_with(".ogg") || name.ends_with(".wav");
            if !is_clip {
                continue;
            }

            checked += 1;
            match embedded_hash(name) {
                Some(hash) if hash == entry.text_md5 => {}
                _ => {
                    self.move_to_archive(&path)?;
                    archived += 1;
                }
            }
        }

        Ok((archived, checked))
    }

    /// Move a file into the stale archive directory; a name collision gets a
    /// Unix-timestamp suffix before the extension
    fn move_to_archive(&self, path: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.archive_dir)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut target = self.archive_dir.join(&name);
        if target.exists() {
            let ts = chrono::Utc::now().timestamp();
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            target = match path.extension() {
                Some(ext) => self
                    .archive_dir
                    .join(format!("{stem}.{ts}.{}", ext.to_string_lossy())),
                None => self.archive_dir.join(format!("{name}.{ts}")),
            };
        }

        std::fs::rename(path, &target)?;
        tracing::debug!(from = %path.display(), to = %target.display(), "archived stale clip");
        Ok(target)
    }
}

/// Extract the hash between the first `-` and the extension of a clip
/// filename such as `12-900150983cd24fb0d6963f7d28e17f72.ogg`
fn embedded_hash(name: &str) -> Option<&str> {
    let dash = name.find('-')?;
    let dot = name.rfind('.')?;
    if dot <= dash + 1 {
        return None;
    }
    Some(&name[dash + 1..dot])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, ClipStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ClipStore::new(dir.path().join("output"), dir.path().join("output_archive"));
        store.ensure_dirs().unwrap();
        (dir, store)
    }

    // -- embedded_hash --------------------------------------------------------

    #[test]
    fn extracts_hash_from_clip_name() {
        assert_eq!(
            embedded_hash("12-900150983cd24fb0d6963f7d28e17f72.ogg"),
            Some("900150983cd24fb0d6963f7d28e17f72")
        );
    }

    #[test]
    fn rejects_names_without_hash() {
        assert_eq!(embedded_hash("12.ogg"), None);
        assert_eq!(embedded_hash("12-.ogg"), None);
        assert_eq!(embedded_hash("12-abc"), None);
    }

    // -- paths ----------------------------------------------------------------

    #[test]
    fn paths_embed_index_and_hash() {
        let (_dir, store) = test_store();
        let entry = SoundEntry::new(3, "abc");

        let wav = store.wav_path(&entry);
        let ogg = store.ogg_path(&entry);
        assert!(wav.ends_with("3-900150983cd24fb0d6963f7d28e17f72.wav"));
        assert!(ogg.ends_with("3-900150983cd24fb0d6963f7d28e17f72.ogg"));
    }

    // -- archive_stale --------------------------------------------------------

    #[test]
    fn moves_outputs_with_different_hash() {
        let (_dir, store) = test_store();
        let entry = SoundEntry::new(0, "new text");

        let stale = store.out_dir().join("0-aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa.ogg");
        std::fs::write(&stale, b"old").unwrap();

        let (archived, checked) = store.archive_stale(&entry).unwrap();
        assert_eq!((archived, checked), (1, 1));
        assert!(!stale.exists());
        assert!(
            store
                .archive_dir
                .join("0-aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa.ogg")
                .exists()
        );
    }

    #[test]
    fn keeps_outputs_with_matching_hash() {
        let (_dir, store) = test_store();
        let entry = SoundEntry::new(0, "same text");

        let current = store.ogg_path(&entry);
        std::fs::write(&current, b"current").unwrap();

        let (archived, checked) = store.archive_stale(&entry).unwrap();
        assert_eq!((archived, checked), (0, 1));
        assert!(current.exists());
    }

    #[test]
    fn ignores_other_indices() {
        let (_dir, store) = test_store();
        let entry = SoundEntry::new(1, "text");

        let other = store.out_dir().join("12-aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa.ogg");
        std::fs::write(&other, b"other").unwrap();

        let (archived, checked) = store.archive_stale(&entry).unwrap();
        assert_eq!((archived, checked), (0, 0));
        assert!(other.exists());
    }

    #[test]
    fn archives_both_wav_and_ogg() {
        let (_dir, store) = test_store();
        let entry = SoundEntry::new(4, "fresh");

        std::fs::write(
            store.out_dir().join("4-bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb.wav"),
            b"w",
        )
        .unwrap();
        std::fs::write(
            store.out_dir().join("4-bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb.ogg"),
            b"o",
        )
        .unwrap();

        let (archived, checked) = store.archive_stale(&entry).unwrap();
        assert_eq!((archived, checked), (2, 2));
    }

    #[test]
    fn collision_in_archive_gets_suffix() {
        let (_dir, store) = test_store();
        let entry = SoundEntry::new(0, "new text");

        let name = "0-cccccccccccccccccccccccccccccccc.ogg";
        std::fs::write(store.archive_dir.join(name), b"earlier").unwrap();
        std::fs::write(store.out_dir().join(name), b"later").unwrap();

        store.archive_stale(&entry).unwrap();

        let archived: Vec<_> = std::fs::read_dir(&store.archive_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(archived.len(), 2, "collision should not clobber: {archived:?}");
    }

    #[test]
    fn malformed_names_with_index_prefix_are_archived() {
        let (_dir, store) = test_store();
        let entry = SoundEntry::new(9, "text");

        std::fs::write(store.out_dir().join("9-.ogg"), b"junk").unwrap();

        let (archived, checked) = store.archive_stale(&entry).unwrap();
        assert_eq!((archived, checked), (1, 1));
    }
}
