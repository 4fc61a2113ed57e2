//! Release archive assembly and published metadata
//!
//! Collects the encoded clips into `voice_pack.tar.gz`, computes the MD5
//! checksum and byte size the firmware's voice-pack loader is configured
//! with, and rewrites the published values in the README.
//!
//! Tar metadata is normalized (fixed mode, zeroed mtime/uid/gid) so the
//! archive is byte-identical across runs with unchanged inputs.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use md5::{Digest, Md5};
use regex::Regex;

use crate::catalog::Catalog;
use crate::{Error, Result};

/// Matches hashed encoder outputs such as `12-a0b1...ff.ogg`
static OGG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<index>\d+)-(?P<md5>[0-9a-fA-F]{32})\.ogg$").expect("valid regex")
});

// README replacement patterns for the published install metadata
static RE_MD5_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(MD5 sum of the prepackaged\s*`voice_pack\.tar\.gz`:\s*\r?\n\s*`)([0-9a-fA-F]{32})(`)")
        .expect("valid regex")
});
static RE_HASH_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(-\s*Hash:\s*`)([0-9a-fA-F]{32})(`)").expect("valid regex"));
static RE_SIZE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(-\s*File size:\s*`)(\d+)(`\s*bytes)").expect("valid regex"));
static RE_URL_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(-\s*URL:\s*`)([^`]+)(`)").expect("valid regex"));

/// Published metadata for a release archive
#[derive(Debug, Clone)]
pub struct ReleaseInfo {
    /// Lowercase-hex MD5 of the archive
    pub md5: String,

    /// Archive size in bytes
    pub size_bytes: u64,

    /// Download URL, if one is published
    pub url: Option<String>,
}

/// Scan a working directory for encoded clips named `{index}-{md5}.ogg`.
///
/// Returns `(index, path)` pairs sorted by ascending index.
///
/// # Errors
///
/// Returns error if the directory cannot be read or the same index appears
/// with multiple hashed files.
pub fn scan_encoded(dir: &Path) -> Result<Vec<(u32, PathBuf)>> {
    let mut by_index: std::collections::BTreeMap<u32, PathBuf> = std::collections::BTreeMap::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(captures) = OGG_PATTERN.captures(name) else {
            continue;
        };

        let index: u32 = captures["index"]
            .parse()
            .map_err(|_| Error::Packaging(format!("clip index out of range in {name}")))?;

        if let Some(existing) = by_index.get(&index) {
            return Err(Error::Packaging(format!(
                "duplicate index {index} with multiple hashed files: {} and {name}",
                existing
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            )));
        }
        by_index.insert(index, path);
    }

    Ok(by_index.into_iter().collect())
}

/// Check that every catalog index has exactly one encoded clip.
///
/// # Errors
///
/// Returns error listing every missing index (aggregated, not fail-fast)
pub fn verify_complete(catalog: &Catalog, scanned: &[(u32, PathBuf)]) -> Result<()> {
    let present: std::collections::BTreeSet<u32> = scanned.iter().map(|(i, _)| *i).collect();
    let missing: Vec<u32> = catalog
        .entries()
        .iter()
        .map(|e| e.index)
        .filter(|i| !present.contains(i))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    let list = missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Err(Error::Packaging(format!(
        "{} clip(s) missing from working directory: {list}; run `voicepack build` first",
        missing.len()
    )))
}

/// Assemble the gzip-compressed tar archive.
///
/// Entries are named `{index}.ogg` (hash stripped) in ascending index order
/// with normalized metadata, written to a temporary file and atomically
/// renamed over `archive_path`.
///
/// # Errors
///
/// Returns error if a clip cannot be read or the archive cannot be written
pub fn create_archive(pairs: &[(u32, PathBuf)], archive_path: &Path) -> Result<()> {
    let parent = match archive_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let temp = tempfile::NamedTempFile::new_in(parent)?;
    let encoder = flate2::write::GzEncoder::new(temp, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (index, path) in pairs {
        let contents = std::fs::read(path)
            .map_err(|e| Error::Packaging(format!("read clip {}: {e}", path.display())))?;

        let mut header = tar::Header::new_gnu();
        header
            .set_path(format!("{index}.ogg"))
            .map_err(|e| Error::Packaging(format!("archive entry name for index {index}: {e}")))?;
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_cksum();

        builder
            .append(&header, contents.as_slice())
            .map_err(|e| Error::Packaging(format!("append index {index}: {e}")))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| Error::Packaging(format!("finish tar stream: {e}")))?;
    let temp = encoder
        .finish()
        .map_err(|e| Error::Packaging(format!("finish gzip stream: {e}")))?;

    temp.persist(archive_path)
        .map_err(|e| Error::Packaging(format!("persist {}: {e}", archive_path.display())))?;

    tracing::info!(
        path = %archive_path.display(),
        clips = pairs.len(),
        "wrote release archive"
    );
    Ok(())
}

/// Streaming MD5 of a file, lowercase hex
///
/// # Errors
///
/// Returns error if the file cannot be read
pub fn compute_md5(path: &Path) -> Result<String> {
    use std::io::Read;

    let mut file = std::fs::File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Scan, verify against the catalog, archive, and compute published metadata.
///
/// # Errors
///
/// Returns error if the clip set is incomplete or the archive cannot be
/// written
pub fn package(
    out_dir: &Path,
    catalog: &Catalog,
    archive_path: &Path,
    url: Option<String>,
) -> Result<ReleaseInfo> {
    let pairs = scan_encoded(out_dir)?;
    if pairs.is_empty() {
        return Err(Error::Packaging(format!(
            "no encoded clips in {}; run `voicepack build` first",
            out_dir.display()
        )));
    }

    verify_complete(catalog, &pairs)?;
    create_archive(&pairs, archive_path)?;

    let md5 = compute_md5(archive_path)?;
    let size_bytes = std::fs::metadata(archive_path)?.len();

    Ok(ReleaseInfo {
        md5,
        size_bytes,
        url,
    })
}

/// Rewrite the published MD5, size, and URL values in the README.
///
/// Missing patterns warn and continue; the file is rewritten only when the
/// content actually changed. Returns whether the file was rewritten.
///
/// # Errors
///
/// Returns error if the README exists but cannot be read or written
pub fn update_readme(readme_path: &Path, info: &ReleaseInfo) -> Result<bool> {
    if !readme_path.exists() {
        tracing::warn!(path = %readme_path.display(), "README not found, skipping update");
        return Ok(false);
    }

    let original = std::fs::read_to_string(readme_path)?;
    let (text, n_md5) = replace_middle(&RE_MD5_BLOCK, &original, &info.md5);
    let (text, n_hash) = replace_middle(&RE_HASH_LINE, &text, &info.md5);
    let (text, n_size) = replace_middle(&RE_SIZE_LINE, &text, &info.size_bytes.to_string());
    let (text, n_url) = match &info.url {
        Some(url) => replace_middle(&RE_URL_LINE, &text, url),
        None => (text, 0),
    };

    if n_md5 == 0 {
        tracing::warn!("MD5 block not found in README, no replacement made");
    }
    if n_hash == 0 {
        tracing::warn!("Hash line not found in README, no replacement made");
    }
    if n_size == 0 {
        tracing::warn!("File size line not found in README, no replacement made");
    }

    if text == original {
        tracing::info!("README unchanged");
        return Ok(false);
    }

    std::fs::write(readme_path, text)?;
    tracing::info!(
        md5_block = n_md5,
        hash = n_hash,
        size = n_size,
        url = n_url,
        "README updated"
    );
    Ok(true)
}

/// Replace the middle capture group of every match with `value`, keeping the
/// surrounding groups. Returns the new text and the match count.
fn replace_middle(re: &Regex, text: &str, value: &str) -> (String, usize) {
    let count = re.find_iter(text).count();
    let replaced = re
        .replace_all(text, |caps: &regex::Captures| {
            format!("{}{}{}", &caps[1], value, &caps[3])
        })
        .into_owned();
    (replaced, count)
}
