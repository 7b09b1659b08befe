//! Decides which local snippet files need uploading.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::identity::IdentityDirectory;
use crate::store::UploadState;

/// A local file whose content changed since its last upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    pub path: PathBuf,
    pub folder: String,
    pub identity: String,
    /// Trimmed file content, exactly what was fingerprinted.
    pub content: String,
    pub fingerprint: String,
}

impl UploadCandidate {
    /// Key of this file in [`UploadState`].
    pub fn state_key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Hex-encoded SHA-256 of the trimmed content.
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Whether a file with `current` fingerprint must be uploaded given `previous`.
pub fn needs_upload(previous: Option<&str>, current: &str, force: bool) -> bool {
    force || previous != Some(current)
}

/// Walks `<root>/<folder>/*` and returns files whose fingerprint differs from
/// the recorded one.
///
/// Folders without a configured identity are skipped with a warning. Only
/// files whose extension is in `extensions` (any case) are considered. A
/// missing root yields no candidates. File contents are decoded lossily and an
/// unreadable file is skipped; neither stops the walk.
pub fn detect_changes(
    root: &Path,
    identities: &IdentityDirectory,
    extensions: &[String],
    state: &UploadState,
    force: bool,
) -> Result<Vec<UploadCandidate>, StoreError> {
    if !root.is_dir() {
        warn!(path = %root.display(), "No snippets directory");
        return Ok(Vec::new());
    }

    let mut folders = list_dir(root)?
        .into_iter()
        .filter(|p| p.is_dir())
        .collect::<Vec<_>>();
    folders.sort();

    let mut candidates = Vec::new();
    for dir in folders {
        let folder = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(identity) = identities.identity_for_folder(&folder) else {
            warn!(folder = %folder, "Skip: unknown author");
            continue;
        };

        let mut files = list_dir(&dir)?
            .into_iter()
            .filter(|p| p.is_file() && has_allowed_extension(p, extensions))
            .collect::<Vec<_>>();
        files.sort();

        for path in files {
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skip: unreadable file");
                    continue;
                }
            };
            let raw = String::from_utf8_lossy(&bytes);
            if matches!(raw, std::borrow::Cow::Owned(_)) {
                warn!(path = %path.display(), "Invalid UTF-8, replaced undecodable bytes");
            }
            let content = raw.trim().to_string();
            let current = fingerprint(&content);
            let key = path.to_string_lossy();

            if !needs_upload(state.fingerprint(&key), &current, force) {
                debug!(path = %path.display(), "Unchanged, skip");
                continue;
            }

            candidates.push(UploadCandidate {
                path: path.clone(),
                folder: folder.clone(),
                identity: identity.to_string(),
                content,
                fingerprint: current,
            });
        }
    }

    Ok(candidates)
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    fs::read_dir(dir)
        .and_then(|entries| {
            entries
                .map(|e| e.map(|e| e.path()))
                .collect::<std::io::Result<Vec<_>>>()
        })
        .map_err(|e| StoreError::io(dir, e))
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_ignores_surrounding_whitespace() {
        assert_eq!(fingerprint("hello"), fingerprint("\n hello \n"));
        assert_ne!(fingerprint("hello"), fingerprint("hellp"));
        assert_eq!(fingerprint("").len(), 64);
    }

    #[test]
    fn needs_upload_follows_force_missing_and_changed() {
        assert!(needs_upload(None, "a", false));
        assert!(needs_upload(Some("b"), "a", false));
        assert!(!needs_upload(Some("a"), "a", false));
        assert!(needs_upload(Some("a"), "a", true));
    }

    #[test]
    fn undecodable_file_is_read_lossily_without_stopping_the_walk() {
        let dir = tempfile::tempdir().unwrap();
        for folder in ["alice", "bob"] {
            fs::create_dir_all(dir.path().join(folder)).unwrap();
        }
        fs::write(dir.path().join("alice/2024-01-01.txt"), [0xff, 0xfe, b'x']).unwrap();
        fs::write(dir.path().join("bob/2024-01-01.txt"), "fine").unwrap();
        let identities = IdentityDirectory::new([("alice", "a@x.com"), ("bob", "b@x.com")]);

        let candidates = detect_changes(
            dir.path(),
            &identities,
            &crate::config::default_extensions(),
            &UploadState::default(),
            false,
        )
        .unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].content, "\u{fffd}\u{fffd}x");
        assert_eq!(candidates[1].content, "fine");
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let exts = crate::config::default_extensions();
        assert!(has_allowed_extension(Path::new("a/2024-01-01.TXT"), &exts));
        assert!(has_allowed_extension(Path::new("a/notes.markdown"), &exts));
        assert!(!has_allowed_extension(Path::new("a/image.png"), &exts));
        assert!(!has_allowed_extension(Path::new("a/README"), &exts));
    }
}
