//! Filesystem utilities for template documents.
//!
//! Templates are immutable once saved, so a half-written file must never
//! replace a good one. A save writes a hidden partial file beside the
//! document, syncs it and renames it over the destination.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::{new_id, CoreError, CoreResult};

/// File extension used for template documents
pub const TEMPLATE_EXTENSION: &str = "template.json";

/// Returns the document path for a template id inside `dir`.
///
/// Rejects ids that could escape `dir` (`..`, separators, drive markers,
/// control characters).
pub fn template_path(dir: &Path, template_id: &str) -> CoreResult<PathBuf> {
    let trimmed = template_id.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidTemplateFormat(
            "template id is empty".to_string(),
        ));
    }
    if trimmed.contains("..")
        || trimmed.contains('/')
        || trimmed.contains('\\')
        || trimmed.contains(':')
        || trimmed.chars().any(|c| c.is_control())
    {
        return Err(CoreError::InvalidTemplateFormat(format!(
            "template id '{template_id}' is not a safe file name"
        )));
    }
    Ok(dir.join(format!("{trimmed}.{TEMPLATE_EXTENSION}")))
}

/// A template document being written next to its final path.
///
/// The partial file is removed on drop unless [`PendingDocument::commit`]
/// moved it into place.
struct PendingDocument {
    partial: PathBuf,
    committed: bool,
}

impl PendingDocument {
    fn create(dest: &Path, bytes: &[u8]) -> CoreResult<Self> {
        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let pending = Self {
            partial: partial_path(dest),
            committed: false,
        };
        let mut writer = BufWriter::new(File::create(&pending.partial)?);
        writer.write_all(bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(pending)
    }

    fn commit(mut self, dest: &Path) -> CoreResult<()> {
        std::fs::rename(&self.partial, dest)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PendingDocument {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.partial);
        }
    }
}

/// Hidden sibling of `dest`, unique per save so concurrent saves of the
/// same template never share a partial file
fn partial_path(dest: &Path) -> PathBuf {
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "template".to_string());
    dest.with_file_name(format!(".{}.{}.partial", file_name, new_id()))
}

/// Saves a template document so readers see either the old file or the
/// complete new one. Nothing is left behind when the save fails.
pub fn save_document(dest: &Path, bytes: &[u8]) -> CoreResult<()> {
    PendingDocument::create(dest, bytes)?.commit(dest)
}

/// Saves `value` as a pretty-printed JSON document.
pub fn save_json_document<T: serde::Serialize>(dest: &Path, value: &T) -> CoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    save_document(dest, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn leftovers(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| n.ends_with(".partial"))
            .collect()
    }

    #[test]
    fn test_save_document_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("card.template.json");

        save_document(&path, b"first").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"first");

        save_document(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert!(leftovers(&dir.path().join("nested")).is_empty());
    }

    #[test]
    fn test_failed_save_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file
        let path = dir.path().join("card.template.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        assert!(matches!(
            save_document(&path, b"doc"),
            Err(CoreError::IoError(_))
        ));
        assert!(path.join("keep").exists());
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn test_partial_paths_are_hidden_and_unique() {
        let dest = Path::new("/templates/card.template.json");
        let first = partial_path(dest);
        let second = partial_path(dest);
        assert_ne!(first, second);
        assert_eq!(first.parent(), dest.parent());
        let name = first.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(".card.template.json."));
        assert!(!name.ends_with(TEMPLATE_EXTENSION));
    }

    #[test]
    fn test_template_path_accepts_ulid() {
        let dir = Path::new("/templates");
        let path = template_path(dir, "01HZX3V6ZK8M4Q2W7E9R5T1Y0U").unwrap();
        assert_eq!(
            path,
            dir.join("01HZX3V6ZK8M4Q2W7E9R5T1Y0U.template.json")
        );
    }

    #[test]
    fn test_template_path_rejects_traversal() {
        let dir = Path::new("/templates");
        assert!(template_path(dir, "../etc/passwd").is_err());
        assert!(template_path(dir, "a/b").is_err());
        assert!(template_path(dir, "c:evil").is_err());
        assert!(template_path(dir, "   ").is_err());
        assert!(template_path(dir, "bad\u{0}id").is_err());
    }
}
