//! Upload intake: validates the script file and persists a copy for the pipeline.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Script formats accepted by the intake.
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["pdf", "fdx", "fountain", "txt"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported file type: {0} (supports .pdf, .fdx, .fountain, or .txt)")]
    UnsupportedFileType(String),

    #[error("script title must not be empty")]
    EmptyTitle,

    #[error("not a file: {0}")]
    NotAFile(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A persisted upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_url: String,
    pub file_name: String,
    pub bytes: u64,
}

pub fn validate_extension(path: &Path) -> Result<(), UploadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(UploadError::UnsupportedFileType(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        ))
    }
}

/// Title proposed for a file: its name without the final extension.
pub fn default_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Resolve the title for an upload: an explicit title wins, otherwise the file stem.
pub fn resolve_title(path: &Path, title: Option<&str>) -> Result<String, UploadError> {
    let title = match title {
        Some(t) => t.trim().to_string(),
        None => default_title(path).trim().to_string(),
    };
    if title.is_empty() {
        return Err(UploadError::EmptyTitle);
    }
    Ok(title)
}

/// Stores uploaded scripts under `<data_dir>/uploads`.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("uploads"),
        }
    }

    pub fn upload(&self, source: &Path, upload_id: &str) -> Result<UploadedFile, UploadError> {
        validate_extension(source)?;
        let meta = std::fs::metadata(source)?;
        if !meta.is_file() {
            return Err(UploadError::NotAFile(source.to_path_buf()));
        }
        std::fs::create_dir_all(&self.dir)?;

        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "script".into());
        let dest = self.dir.join(format!("{upload_id}-{file_name}"));
        let bytes = std::fs::copy(source, &dest)?;
        let dest = std::fs::canonicalize(&dest).unwrap_or(dest);

        Ok(UploadedFile {
            file_url: path_to_file_url(&dest),
            file_name,
            bytes,
        })
    }

    /// Remove an upload that no record refers to. Only files inside the uploads dir are touched.
    pub fn discard(&self, file_url: &str) {
        let path = file_url_to_path(file_url);
        let dir = std::fs::canonicalize(&self.dir).unwrap_or_else(|_| self.dir.clone());
        if !path.starts_with(&dir) {
            warn!(path = %path.display(), "not removing a file outside the uploads dir");
            return;
        }
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(path = %path.display(), "could not remove orphaned upload: {e}");
        }
    }
}

pub fn path_to_file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Inverse of [`path_to_file_url`]; plain paths pass through unchanged.
pub fn file_url_to_path(url: &str) -> PathBuf {
    PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_script_extensions_case_insensitively() {
        assert!(validate_extension(Path::new("a.pdf")).is_ok());
        assert!(validate_extension(Path::new("a.FDX")).is_ok());
        assert!(validate_extension(Path::new("dir/a.fountain")).is_ok());
        assert!(validate_extension(Path::new("a.txt")).is_ok());
        assert!(matches!(
            validate_extension(Path::new("a.docx")),
            Err(UploadError::UnsupportedFileType(_))
        ));
        assert!(validate_extension(Path::new("noext")).is_err());
    }

    #[test]
    fn title_defaults_to_file_stem() {
        assert_eq!(default_title(Path::new("/x/The Heist.v2.pdf")), "The Heist.v2");
        assert_eq!(
            resolve_title(Path::new("heat.fountain"), None).unwrap(),
            "heat"
        );
        assert_eq!(
            resolve_title(Path::new("heat.fountain"), Some("  Heat  ")).unwrap(),
            "Heat"
        );
        assert!(matches!(
            resolve_title(Path::new("heat.fountain"), Some("   ")),
            Err(UploadError::EmptyTitle)
        ));
    }

    #[test]
    fn upload_copies_into_data_dir() {
        let src_dir = tempfile::tempdir().unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("pilot.txt");
        std::fs::write(&src, "INT. KITCHEN - DAY").unwrap();

        let storage = FileStorage::new(data_dir.path());
        let up = storage.upload(&src, "abc").unwrap();
        assert_eq!(up.file_name, "pilot.txt");
        assert_eq!(up.bytes, 18);
        assert!(up.file_url.starts_with("file://"));

        let stored = file_url_to_path(&up.file_url);
        assert_eq!(std::fs::read_to_string(stored).unwrap(), "INT. KITCHEN - DAY");
    }

    #[test]
    fn discard_only_touches_uploads() {
        let data_dir = tempfile::tempdir().unwrap();
        let outside = data_dir.path().join("keep.txt");
        std::fs::write(&outside, "x").unwrap();
        let storage = FileStorage::new(data_dir.path());
        let up = storage.upload(&outside, "abc").unwrap();

        storage.discard(&path_to_file_url(&outside));
        assert!(outside.exists());

        storage.discard(&up.file_url);
        assert!(!file_url_to_path(&up.file_url).exists());
    }

    #[test]
    fn upload_rejects_unsupported_files() {
        let data_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(data_dir.path());
        assert!(matches!(
            storage.upload(Path::new("/tmp/whatever.docx"), "x"),
            Err(UploadError::UnsupportedFileType(_))
        ));
    }
}
