mod memory;

pub use memory::MemoryStorage;

use crate::error::StorageError;
use relative_path::{RelativePath, RelativePathBuf};
use std::fs;
use std::path::{Path, PathBuf};

/// The file collaborator behind an edit session.
pub trait Storage {
    fn read_file(&mut self, path: &RelativePath) -> Result<String, StorageError>;

    fn write_file(&mut self, path: &RelativePath, content: &str) -> Result<(), StorageError>;

    /// Called once a document is closed or navigated away from, after any
    /// pending save was flushed. Backup bookkeeping hooks in here.
    fn navigated_away(&mut self, _path: &RelativePath) -> Result<(), StorageError> {
        Ok(())
    }

    /// Notes root used to resolve image paths, if the storage is on disk.
    fn notes_root(&self) -> Option<&Path> {
        None
    }
}

/// Storage over a notes directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    notes_root: PathBuf,
    /// Files closed since the storage was created, most recent last.
    history: Vec<RelativePathBuf>,
}

impl FsStorage {
    pub fn new(notes_root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let notes_root = notes_root.into();
        validate_notes_dir(&notes_root)?;
        Ok(Self {
            notes_root,
            history: Vec::new(),
        })
    }

    pub fn history(&self) -> &[RelativePathBuf] {
        &self.history
    }
}

impl Storage for FsStorage {
    fn read_file(&mut self, path: &RelativePath) -> Result<String, StorageError> {
        read_file(path, &self.notes_root)
    }

    fn write_file(&mut self, path: &RelativePath, content: &str) -> Result<(), StorageError> {
        write_file(path, &self.notes_root, content)
    }

    fn navigated_away(&mut self, path: &RelativePath) -> Result<(), StorageError> {
        log::debug!("navigated away from {path}");
        self.history.push(path.to_relative_path_buf());
        Ok(())
    }

    fn notes_root(&self) -> Option<&Path> {
        Some(&self.notes_root)
    }
}

/// Read a markdown file and return its content
pub fn read_file(relative_path: &RelativePath, notes_root: &Path) -> Result<String, StorageError> {
    let absolute_path = relative_path.to_path(notes_root);
    if !absolute_path.exists() {
        return Err(StorageError::NotFound(absolute_path));
    }
    fs::read_to_string(&absolute_path).map_err(StorageError::Io)
}

/// Write content to a markdown file
pub fn write_file(
    relative_path: &RelativePath,
    notes_root: &Path,
    content: &str,
) -> Result<(), StorageError> {
    let absolute_path = relative_path.to_path(notes_root);

    if let Some(parent) = absolute_path.parent() {
        fs::create_dir_all(parent).map_err(StorageError::Io)?;
    }

    fs::write(&absolute_path, content).map_err(StorageError::Io)
}

pub fn validate_notes_dir(path: &Path) -> Result<(), StorageError> {
    if !path.exists() || !path.is_dir() {
        return Err(StorageError::InvalidNotesDir(
            "Directory does not exist".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::notes_dir_with;

    #[test]
    fn test_validate_notes_dir_exists() {
        let notes_dir = notes_dir_with(&[]);
        let result = validate_notes_dir(notes_dir.path());
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_notes_dir_not_exists() {
        let result = validate_notes_dir(Path::new("/nonexistent/path"));
        assert!(matches!(result, Err(StorageError::InvalidNotesDir(_))));
    }

    #[test]
    fn test_read_file_success() {
        let notes_dir = notes_dir_with(&[("test.md", "# Test Content\n\nParagraph")]);

        let content = read_file(RelativePath::new("test.md"), notes_dir.path()).unwrap();
        assert_eq!(content, "# Test Content\n\nParagraph");
    }

    #[test]
    fn test_read_file_not_found() {
        let notes_dir = notes_dir_with(&[]);
        let result = read_file(RelativePath::new("nonexistent.md"), notes_dir.path());
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_write_file_creates_parent_directories() {
        let notes_dir = notes_dir_with(&[]);
        let relative_path = RelativePath::new("folder/subfolder/new_file.md");

        write_file(relative_path, notes_dir.path(), "# Nested").unwrap();

        let written = read_file(relative_path, notes_dir.path()).unwrap();
        assert_eq!(written, "# Nested");
    }

    #[test]
    fn test_fs_storage_round_trip_and_history() {
        // Given storage over a temp notes directory
        let notes_dir = notes_dir_with(&[]);
        let mut storage = FsStorage::new(notes_dir.path()).unwrap();
        let path = RelativePath::new("daily/today.md");

        // When writing, reading back and leaving the file
        storage.write_file(path, "- [ ] task\n").unwrap();
        let content = storage.read_file(path).unwrap();
        storage.navigated_away(path).unwrap();

        // Then the content survives and the visit is recorded
        assert_eq!(content, "- [ ] task\n");
        assert_eq!(storage.history(), &[RelativePathBuf::from("daily/today.md")]);
        assert_eq!(storage.notes_root(), Some(notes_dir.path()));
    }

    #[test]
    fn test_fs_storage_rejects_missing_root() {
        assert!(FsStorage::new("/this/path/does/not/exist").is_err());
    }
}
