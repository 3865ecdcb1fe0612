use super::Storage;
use crate::error::StorageError;
use relative_path::{RelativePath, RelativePathBuf};
use std::collections::HashMap;
use std::path::PathBuf;

/// In-memory storage that records every write and visit.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    files: HashMap<RelativePathBuf, String>,
    /// Every successful write, in order.
    pub writes: Vec<(RelativePathBuf, String)>,
    /// Every `navigated_away` call, in order.
    pub departures: Vec<RelativePathBuf>,
    /// When set, writes fail with this message.
    pub fail_writes: Option<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<RelativePathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    pub fn content(&self, path: &str) -> Option<&str> {
        self.files
            .get(&RelativePathBuf::from(path))
            .map(String::as_str)
    }
}

impl Storage for MemoryStorage {
    fn read_file(&mut self, path: &RelativePath) -> Result<String, StorageError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(PathBuf::from(path.as_str())))
    }

    fn write_file(&mut self, path: &RelativePath, content: &str) -> Result<(), StorageError> {
        if let Some(message) = &self.fail_writes {
            return Err(StorageError::Io(std::io::Error::other(message.clone())));
        }
        self.files.insert(path.to_relative_path_buf(), content.to_string());
        self.writes.push((path.to_relative_path_buf(), content.to_string()));
        Ok(())
    }

    fn navigated_away(&mut self, path: &RelativePath) -> Result<(), StorageError> {
        self.departures.push(path.to_relative_path_buf());
        Ok(())
    }
}
