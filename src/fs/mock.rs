// src/fs/mock.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};

use super::FileSystem;

/// In-memory filesystem for tests.
///
/// Stores files in a flat map; directories exist implicitly as the parents
/// of stored files. Writes under a marked path can be made to fail to
/// exercise upload error paths.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    fail_writes_under: Arc<Mutex<Option<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut files = self.files.lock().unwrap();
        files.insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Make every write under `path` fail with an IO-style error.
    pub fn fail_writes_under(&self, path: impl AsRef<Path>) {
        *self.fail_writes_under.lock().unwrap() = Some(path.as_ref().to_path_buf());
    }

    pub fn file_content(&self, path: impl AsRef<Path>) -> Option<String> {
        let files = self.files.lock().unwrap();
        files
            .get(path.as_ref())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(content) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(prefix) = self.fail_writes_under.lock().unwrap().as_ref()
            && path.starts_with(prefix)
        {
            return Err(anyhow!("write refused under {:?}", prefix));
        }
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock().unwrap();
        files.contains_key(path) || files.keys().any(|p| p.starts_with(path) && p != path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files.lock().unwrap();
        let entries: Vec<PathBuf> = files
            .keys()
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect();

        if entries.is_empty() && !files.keys().any(|p| p.starts_with(path)) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        Ok(entries)
    }
}
