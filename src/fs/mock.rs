// src/fs/mock.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, anyhow};

use super::{FileSystem, normalize};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
}

/// In-memory filesystem for tests.
///
/// Paths are normalized (no `.` components) and stored in a sorted map, so
/// directory listings are deterministic. Parent directories are created
/// implicitly on write.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = normalize(path.as_ref());
        let mut entries = self.lock();
        if let Some(parent) = path.parent() {
            Self::ensure_dirs(&mut entries, parent);
        }
        entries.insert(path, MockEntry::File(content.into()));
    }

    /// All file paths currently stored, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        self.lock()
            .iter()
            .filter(|(_, e)| matches!(e, MockEntry::File(_)))
            .map(|(p, _)| p.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, MockEntry>> {
        // A panic while holding the lock only happens inside a failing test.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_dirs(entries: &mut BTreeMap<PathBuf, MockEntry>, dir: &Path) {
        for ancestor in dir.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            entries
                .entry(ancestor.to_path_buf())
                .or_insert(MockEntry::Dir);
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("invalid UTF-8 in {:?}: {}", path, e))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match self.lock().get(&normalize(path)) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir) => Err(anyhow!("is a directory: {:?}", path)),
            None => Err(anyhow!("file not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let path = normalize(path);
        let mut entries = self.lock();
        if entries.remove(&path).is_none() {
            return Err(anyhow!("not found: {:?}", path));
        }
        entries.retain(|p, _| !p.starts_with(&path));
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(&normalize(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(&normalize(path)), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(&normalize(path)), Some(MockEntry::Dir))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let path = normalize(path);
        let entries = self.lock();
        match entries.get(&path) {
            Some(MockEntry::Dir) => Ok(entries
                .keys()
                .filter(|p| p.parent() == Some(path.as_path()))
                .cloned()
                .collect()),
            _ => Err(anyhow!("not a directory or not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::walk_files;

    #[test]
    fn parents_are_created_and_listed() {
        let fs = MockFileSystem::new();
        fs.add_file("dist/css/a.css", "a");
        fs.add_file("./dist/index.html", "i");

        assert!(fs.is_dir(Path::new("dist/css")));
        assert_eq!(
            fs.read_dir(Path::new("dist")).unwrap(),
            vec![PathBuf::from("dist/css"), PathBuf::from("dist/index.html")]
        );
        assert_eq!(walk_files(&fs, Path::new("dist")).unwrap().len(), 2);
    }

    #[test]
    fn remove_drops_subtree() {
        let fs = MockFileSystem::new();
        fs.add_file("dist/css/a.css", "a");
        fs.add_file("dist/js/b.js", "b");
        fs.remove(Path::new("dist/css")).unwrap();
        assert_eq!(fs.files(), vec![PathBuf::from("dist/js/b.js")]);
        assert!(fs.remove(Path::new("dist/css")).is_err());
    }
}
