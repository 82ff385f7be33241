//! The pluggable storage adapter (component C4, §4.5 of SPEC_FULL.md) and
//! two concrete backends: [`LocalDiskStorage`] for the shipped binary and
//! [`mem::MemStorage`] for the test harness.
//!
//! The trait is deliberately synchronous, the same way the teacher's own
//! `Vfs`/`DatabaseHandle` traits in `src/lib.rs` are: every method returns a
//! plain `Result`, and callers invoke it straight from the async handler's
//! own execution context rather than hopping to a blocking-task pool. SPEC_FULL.md
//! §5 documents this as the intended trade-off for this host ("blocking I/O
//! runs on the request's own execution context"), not an oversight.

use std::path::{Component, Path, PathBuf};

use crate::types::FileId;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("file not found")]
    NotFound,
    #[error("access denied")]
    AccessDenied,
    #[error("a file with that name already exists")]
    AlreadyExists,
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Metadata and byte-level access to the durable file store. Any backend
/// that can answer these questions can be plugged in behind [`crate::state::AppState`].
pub trait Storage: Send + Sync {
    /// `Ok(None)` stands in for the distilled spec's `-1` sentinel: the file
    /// does not exist.
    fn size(&self, id: &FileId) -> StorageResult<Option<u64>>;

    fn read_only(&self, id: &FileId) -> StorageResult<bool>;

    /// An opaque, host-chosen version string; WOPI clients treat it as an
    /// unstructured token, not a number to compare.
    fn version(&self, id: &FileId) -> StorageResult<String>;

    fn read(&self, id: &FileId) -> StorageResult<Vec<u8>>;

    /// Overwrite the bytes of an existing file.
    fn write(&self, id: &FileId, data: &[u8]) -> StorageResult<()>;

    /// Create a new file (or overwrite one with the same name) under `name`.
    fn create_or_overwrite(&self, name: &str, data: &[u8]) -> StorageResult<()>;

    fn delete(&self, id: &FileId) -> StorageResult<()>;

    /// Rename `id` to `new_name`. Returns [`StorageError::AlreadyExists`] on
    /// a name collision.
    fn rename(&self, id: &FileId, new_name: &str) -> StorageResult<()>;

    fn exists(&self, id: &FileId) -> StorageResult<bool> {
        Ok(self.size(id)?.is_some())
    }

    /// Name of the single root folder this host exposes.
    fn root_name(&self) -> &str;

    /// Every file currently stored under the root, for `EnumerateChildren`.
    fn list_root(&self) -> StorageResult<Vec<FileId>>;
}

/// Builds a path under `root` for `id`, rejecting anything that would escape
/// it. `FileId`s come from a single percent-decoded URL segment and could in
/// principle decode to something containing a path separator; this follows
/// the teacher's own `normalize_path` (`durable-object/src/server.rs`) in
/// collapsing `.`/`..` components, then refuses any id that still contains
/// more than one component.
fn safe_path(root: &Path, raw: &str) -> StorageResult<PathBuf> {
    let candidate = Path::new(raw);
    let mut components = candidate.components();
    let only_component = match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => name,
        _ => return Err(StorageError::NotFound),
    };
    Ok(root.join(only_component))
}

/// Flat on-disk storage: every file lives directly under the configured
/// root, the way the teacher's `TestVfs` treats its database path.
pub struct LocalDiskStorage {
    root: PathBuf,
    root_name: String,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let root_name = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("root")
            .to_string();
        Ok(Self { root, root_name })
    }

    fn path_for(&self, id: &FileId) -> StorageResult<PathBuf> {
        safe_path(&self.root, id.as_str())
    }
}

impl Storage for LocalDiskStorage {
    fn size(&self, id: &FileId) -> StorageResult<Option<u64>> {
        let path = self.path_for(id)?;
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_only(&self, id: &FileId) -> StorageResult<bool> {
        let path = self.path_for(id)?;
        let meta = std::fs::metadata(&path)?;
        Ok(meta.permissions().readonly())
    }

    fn version(&self, id: &FileId) -> StorageResult<String> {
        let path = self.path_for(id)?;
        let meta = std::fs::metadata(&path)?;
        let modified = meta.modified()?;
        let nanos = modified
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Ok(nanos.to_string())
    }

    fn read(&self, id: &FileId) -> StorageResult<Vec<u8>> {
        let path = self.path_for(id)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound,
            std::io::ErrorKind::PermissionDenied => StorageError::AccessDenied,
            _ => StorageError::Io(e),
        })
    }

    fn write(&self, id: &FileId, data: &[u8]) -> StorageResult<()> {
        let path = self.path_for(id)?;
        std::fs::write(&path, data).map_err(StorageError::from)
    }

    fn create_or_overwrite(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        let path = safe_path(&self.root, name)?;
        std::fs::write(&path, data).map_err(StorageError::from)
    }

    fn delete(&self, id: &FileId) -> StorageResult<()> {
        let path = self.path_for(id)?;
        std::fs::remove_file(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound,
            _ => StorageError::Io(e),
        })
    }

    fn rename(&self, id: &FileId, new_name: &str) -> StorageResult<()> {
        let from = self.path_for(id)?;
        let to = safe_path(&self.root, new_name)?;
        if to.exists() {
            return Err(StorageError::AlreadyExists);
        }
        std::fs::rename(&from, &to).map_err(StorageError::from)
    }

    fn root_name(&self) -> &str {
        &self.root_name
    }

    fn list_root(&self) -> StorageResult<Vec<FileId>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    out.push(FileId::new(name));
                }
            }
        }
        Ok(out)
    }
}

/// In-memory [`Storage`] used by the test harness, grounded on the teacher's
/// own in-memory `Vfs` demo (`examples/mem.rs`).
pub mod mem {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    struct Entry {
        data: Vec<u8>,
        read_only: bool,
        version: u64,
    }

    #[derive(Default)]
    pub struct MemStorage {
        files: Mutex<HashMap<String, Entry>>,
        root_name: String,
    }

    impl MemStorage {
        pub fn new(root_name: impl Into<String>) -> Self {
            Self {
                files: Mutex::new(HashMap::new()),
                root_name: root_name.into(),
            }
        }

        /// Seed a file directly, bypassing the `Storage` trait, the way a
        /// test's setup phase populates a fixture.
        pub fn seed(&self, name: &str, data: impl Into<Vec<u8>>) {
            let mut files = self.files.lock().unwrap();
            files.insert(
                name.to_string(),
                Entry {
                    data: data.into(),
                    read_only: false,
                    version: 0,
                },
            );
        }
    }

    impl Storage for MemStorage {
        fn size(&self, id: &FileId) -> StorageResult<Option<u64>> {
            let files = self.files.lock().unwrap();
            Ok(files.get(id.as_str()).map(|e| e.data.len() as u64))
        }

        fn read_only(&self, id: &FileId) -> StorageResult<bool> {
            let files = self.files.lock().unwrap();
            files
                .get(id.as_str())
                .map(|e| e.read_only)
                .ok_or(StorageError::NotFound)
        }

        fn version(&self, id: &FileId) -> StorageResult<String> {
            let files = self.files.lock().unwrap();
            files
                .get(id.as_str())
                .map(|e| e.version.to_string())
                .ok_or(StorageError::NotFound)
        }

        fn read(&self, id: &FileId) -> StorageResult<Vec<u8>> {
            let files = self.files.lock().unwrap();
            files
                .get(id.as_str())
                .map(|e| e.data.clone())
                .ok_or(StorageError::NotFound)
        }

        fn write(&self, id: &FileId, data: &[u8]) -> StorageResult<()> {
            let mut files = self.files.lock().unwrap();
            let entry = files.get_mut(id.as_str()).ok_or(StorageError::NotFound)?;
            entry.data = data.to_vec();
            entry.version += 1;
            Ok(())
        }

        fn create_or_overwrite(&self, name: &str, data: &[u8]) -> StorageResult<()> {
            let mut files = self.files.lock().unwrap();
            match files.get_mut(name) {
                Some(entry) => {
                    entry.data = data.to_vec();
                    entry.version += 1;
                }
                None => {
                    files.insert(
                        name.to_string(),
                        Entry {
                            data: data.to_vec(),
                            read_only: false,
                            version: 0,
                        },
                    );
                }
            }
            Ok(())
        }

        fn delete(&self, id: &FileId) -> StorageResult<()> {
            let mut files = self.files.lock().unwrap();
            files
                .remove(id.as_str())
                .map(|_| ())
                .ok_or(StorageError::NotFound)
        }

        fn rename(&self, id: &FileId, new_name: &str) -> StorageResult<()> {
            let mut files = self.files.lock().unwrap();
            if files.contains_key(new_name) {
                return Err(StorageError::AlreadyExists);
            }
            let entry = files.remove(id.as_str()).ok_or(StorageError::NotFound)?;
            files.insert(new_name.to_string(), entry);
            Ok(())
        }

        fn root_name(&self) -> &str {
            &self.root_name
        }

        fn list_root(&self) -> StorageResult<Vec<FileId>> {
            let files = self.files.lock().unwrap();
            Ok(files.keys().map(FileId::new).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mem::MemStorage;
    use super::*;

    #[test]
    fn missing_file_reports_as_absent_size() {
        let storage = MemStorage::new("root");
        assert_eq!(storage.size(&FileId::new("doc.docx")).unwrap(), None);
    }

    #[test]
    fn write_bumps_version() {
        let storage = MemStorage::new("root");
        storage.seed("doc.docx", b"hello".to_vec());
        let v0 = storage.version(&FileId::new("doc.docx")).unwrap();
        storage.write(&FileId::new("doc.docx"), b"world").unwrap();
        let v1 = storage.version(&FileId::new("doc.docx")).unwrap();
        assert_ne!(v0, v1);
    }

    #[test]
    fn rename_refuses_collisions() {
        let storage = MemStorage::new("root");
        storage.seed("a.docx", b"a".to_vec());
        storage.seed("b.docx", b"b".to_vec());
        let err = storage
            .rename(&FileId::new("a.docx"), "b.docx")
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists));
    }

    #[test]
    fn safe_path_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDiskStorage::new(dir.path()).unwrap();
        let err = storage.path_for(&FileId::new("../escape")).unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[test]
    fn local_disk_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDiskStorage::new(dir.path()).unwrap();
        storage.create_or_overwrite("doc.docx", b"hello").unwrap();
        let id = FileId::new("doc.docx");
        assert_eq!(storage.read(&id).unwrap(), b"hello");
        assert_eq!(storage.size(&id).unwrap(), Some(5));
        storage.write(&id, b"hello world").unwrap();
        assert_eq!(storage.read(&id).unwrap(), b"hello world");
    }
}
