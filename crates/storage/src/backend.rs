use crate::{StorageError, StorageResult};
use directories::ProjectDirs;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// String key/value storage in the shape of a browser `Storage` object.
pub trait KeyValueBackend: Send + Sync {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

/// Process-local backend; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.items.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.items.lock().remove(key);
        Ok(())
    }
}

/// One JSON file per key under a root directory.
///
/// Keys are percent-encoded into file names so that distinct keys (often
/// document URLs) never share a file; very long keys are shortened with a
/// digest. Writes go through a temporary file and a
/// rename.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn from_default_project() -> StorageResult<Self> {
        let dirs = ProjectDirs::from("dev", "Marginalia", "Marginalia")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self { root: dirs.data_local_dir().join("annotations") })
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for_key(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", encode_key(key)))
    }
}

impl KeyValueBackend for FileBackend {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        match fs::read_to_string(self.path_for_key(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        fs::create_dir_all(&self.root)?;

        let path = self.path_for_key(key);
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, value)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        match fs::remove_file(self.path_for_key(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }
}

/// Longest encoded key used verbatim as a file stem.
const MAX_PLAIN_STEM: usize = 160;
/// Readable part kept in front of the digest for longer keys.
const DIGEST_PREFIX: usize = 96;

/// Percent-encode `key` into a file stem. Keys that would encode past
/// [`MAX_PLAIN_STEM`] become a readable prefix, `~` and the key's blake3
/// digest; `~` never appears in a plain stem.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    if encoded.len() <= MAX_PLAIN_STEM {
        return encoded;
    }

    // The stem is pure ASCII, so any byte index is a char boundary.
    encoded.truncate(DIGEST_PREFIX);
    encoded.push('~');
    encoded.push_str(blake3::hash(key.as_bytes()).to_hex().as_str());
    encoded
}
