//! File-backed secret record store
//!
//! Updates are read-modify-write of the whole record followed by an atomic
//! replace (write to a sibling temp file, then rename). A reader never sees a
//! half-written file, but two processes updating the same file at once can
//! still lose one of the updates: the store assumes a single writer at a
//! time.

use std::path::{Path, PathBuf};

use bodypace_core::{BodypaceError, BodypaceResult};

use crate::record::{SecretRecord, SecretUpdate, RECORD_VERSION};

/// Whole-record read and single-field update of the secret record.
pub trait SecretStore {
    /// Read the full record. A store that has never been written reads as an
    /// empty record.
    fn load(&self) -> BodypaceResult<SecretRecord>;

    /// Apply one field update and persist the whole record. Returns the
    /// record as written.
    fn update(&self, update: SecretUpdate) -> BodypaceResult<SecretRecord>;
}

/// Secret record persisted as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, record: &SecretRecord) -> BodypaceResult<()> {
        let json = serde_json::to_string_pretty(record)?;
        atomic_replace(&self.path, json.as_bytes())
    }
}

impl SecretStore for FileSecretStore {
    fn load(&self) -> BodypaceResult<SecretRecord> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no secret record yet, using empty record");
            return Ok(SecretRecord::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let record: SecretRecord = serde_json::from_str(&content).map_err(|e| {
            BodypaceError::Secrets(format!("parsing {}: {e}", self.path.display()))
        })?;

        if record.version > RECORD_VERSION {
            return Err(BodypaceError::SchemaVersion {
                what: "secret record",
                found: record.version,
                supported: RECORD_VERSION,
            });
        }
        Ok(record)
    }

    fn update(&self, update: SecretUpdate) -> BodypaceResult<SecretRecord> {
        let field = update.field_name();
        let mut record = self.load()?;
        update.apply(&mut record);
        self.save(&record)?;
        tracing::debug!(path = %self.path.display(), field, "secret record updated");
        Ok(record)
    }
}

/// Atomically replace a file with new content.
///
/// Writes to a temp file in the same directory, then renames over the
/// target. On Unix the file is created owner-read/write only.
fn atomic_replace(path: &Path, content: &[u8]) -> BodypaceResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    write_private(&tmp_path, content)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(content)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, content)
}
