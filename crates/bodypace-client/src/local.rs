//! Local encrypt/decrypt workflows.
//!
//! An encrypted document on disk is a pair of files:
//! ```text
//! <encrypted-name>        ciphertext bytes
//! <encrypted-name>.keys   document key wrapped by the personal key (base64 text)
//! ```
//! The `.keys` sidecar plays the role of the server's `keys` field and must
//! sit next to its data file for decryption to succeed.
//!
//! Destinations are never overwritten: an existing target fails with
//! `DestinationExists` before any content is decrypted or written.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use bodypace_core::types::FetchedDocument;
use bodypace_crypto::{envelope, PersonalKey};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Longest file name most local filesystems accept, in bytes.
const MAX_FILE_NAME_LEN: usize = 255;

/// Files written by [`encrypt_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedArtifact {
    pub data_path: PathBuf,
    pub keys_path: PathBuf,
}

/// Path of the `.keys` sidecar belonging to `data_path`.
pub fn keys_sidecar_path(data_path: &Path) -> PathBuf {
    let mut name = OsString::from(data_path.as_os_str());
    name.push(".keys");
    PathBuf::from(name)
}

/// Encrypt `input` into `output_dir` as `<encrypted-name>` + `<encrypted-name>.keys`.
pub async fn encrypt_file(
    input: &Path,
    output_dir: &Path,
    personal_key: &PersonalKey,
) -> ClientResult<EncryptedArtifact> {
    ensure_file(input, "inputFile").await?;
    ensure_dir(output_dir, "outputDir").await?;

    let filename = file_name_of(input)?;
    let content = tokio::fs::read(input).await?;
    let sealed = envelope::wrap(&filename, &content, personal_key)?;

    // The sidecar name is the longer of the two
    let sidecar_len = sealed.encrypted_name.len() + ".keys".len();
    if sidecar_len > MAX_FILE_NAME_LEN {
        return Err(ClientError::InvalidPath(format!(
            "inputFile name is too long to encrypt ({} bytes encrypted, limit {MAX_FILE_NAME_LEN})",
            sidecar_len
        )));
    }

    let data_path = output_dir.join(&sealed.encrypted_name);
    let keys_path = keys_sidecar_path(&data_path);
    ensure_vacant(&data_path).await?;
    ensure_vacant(&keys_path).await?;

    write_new(&data_path, &sealed.encrypted_content).await?;
    write_new(&keys_path, sealed.wrapped_key.as_bytes()).await?;
    debug!(input = %input.display(), output = %data_path.display(), "file encrypted");

    Ok(EncryptedArtifact {
        data_path,
        keys_path,
    })
}

/// Decrypt an `<encrypted-name>` file (with its `.keys` sidecar) into
/// `output_dir`, restoring the original filename. Returns the written path.
pub async fn decrypt_file(
    input: &Path,
    output_dir: &Path,
    personal_key: &PersonalKey,
) -> ClientResult<PathBuf> {
    ensure_file(input, "inputFile").await?;
    let keys_path = keys_sidecar_path(input);
    ensure_file(&keys_path, "inputFile keys").await?;
    ensure_dir(output_dir, "outputDir").await?;

    let wrapped_key = tokio::fs::read_to_string(&keys_path).await?;
    let encrypted_name = file_name_of(input)?;
    let (document_key, name) = envelope::unwrap(&encrypted_name, &wrapped_key, personal_key)?;
    let output = output_dir.join(safe_file_name(&name)?);
    ensure_vacant(&output).await?;

    let ciphertext = tokio::fs::read(input).await?;
    let content = envelope::unwrap_content(&ciphertext, &document_key)?;
    write_new(&output, &content).await?;
    debug!(input = %input.display(), output = %output.display(), "file decrypted");

    Ok(output)
}

/// Write a fetched document into `dir`.
///
/// The file is named `name_override` if given, else the document's filename.
/// The override is joined to `dir` as given and may contain separators;
/// only the server-supplied filename is checked for escaping `dir`.
/// A document that was not decrypted also gets its wrapped key written to a
/// `.keys` sidecar so it can be decrypted locally later. Returns the paths
/// written, data file first.
pub async fn save_fetched(
    document: &FetchedDocument,
    name_override: Option<&str>,
    dir: &Path,
) -> ClientResult<Vec<PathBuf>> {
    let data_path = match name_override {
        Some(name) => dir.join(name),
        None => dir.join(safe_file_name(&document.filename)?),
    };
    let keys_path = keys_sidecar_path(&data_path);

    ensure_vacant(&data_path).await?;
    if !document.decrypted {
        ensure_vacant(&keys_path).await?;
    }

    write_new(&data_path, &document.content).await?;
    let mut written = vec![data_path];
    if !document.decrypted {
        write_new(&keys_path, document.keys.as_bytes()).await?;
        written.push(keys_path);
    }
    Ok(written)
}

async fn ensure_file(path: &Path, what: &str) -> ClientResult<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(ClientError::InvalidPath(format!(
            "{what} is not a file ({})",
            path.display()
        ))),
        Err(_) => Err(ClientError::InvalidPath(format!(
            "{what} not found ({})",
            path.display()
        ))),
    }
}

async fn ensure_dir(path: &Path, what: &str) -> ClientResult<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ClientError::InvalidPath(format!(
            "{what} is not a directory ({})",
            path.display()
        ))),
        Err(_) => Err(ClientError::InvalidPath(format!(
            "{what} not found ({})",
            path.display()
        ))),
    }
}

async fn ensure_vacant(path: &Path) -> ClientResult<()> {
    if tokio::fs::symlink_metadata(path).await.is_ok() {
        return Err(ClientError::DestinationExists(path.to_path_buf()));
    }
    Ok(())
}

/// Create `path` and write `content`, refusing to replace an existing file.
async fn write_new(path: &Path, content: &[u8]) -> ClientResult<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => ClientError::DestinationExists(path.to_path_buf()),
            _ => ClientError::Io(e),
        })?;
    file.write_all(content).await?;
    file.flush().await?;
    Ok(())
}

fn file_name_of(path: &Path) -> ClientResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| ClientError::InvalidPath(format!("no usable file name in {}", path.display())))
}

/// Reject names that would escape the destination directory.
fn safe_file_name(name: &str) -> ClientResult<&str> {
    let as_path = Path::new(name);
    if name.is_empty()
        || name == "."
        || name == ".."
        || as_path.file_name().map(|n| n != as_path.as_os_str()).unwrap_or(true)
    {
        return Err(ClientError::InvalidPath(format!(
            "refusing to write document with unsafe file name {name:?}"
        )));
    }
    Ok(name)
}
