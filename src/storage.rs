/// File-backed asset store.
///
/// Asset identity is the generated file name; the two directories are the
/// only persistent state.
use crate::constants::{DERIVATIVE_PREFIX, DERIVATIVE_TOKEN_LEN};
use crate::error::{CompressionError, Result};
use crate::formats::{extension_of, MediaKind, StorageArea};
use crate::validation::{is_safe_stored_name, validate_upload_content, validate_upload_filename};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

const MAX_NAME_ATTEMPTS: usize = 8;

/// An upload that has been written to the original area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub name: String,
    pub original_name: String,
    pub kind: MediaKind,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    uploads_dir: PathBuf,
    compressed_dir: PathBuf,
}

impl MediaStore {
    pub fn new(uploads_dir: impl Into<PathBuf>, compressed_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            compressed_dir: compressed_dir.into(),
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.uploads_dir)?;
        fs::create_dir_all(&self.compressed_dir)?;
        Ok(())
    }

    pub fn dir(&self, area: StorageArea) -> &Path {
        match area {
            StorageArea::Original => &self.uploads_dir,
            StorageArea::Compressed => &self.compressed_dir,
        }
    }

    pub fn dirs(&self) -> [&Path; 2] {
        [&self.uploads_dir, &self.compressed_dir]
    }

    /// Path of an existing asset. Unsafe or unknown names are `NotFound`.
    pub fn resolve(&self, area: StorageArea, name: &str) -> Result<PathBuf> {
        if !is_safe_stored_name(name) {
            return Err(CompressionError::NotFound(name.to_string()));
        }
        let path = self.dir(area).join(name);
        if !path.is_file() {
            return Err(CompressionError::NotFound(name.to_string()));
        }
        Ok(path)
    }

    /// Validate and persist an upload under a fresh opaque name.
    pub fn save_upload(
        &self,
        original_name: &str,
        kind: MediaKind,
        bytes: &[u8],
    ) -> Result<StoredAsset> {
        let ext = validate_upload_filename(original_name, kind)?;
        validate_upload_content(bytes)?;

        let (name, mut file) = self.create_unique(StorageArea::Original, || {
            format!("{}.{}", Uuid::new_v4().simple(), ext)
        })?;
        file.write_all(bytes)?;
        file.sync_all()?;

        info!(
            filename = %name,
            original_name = %original_name,
            kind = %kind,
            bytes = bytes.len(),
            "stored upload"
        );

        Ok(StoredAsset {
            name,
            original_name: original_name.to_string(),
            kind,
            size: bytes.len() as u64,
        })
    }

    /// Reserve a derivative name sharing the source's extension.
    ///
    /// The empty file is created up front so concurrent requests never pick
    /// the same name; backends overwrite it.
    pub fn reserve_derivative(&self, source_name: &str) -> Result<(String, PathBuf)> {
        let ext = extension_of(source_name).ok_or_else(|| {
            CompressionError::Validation(format!("Stored file has no extension: {}", source_name))
        })?;

        let (name, _) = self.create_unique(StorageArea::Compressed, || {
            let token = Uuid::new_v4().simple().to_string();
            format!("{}{}.{}", DERIVATIVE_PREFIX, &token[..DERIVATIVE_TOKEN_LEN], ext)
        })?;
        let path = self.dir(StorageArea::Compressed).join(&name);
        Ok((name, path))
    }

    fn create_unique(
        &self,
        area: StorageArea,
        mut next_name: impl FnMut() -> String,
    ) -> Result<(String, fs::File)> {
        let dir = self.dir(area);
        fs::create_dir_all(dir)?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = next_name();
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(dir.join(&name))
            {
                Ok(file) => return Ok((name, file)),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Err(CompressionError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "could not allocate a unique file name",
        )))
    }
}
