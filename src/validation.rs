use crate::error::{CompressionError, Result};
use crate::formats::{extension_of, MediaKind};
use std::path::{Component, Path};

/// Validate a user-supplied upload filename against the kind's allow-list.
///
/// The name is display-only; only its lowercased extension is kept.
pub fn validate_upload_filename(filename: &str, kind: MediaKind) -> Result<String> {
    if filename.trim().is_empty() {
        return Err(CompressionError::Validation("No file selected".to_string()));
    }

    match extension_of(filename) {
        Some(ext) if kind.allows_extension(&ext) => Ok(ext),
        ext => Err(CompressionError::UnsupportedExtension {
            kind: kind.as_str(),
            extension: ext.unwrap_or_default(),
            allowed: kind
                .allowed_extensions()
                .iter()
                .map(|e| e.to_uppercase())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

pub fn validate_upload_content(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(CompressionError::Validation(
            "Uploaded file is empty".to_string(),
        ));
    }
    Ok(())
}

/// Stored names are generated by us; anything that is not a single plain
/// path component cannot be one of them.
pub fn is_safe_stored_name(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
