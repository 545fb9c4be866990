//! Content-addressed file placement shared by the binary and unit steps

use std::fs::{self, Permissions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::ProvisionError;

/// SHA256 of `content` (hex-encoded)
pub(crate) fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// SHA256 of the file at `path`, or `None` if it does not exist
pub(crate) fn existing_hash(path: &Path) -> Result<Option<String>, ProvisionError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(content_hash(&bytes))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ProvisionError::io(path, e)),
    }
}

/// Write `content` to `path` unless it already holds the same bytes.
///
/// The new content goes to a sibling temporary file that is renamed over `path`,
/// so readers never see a partial file and a running executable can be replaced.
/// Returns whether the file changed.
pub(crate) fn place_file(path: &Path, content: &[u8], mode: u32) -> Result<bool, ProvisionError> {
    if existing_hash(path)?.as_deref() == Some(content_hash(content).as_str()) {
        return Ok(false);
    }

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(|e| ProvisionError::io(dir, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".exporter-init-")
        .tempfile_in(dir)
        .map_err(|e| ProvisionError::io(dir, e))?;
    tmp.write_all(content)
        .and_then(|()| tmp.as_file().set_permissions(Permissions::from_mode(mode)))
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| ProvisionError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| ProvisionError::io(path, e.error))?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_file_skips_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin/tool");

        assert!(place_file(&path, b"v1", 0o755).unwrap());
        assert!(!place_file(&path, b"v1", 0o755).unwrap());
        assert!(place_file(&path, b"v2", 0o755).unwrap());

        assert_eq!(fs::read(&path).unwrap(), b"v2");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_existing_hash_of_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(existing_hash(&dir.path().join("absent")).unwrap(), None);
    }
}
