//! File-system helpers

use std::path::Path;

use crate::utils::error::{AppError, AppResult};

/// Verify that files can be created in `dir`.
///
/// Creates and immediately removes a scratch file. Video output is written
/// next to it, so failing here up front avoids capturing frames that could
/// never be saved.
pub fn ensure_writable(dir: &Path) -> AppResult<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| {
            AppError::PermissionDenied(format!("cannot create {}: {}", dir.display(), e))
        })?;
    }

    let probe = tempfile::Builder::new()
        .prefix(".camstash-probe")
        .tempfile_in(dir)
        .map_err(|e| {
            AppError::PermissionDenied(format!(
                "failed to create file in {}: {}",
                dir.display(),
                e
            ))
        })?;

    probe
        .close()
        .map_err(|e| AppError::PermissionDenied(format!("failed to remove probe file: {}", e)))?;

    tracing::debug!("Write permission confirmed for {:?}", dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_writable_dir_leaves_no_probe_behind() {
        let dir = tempdir().unwrap();
        ensure_writable(dir.path()).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_dir_is_created() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("videos").join("run-1");
        ensure_writable(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_path_that_is_a_file_is_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let err = ensure_writable(&file).unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
    }
}
