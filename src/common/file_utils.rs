use crate::error::{Result, RiptideError};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Ensure `destination` is an existing directory this process can write to.
///
/// Writability is checked by creating and removing a throwaway file.
pub fn check_destination(destination: &Path) -> Result<PathBuf> {
    let unwritable = || RiptideError::DestinationUnwritable {
        path: destination.to_path_buf(),
    };

    let metadata = fs::metadata(destination).map_err(|e| {
        debug!("Destination {} is not accessible: {}", destination.display(), e);
        unwritable()
    })?;

    if !metadata.is_dir() || metadata.permissions().readonly() {
        return Err(unwritable());
    }

    tempfile::Builder::new()
        .prefix(".riptide-")
        .tempfile_in(destination)
        .map_err(|e| {
            debug!("Destination {} is not writable: {}", destination.display(), e);
            unwritable()
        })?;

    Ok(destination
        .canonicalize()
        .unwrap_or_else(|_| destination.to_path_buf()))
}

/// Write `content` to `path` and wait until it has been flushed.
///
/// A file that was created but could not be fully written is removed again.
pub async fn write_file(path: &Path, content: &str) -> Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    let written: std::io::Result<()> = async {
        file.write_all(content.as_bytes()).await?;
        file.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(file);
        if let Err(cleanup) = tokio::fs::remove_file(path).await {
            debug!("Could not remove partial {}: {}", path.display(), cleanup);
        }
        return Err(e.into());
    }
    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

pub async fn delete_file(path: &Path) -> Result<()> {
    tokio::fs::remove_file(path).await?;
    debug!("Removed {}", path.display());
    Ok(())
}

/// Checks if a file exists and is readable
pub fn is_readable_file(path: &Path) -> bool {
    path.is_file() && fs::metadata(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_destination_accepts_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(check_destination(temp_dir.path()).is_ok());
    }

    #[test]
    fn test_check_destination_leaves_directory_untouched() {
        let temp_dir = TempDir::new().unwrap();
        check_destination(temp_dir.path()).unwrap();
        check_destination(temp_dir.path()).unwrap();

        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_check_destination_rejects_missing_and_files() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        assert!(matches!(
            check_destination(&missing),
            Err(RiptideError::DestinationUnwritable { .. })
        ));

        let file = temp_dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        assert!(check_destination(&file).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_check_destination_rejects_read_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let locked = temp_dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        assert!(check_destination(&locked).is_err());

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Dockerfile");

        write_file(&path, "FROM scratch\n").await.unwrap();
        assert!(is_readable_file(&path));
        assert_eq!(fs::read_to_string(&path).unwrap(), "FROM scratch\n");

        delete_file(&path).await.unwrap();
        assert!(!is_readable_file(&path));
    }
}
