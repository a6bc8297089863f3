use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, trace};

/// Sidecar file that serializes access to `path`. Documents are replaced by renaming, so the
/// lock can't live on the document itself.
fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

async fn open_lock(path: &Path) -> Result<File, std::io::Error> {
    File::options()
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path(path))
        .await
}

/// Reads the whole document. A missing document is `None`, every other failure is an error.
pub async fn read_document(path: &Path) -> Result<Option<Vec<u8>>> {
    let lock = open_lock(path).await?;
    lock.lock_shared()?;
    let result = tokio::fs::read(path).await;
    lock.unlock_async().await?;

    match result {
        Ok(bytes) => {
            trace!("Read {} bytes from {path:?}", bytes.len());
            Ok(Some(bytes))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{path:?} doesn't exist yet");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Replaces the document with `bytes`. The data is written next to the target and renamed over
/// it, so readers see either the old or the new content, never a partial write.
pub async fn write_document(path: &Path, bytes: &[u8]) -> Result<()> {
    let lock = open_lock(path).await?;
    lock.lock_exclusive()?;
    let result = write_and_rename(path, bytes).await;
    lock.unlock_async().await?;
    result
}

async fn write_and_rename(path: &Path, bytes: &[u8]) -> Result<()> {
    let temporary = temporary_path(path);
    let mut file = File::create(&temporary).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&temporary, path).await?;
    trace!("Wrote {} bytes into {path:?}", bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{read_document, write_document};

    #[tokio::test]
    async fn test_read_missing_document() -> Result<()> {
        let dir = tempdir()?;
        assert_eq!(read_document(&dir.path().join("missing.json")).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_write_replaces_document() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("doc.json");

        write_document(&path, b"first version, longer than the second").await?;
        write_document(&path, b"second").await?;

        assert_eq!(read_document(&path).await?, Some(b"second".to_vec()));
        assert!(!dir.path().join("doc.json.tmp").exists());
        Ok(())
    }
}
