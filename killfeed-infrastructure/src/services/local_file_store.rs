//! `RemoteFileStore` over a locally mounted or synced directory.

use std::io::ErrorKind;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;

use killfeed_domain::ports::RemoteFileStore;
use killfeed_domain::RemoteFileError;

#[derive(Debug, Default, Clone)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> Self {
        Self
    }
}

fn map_io_error(path: &str, err: std::io::Error) -> RemoteFileError {
    match err.kind() {
        ErrorKind::NotFound => RemoteFileError::NotFound(path.to_string()),
        ErrorKind::PermissionDenied => RemoteFileError::PermissionDenied(path.to_string()),
        _ => RemoteFileError::transient(path, err),
    }
}

/// Complete lines after the first `from_line`. A trailing fragment without a
/// newline is still being written and is left for the next read.
fn lines_after(content: &str, from_line: u64) -> Vec<String> {
    let complete = match content.rfind('\n') {
        Some(end) => &content[..end],
        None => return Vec::new(),
    };
    complete
        .split('\n')
        .skip(usize::try_from(from_line).unwrap_or(usize::MAX))
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect()
}

#[async_trait]
impl RemoteFileStore for LocalFileStore {
    async fn size(&self, path: &str) -> Result<u64, RemoteFileError> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|err| map_io_error(path, err))?;
        Ok(metadata.len())
    }

    async fn last_modified(&self, path: &str) -> Result<DateTime<Utc>, RemoteFileError> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|err| map_io_error(path, err))?;
        let modified = metadata
            .modified()
            .map_err(|err| map_io_error(path, err))?;
        Ok(DateTime::<Utc>::from(modified))
    }

    async fn exists(&self, path: &str) -> Result<bool, RemoteFileError> {
        match fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(map_io_error(path, err)),
        }
    }

    async fn read_lines_after(
        &self,
        path: &str,
        from_line: u64,
    ) -> Result<Vec<String>, RemoteFileError> {
        let bytes = fs::read(path)
            .await
            .map_err(|err| map_io_error(path, err))?;
        let content = String::from_utf8_lossy(&bytes);
        Ok(lines_after(&content, from_line))
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<(), RemoteFileError> {
        fs::write(path, content)
            .await
            .map_err(|err| map_io_error(path, err))
    }
}
