use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::domain::repository::ImageStore;
use crate::error::BoardServiceError;

/// Stores uploads as flat files under the media root.
#[derive(Clone)]
pub struct LocalImageStore {
    pub root: PathBuf,
}

/// `<unix seconds>.<microseconds><ext>`, e.g. `1767225600.123456.jpg`.
pub fn timestamp_file_name(now: DateTime<Utc>, original_name: &str) -> String {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!(
        "{}.{:06}{ext}",
        now.timestamp(),
        now.timestamp_subsec_micros()
    )
}

/// Stored names never contain separators, so anything else is refused.
fn is_flat_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

/// Write `data` to a freshly created file, removing the file if the write fails.
async fn fill_or_discard<W>(path: &Path, file: &mut W, data: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match file.write_all(data).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    if written.is_err() {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove partial image file");
        }
    }
    written
}

impl ImageStore for LocalImageStore {
    async fn save(&self, original_name: &str, data: &[u8]) -> Result<String, BoardServiceError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("create media root {}", self.root.display()))?;

        let base = timestamp_file_name(Utc::now(), original_name);
        let mut name = base.clone();
        let mut attempt = 0;
        let mut file = loop {
            let path = self.root.join(&name);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => break file,
                // Two uploads in the same microsecond.
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempt < 16 => {
                    attempt += 1;
                    name = match base.rsplit_once('.') {
                        Some((stem, ext)) if base.matches('.').count() > 1 => {
                            format!("{stem}_{attempt}.{ext}")
                        }
                        _ => format!("{base}_{attempt}"),
                    };
                }
                Err(e) => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("create image file {}", path.display()))
                        .into());
                }
            }
        };
        fill_or_discard(&self.root.join(&name), &mut file, data)
            .await
            .with_context(|| format!("write image file {name}"))?;
        Ok(name)
    }

    async fn remove(&self, path: &str) -> Result<(), BoardServiceError> {
        if !is_flat_name(path) {
            tracing::warn!(path, "refusing to remove non-media path");
            return Ok(());
        }
        match tokio::fs::remove_file(self.root.join(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("remove image file {path}"))
                .into()),
        }
    }
}
