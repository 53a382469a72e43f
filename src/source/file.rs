use async_trait::async_trait;
use std::path::{Path, PathBuf};
use crate::core::Snapshot;
use crate::source::{parse_snapshot_str, SnapshotSource, SourceError};

/// Playlist collection kept in a local JSON file, e.g. an export of the
/// database or a hand-written playlist for an offline screen
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    name: String,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            name: format!("file:{}", path.display()),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;
        parse_snapshot_str(&text)
    }
}
