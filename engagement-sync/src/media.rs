use crate::types::Result;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Directory the application owns for draft images. Files outside it belong
/// to the operator and are never removed.
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    root: PathBuf,
}

impl MediaLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True only for a plain file name directly under the root. Paths that
    /// climb out with `..` or reach into subdirectories are not managed.
    pub fn is_managed(&self, path: &Path) -> bool {
        match path.strip_prefix(&self.root) {
            Ok(rest) => {
                let mut components = rest.components();
                matches!(
                    (components.next(), components.next()),
                    (Some(Component::Normal(_)), None)
                )
            }
            Err(_) => false,
        }
    }

    /// Copies `source` into the library under a fresh name, keeping its
    /// extension. Every draft gets its own copy; only `current`, the file the
    /// draft already owns, is reused as-is.
    pub async fn import(&self, source: &Path, current: Option<&Path>) -> Result<PathBuf> {
        if current.is_some_and(|owned| owned == source && self.is_managed(owned)) {
            debug!("Keeping media {}", source.display());
            return Ok(source.to_path_buf());
        }

        fs::create_dir_all(&self.root).await?;

        let file_name = match source.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let destination = self.root.join(file_name);

        fs::copy(source, &destination).await?;
        info!("Imported media {} as {}", source.display(), destination.display());
        Ok(destination)
    }

    pub async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(path).await?)
    }

    /// Best-effort removal of a managed file. Failures are logged and
    /// swallowed; the caller's own change has already been committed.
    pub async fn discard(&self, path: &Path) {
        if path.as_os_str().is_empty() || !self.is_managed(path) {
            debug!("Leaving unmanaged media in place: {}", path.display());
            return;
        }

        match fs::remove_file(path).await {
            Ok(()) => info!("Removed media {}", path.display()),
            Err(e) => warn!("Could not remove media {}: {}", path.display(), e),
        }
    }
}
