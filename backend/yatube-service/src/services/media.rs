/// Media storage for post images
///
/// Files are written below `MEDIA_ROOT/posts/` under a random name; the
/// returned key (`posts/<uuid>.<ext>`) is what the post row stores. Serving the
/// files is left to the web server in front of the service.
use crate::error::{AppError, Result};
use crate::services::image::ValidatedImage;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const POSTS_DIR: &str = "posts";

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Persist a validated image and return its media key
    pub async fn save_post_image(&self, image: &ValidatedImage) -> Result<String> {
        let dir = self.root.join(POSTS_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let key = format!("{}/{}.{}", POSTS_DIR, Uuid::new_v4(), image.extension());
        tokio::fs::write(self.root.join(&key), &image.data).await?;

        debug!(%key, bytes = image.data.len(), "Stored post image");
        Ok(key)
    }

    /// Absolute path of a stored key; rejects keys escaping the media root
    pub fn path_of(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(AppError::BadRequest(format!("invalid media key: {}", key)));
        }
        Ok(self.root.join(relative))
    }

    /// Best-effort removal; a missing file is not an error
    pub async fn remove(&self, key: &str) {
        let path = match self.path_of(key) {
            Ok(path) => path,
            Err(e) => {
                warn!(%key, error = %e, "Refusing to remove media outside root");
                return;
            }
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(%key, "Removed post image"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(%key, error = %e, "Failed to remove post image"),
        }
    }
}
