#![allow(dead_code)]

use image::{DynamicImage, ImageOutputFormat, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use yatube_service::cache::ListingCache;
use yatube_service::config::PaginationConfig;
use yatube_service::models::{Group, NewGroup, NewUser, User};
use yatube_service::repository::{ContentRepository, MemoryContentRepository};
use yatube_service::services::{ImageUpload, MediaStorage, PostForm};
use yatube_service::AppState;

pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024;

/// Application state over the in-memory repository and a throwaway media root
pub struct TestEnv {
    pub state: AppState,
    pub media_dir: TempDir,
}

impl TestEnv {
    pub fn repo(&self) -> &Arc<dyn ContentRepository> {
        &self.state.repo
    }

    pub fn media_root(&self) -> &Path {
        self.media_dir.path()
    }
}

pub fn test_env() -> TestEnv {
    test_env_with_cache(ListingCache::disabled())
}

pub fn test_env_with_cache(cache: ListingCache) -> TestEnv {
    let media_dir = tempfile::tempdir().expect("create media dir");
    let repo: Arc<dyn ContentRepository> = Arc::new(MemoryContentRepository::new());

    let state = AppState::new(
        repo,
        Arc::new(cache),
        MediaStorage::new(media_dir.path()),
        MAX_UPLOAD_BYTES,
        PaginationConfig::default(),
    );

    TestEnv { state, media_dir }
}

pub async fn create_user(repo: &Arc<dyn ContentRepository>, username: &str) -> User {
    repo.create_user(NewUser {
        username: username.to_string(),
        email: format!("{}@yatube.dev", username),
        password_hash: "not-a-real-hash".to_string(),
    })
    .await
    .expect("create user")
}

pub async fn create_group(repo: &Arc<dyn ContentRepository>, slug: &str) -> Group {
    repo.create_group(NewGroup {
        title: format!("Group {}", slug),
        slug: slug.to_string(),
        description: format!("About {}", slug),
    })
    .await
    .expect("create group")
}

pub fn text_form(text: &str) -> PostForm {
    PostForm {
        text: text.to_string(),
        ..PostForm::default()
    }
}

pub fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageOutputFormat::Png)
        .expect("encode png");
    buf.into_inner()
}

pub fn png_upload(filename: &str) -> ImageUpload {
    ImageUpload {
        filename: filename.to_string(),
        data: png_bytes(),
    }
}

/// Number of regular files below `dir`, recursively
pub fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}
