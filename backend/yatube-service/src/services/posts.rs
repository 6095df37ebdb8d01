/// Post service - handles post creation, editing and deletion
///
/// Input is fully validated (text, group, image) before anything is written,
/// so a rejected form leaves neither a row nor a file behind.
use crate::cache::{ListingCache, ListingKey};
use crate::error::{AppError, Result};
use crate::metrics::{POSTS_CREATED, POSTS_EDITED};
use crate::models::{GroupId, NewPost, Post, PostChanges, PostId, UserId};
use crate::repository::ContentRepository;
use crate::services::image::{validate_image, ImageUpload, ValidatedImage};
use crate::services::media::MediaStorage;
use crate::services::permissions::{check_post_deletion, check_post_update};
use std::sync::Arc;
use tracing::{debug, info};

/// Submitted post fields
#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub text: String,
    pub group_id: Option<GroupId>,
    pub image: Option<ImageUpload>,
}

/// PostForm after validation, image not yet stored
struct CleanPost {
    text: String,
    group_id: Option<GroupId>,
    image: Option<ValidatedImage>,
}

pub struct PostService {
    repo: Arc<dyn ContentRepository>,
    media: MediaStorage,
    max_upload_bytes: usize,
    cache: Arc<ListingCache>,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn ContentRepository>,
        media: MediaStorage,
        max_upload_bytes: usize,
        cache: Arc<ListingCache>,
    ) -> Self {
        Self {
            repo,
            media,
            max_upload_bytes,
            cache,
        }
    }

    /// Get a post by ID
    pub async fn get_post(&self, post_id: PostId) -> Result<Post> {
        self.repo
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
    }

    /// Create a post for `author_id`
    pub async fn create_post(&self, author_id: UserId, form: PostForm) -> Result<Post> {
        let clean = self.clean(form).await?;

        let image_key = match &clean.image {
            Some(image) => Some(self.media.save_post_image(image).await?),
            None => None,
        };

        let result = self
            .repo
            .create_post(NewPost {
                author_id,
                text: clean.text,
                group_id: clean.group_id,
                image: image_key.clone(),
            })
            .await;

        let post = match result {
            Ok(post) => post,
            Err(e) => {
                if let Some(key) = &image_key {
                    self.media.remove(key).await;
                }
                return Err(e);
            }
        };

        POSTS_CREATED.inc();
        info!(post_id = post.id, author_id, group_id = ?post.group_id, "Post created");

        self.invalidate_listings(author_id, &[post.group_id]).await;
        Ok(post)
    }

    /// Overwrite text and group of a post; the image changes only when a new one is sent
    pub async fn edit_post(
        &self,
        post_id: PostId,
        editor_id: UserId,
        form: PostForm,
    ) -> Result<Post> {
        let existing = self.get_post(post_id).await?;
        check_post_update(editor_id, &existing)?;

        let clean = self.clean(form).await?;

        let new_image = match &clean.image {
            Some(image) => Some(self.media.save_post_image(image).await?),
            None => None,
        };

        let changes = PostChanges {
            text: clean.text,
            group_id: clean.group_id,
            image: new_image.clone(),
        };

        let updated = match self.repo.update_post(post_id, editor_id, changes).await {
            Ok(Some(post)) => post,
            Ok(None) => {
                if let Some(key) = &new_image {
                    self.media.remove(key).await;
                }
                // deleted between the ownership check and the update
                return Err(AppError::NotFound(format!("post {}", post_id)));
            }
            Err(e) => {
                if let Some(key) = &new_image {
                    self.media.remove(key).await;
                }
                return Err(e);
            }
        };

        if new_image.is_some() {
            if let Some(old) = existing.image.as_deref() {
                self.media.remove(old).await;
            }
        }

        POSTS_EDITED.inc();
        info!(post_id, editor_id, group_id = ?updated.group_id, "Post edited");

        self.invalidate_listings(editor_id, &[existing.group_id, updated.group_id])
            .await;
        Ok(updated)
    }

    /// Delete a post and its comments
    pub async fn delete_post(&self, post_id: PostId, actor_id: UserId) -> Result<()> {
        let existing = self.get_post(post_id).await?;
        check_post_deletion(actor_id, &existing)?;

        if !self.repo.delete_post(post_id, actor_id).await? {
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }

        if let Some(key) = existing.image.as_deref() {
            self.media.remove(key).await;
        }

        info!(post_id, actor_id, "Post deleted");
        self.invalidate_listings(actor_id, &[existing.group_id]).await;
        Ok(())
    }

    async fn clean(&self, form: PostForm) -> Result<CleanPost> {
        let text = form.text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("text: this field is required".to_string()));
        }

        if let Some(group_id) = form.group_id {
            if self.repo.get_group(group_id).await?.is_none() {
                return Err(AppError::NotFound(format!("group {}", group_id)));
            }
        }

        let image = match form.image {
            Some(upload) => Some(validate_image(upload, self.max_upload_bytes).await?),
            None => None,
        };

        Ok(CleanPost {
            text: text.to_string(),
            group_id: form.group_id,
            image,
        })
    }

    /// Drop cached index, group and author-profile listings after a write.
    /// Failures to resolve names only mean those listings age out by TTL.
    async fn invalidate_listings(&self, author_id: UserId, groups: &[Option<GroupId>]) {
        if !self.cache.invalidates_on_write() {
            return;
        }
        let cache = &self.cache;

        let mut removed = cache.invalidate_prefix(&ListingKey::index_prefix());

        if let Ok(Some(author)) = self.repo.get_user(author_id).await {
            removed += cache.invalidate_prefix(&ListingKey::profile_prefix(&author.username));
        }

        let mut seen = Vec::with_capacity(groups.len());
        for group_id in groups.iter().flatten() {
            if seen.contains(group_id) {
                continue;
            }
            seen.push(*group_id);
            if let Ok(Some(group)) = self.repo.get_group(*group_id).await {
                removed += cache.invalidate_prefix(&ListingKey::group_prefix(&group.slug));
            }
        }

        debug!(author_id, removed, "Listing cache invalidated after write");
    }
}
