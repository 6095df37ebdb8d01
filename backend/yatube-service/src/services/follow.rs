use crate::cache::{ListingCache, ListingKey};
use crate::error::{AppError, Result};
use crate::metrics::record_follow;
use crate::models::{FollowStats, UserId};
use crate::repository::ContentRepository;
use std::sync::Arc;
use tracing::{debug, info};

/// Follow graph manager.
///
/// Both directions are idempotent: following twice leaves one edge,
/// unfollowing a user that is not followed changes nothing, and a
/// self-follow is silently skipped.
#[derive(Clone)]
pub struct FollowService {
    repo: Arc<dyn ContentRepository>,
    cache: Arc<ListingCache>,
}

impl FollowService {
    pub fn new(repo: Arc<dyn ContentRepository>, cache: Arc<ListingCache>) -> Self {
        Self { repo, cache }
    }

    /// Create the edge `follower -> followee`; returns true if a new edge was written
    pub async fn follow(&self, follower_id: UserId, followee_id: UserId) -> Result<bool> {
        if follower_id == followee_id {
            debug!(user_id = follower_id, "Ignoring self-follow");
            record_follow("follow", false);
            return Ok(false);
        }

        self.require_user(follower_id).await?;
        self.require_user(followee_id).await?;

        let created = match self.repo.create_follow(follower_id, followee_id).await {
            Ok(created) => created,
            // lost a race against a concurrent identical follow
            Err(AppError::Conflict(_)) => false,
            Err(e) => return Err(e),
        };

        record_follow("follow", created);
        if created {
            info!(follower_id, followee_id, "Follow edge created");
            self.invalidate_profiles(&[follower_id, followee_id]).await;
        }
        Ok(created)
    }

    /// Remove the edge if present; returns true if an edge was removed
    pub async fn unfollow(&self, follower_id: UserId, followee_id: UserId) -> Result<bool> {
        let removed = self.repo.delete_follow(follower_id, followee_id).await?;

        record_follow("unfollow", removed);
        if removed {
            info!(follower_id, followee_id, "Follow edge removed");
            self.invalidate_profiles(&[follower_id, followee_id]).await;
        }
        Ok(removed)
    }

    pub async fn is_following(&self, follower_id: UserId, followee_id: UserId) -> Result<bool> {
        self.repo.is_following(follower_id, followee_id).await
    }

    pub async fn stats(&self, user_id: UserId) -> Result<FollowStats> {
        self.repo.follow_stats(user_id).await
    }

    /// Cached profiles carry follow state and counters for both ends of an edge
    async fn invalidate_profiles(&self, user_ids: &[UserId]) {
        if !self.cache.invalidates_on_write() {
            return;
        }

        let mut removed = 0;
        for user_id in user_ids {
            if let Ok(Some(user)) = self.repo.get_user(*user_id).await {
                let prefix = ListingKey::profile_prefix(&user.username);
                removed += self.cache.invalidate_prefix(&prefix);
            }
        }
        debug!(removed, "Profile listings invalidated after follow change");
    }

    async fn require_user(&self, user_id: UserId) -> Result<()> {
        match self.repo.get_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("user {}", user_id))),
        }
    }
}
