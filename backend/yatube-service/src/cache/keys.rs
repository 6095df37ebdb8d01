use crate::models::UserId;

/// Bump when the serialized listing body changes shape
pub const LISTING_CACHE_VERSION: u32 = 1;

/// Key builder for cached listing pages.
///
/// Keys take the form `v{version}:listing:{scope}:...:page={n}`. Every scope
/// prefix ends in `:` so that prefix invalidation of one slug or username
/// never reaches a longer one sharing its start.
pub struct ListingKey;

impl ListingKey {
    pub fn index(page: u32) -> String {
        format!("{}page={}", Self::index_prefix(), page)
    }

    pub fn index_prefix() -> String {
        format!("v{}:listing:index:", LISTING_CACHE_VERSION)
    }

    pub fn group(slug: &str, page: u32) -> String {
        format!("{}page={}", Self::group_prefix(slug), page)
    }

    pub fn group_prefix(slug: &str) -> String {
        format!("v{}:listing:group:{}:", LISTING_CACHE_VERSION, slug)
    }

    /// Profile pages carry viewer-specific follow state, so the viewer is part of the key
    pub fn profile(username: &str, viewer: Option<UserId>, page: u32) -> String {
        let viewer = match viewer {
            Some(id) => id.to_string(),
            None => "anon".to_string(),
        };
        format!(
            "{}viewer={}:page={}",
            Self::profile_prefix(username),
            viewer,
            page
        )
    }

    pub fn profile_prefix(username: &str) -> String {
        format!("v{}:listing:profile:{}:", LISTING_CACHE_VERSION, username)
    }
}
