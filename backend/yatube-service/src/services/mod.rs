/// Business logic layer for yatube-service
pub mod comments;
pub mod feed;
pub mod follow;
pub mod image;
pub mod media;
pub mod pagination;
pub mod permissions;
pub mod posts;
pub mod users;

pub use comments::CommentService;
pub use feed::{FeedService, GroupListing, PostDetail, ProfileView};
pub use follow::FollowService;
pub use image::{validate_image, ImageUpload, ValidatedImage};
pub use media::MediaStorage;
pub use pagination::{Page, PageRequest};
pub use posts::{PostForm, PostService};
pub use users::{SignupForm, UserService};
