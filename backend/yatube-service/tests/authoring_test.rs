//! Post, comment and registration flows against the in-memory repository.

mod common;

use common::{
    count_files, create_group, create_user, png_upload, test_env, text_form, MAX_UPLOAD_BYTES,
};
use yatube_service::models::PostFilter;
use yatube_service::services::{ImageUpload, PostForm, SignupForm};
use yatube_service::AppError;

async fn total_posts(env: &common::TestEnv) -> i64 {
    env.repo()
        .list_posts(PostFilter::All, 1, 0)
        .await
        .unwrap()
        .1
}

#[tokio::test]
async fn empty_text_is_rejected_and_nothing_persisted() {
    let env = test_env();
    let author = create_user(env.repo(), "leo").await;

    for text in ["", "   \n\t"] {
        let err = env
            .state
            .posts
            .create_post(author.id, text_form(text))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    assert_eq!(total_posts(&env).await, 0);
}

#[tokio::test]
async fn non_image_upload_is_rejected_and_nothing_persisted() {
    let env = test_env();
    let author = create_user(env.repo(), "leo").await;

    let form = PostForm {
        text: "with attachment".into(),
        group_id: None,
        image: Some(ImageUpload {
            filename: "tests.py".into(),
            data: b"import os\nprint(os.getcwd())\n".to_vec(),
        }),
    };
    let err = env
        .state
        .posts
        .create_post(author.id, form)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InvalidImage(_)));
    assert_eq!(total_posts(&env).await, 0);
    assert_eq!(count_files(env.media_root()), 0);
}

#[tokio::test]
async fn oversized_image_is_a_validation_error() {
    let env = test_env();
    let author = create_user(env.repo(), "leo").await;

    let form = PostForm {
        text: "huge".into(),
        group_id: None,
        image: Some(ImageUpload {
            filename: "huge.png".into(),
            data: vec![0u8; MAX_UPLOAD_BYTES + 1],
        }),
    };
    let err = env
        .state
        .posts
        .create_post(author.id, form)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(total_posts(&env).await, 0);
}

#[tokio::test]
async fn valid_image_is_stored_under_media_root() {
    let env = test_env();
    let author = create_user(env.repo(), "leo").await;

    let post = env
        .state
        .posts
        .create_post(
            author.id,
            PostForm {
                text: "picture".into(),
                group_id: None,
                image: Some(png_upload("small.png")),
            },
        )
        .await
        .unwrap();

    let key = post.image.expect("image key stored");
    assert!(key.starts_with("posts/"));
    assert!(key.ends_with(".png"));
    assert!(env.media_root().join(&key).is_file());
}

#[tokio::test]
async fn unknown_group_is_not_found() {
    let env = test_env();
    let author = create_user(env.repo(), "leo").await;

    let err = env
        .state
        .posts
        .create_post(
            author.id,
            PostForm {
                text: "lost".into(),
                group_id: Some(404),
                image: None,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(total_posts(&env).await, 0);
}

#[tokio::test]
async fn non_author_edit_is_forbidden_and_post_unchanged() {
    let env = test_env();
    let author = create_user(env.repo(), "leo").await;
    let intruder = create_user(env.repo(), "intruder").await;
    let post = env
        .state
        .posts
        .create_post(author.id, text_form("original"))
        .await
        .unwrap();

    let err = env
        .state
        .posts
        .edit_post(post.id, intruder.id, text_form("hijacked"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let stored = env.state.posts.get_post(post.id).await.unwrap();
    assert_eq!(stored, post);

    let err = env
        .state
        .posts
        .delete_post(post.id, intruder.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert!(env.state.posts.get_post(post.id).await.is_ok());
}

#[tokio::test]
async fn editing_missing_post_is_not_found() {
    let env = test_env();
    let author = create_user(env.repo(), "leo").await;

    let err = env
        .state
        .posts
        .edit_post(77, author.id, text_form("anything"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn moving_post_between_groups_updates_both_listings() {
    let env = test_env();
    let author = create_user(env.repo(), "leo").await;
    let first = create_group(env.repo(), "first").await;
    let second = create_group(env.repo(), "second").await;

    let post = env
        .state
        .posts
        .create_post(
            author.id,
            PostForm {
                text: "wandering".into(),
                group_id: Some(first.id),
                image: None,
            },
        )
        .await
        .unwrap();

    let listing = env.state.feed.group_posts("first", None).await.unwrap();
    assert_eq!(listing.posts.count, 1);

    let edited = env
        .state
        .posts
        .edit_post(
            post.id,
            author.id,
            PostForm {
                text: "settled".into(),
                group_id: Some(second.id),
                image: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.group_id, Some(second.id));
    assert_eq!(edited.text, "settled");

    let first_listing = env.state.feed.group_posts("first", None).await.unwrap();
    let second_listing = env.state.feed.group_posts("second", None).await.unwrap();
    assert_eq!(first_listing.posts.count, 0);
    assert_eq!(second_listing.posts.count, 1);
    assert_eq!(second_listing.group, second);

    let err = env.state.feed.group_posts("third", None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn edit_keeps_image_unless_a_new_one_is_sent() {
    let env = test_env();
    let author = create_user(env.repo(), "leo").await;

    let post = env
        .state
        .posts
        .create_post(
            author.id,
            PostForm {
                text: "v1".into(),
                group_id: None,
                image: Some(png_upload("one.png")),
            },
        )
        .await
        .unwrap();
    let original = post.image.clone().unwrap();

    let kept = env
        .state
        .posts
        .edit_post(post.id, author.id, text_form("v2"))
        .await
        .unwrap();
    assert_eq!(kept.image.as_deref(), Some(original.as_str()));

    let replaced = env
        .state
        .posts
        .edit_post(
            post.id,
            author.id,
            PostForm {
                text: "v3".into(),
                group_id: None,
                image: Some(png_upload("two.png")),
            },
        )
        .await
        .unwrap();
    let new_key = replaced.image.unwrap();
    assert_ne!(new_key, original);
    assert!(env.media_root().join(&new_key).is_file());
    assert!(!env.media_root().join(&original).exists());
    assert_eq!(count_files(env.media_root()), 1);
}

#[tokio::test]
async fn delete_removes_post_comments_and_image() {
    let env = test_env();
    let author = create_user(env.repo(), "leo").await;
    let reader = create_user(env.repo(), "reader").await;

    let post = env
        .state
        .posts
        .create_post(
            author.id,
            PostForm {
                text: "short lived".into(),
                group_id: None,
                image: Some(png_upload("gone.png")),
            },
        )
        .await
        .unwrap();
    env.state
        .comments
        .create_comment(reader.id, post.id, "nice")
        .await
        .unwrap();

    env.state.posts.delete_post(post.id, author.id).await.unwrap();

    assert!(matches!(
        env.state.posts.get_post(post.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(env.repo().list_comments(post.id).await.unwrap().is_empty());
    assert_eq!(count_files(env.media_root()), 0);
}

#[tokio::test]
async fn comments_require_text_and_an_existing_post() {
    let env = test_env();
    let author = create_user(env.repo(), "leo").await;
    let post = env
        .state
        .posts
        .create_post(author.id, text_form("discuss"))
        .await
        .unwrap();

    let err = env
        .state
        .comments
        .create_comment(author.id, post.id, "  ")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = env
        .state
        .comments
        .create_comment(author.id, post.id + 1, "hello?")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let first = env
        .state
        .comments
        .create_comment(author.id, post.id, "first")
        .await
        .unwrap();
    let second = env
        .state
        .comments
        .create_comment(author.id, post.id, "second")
        .await
        .unwrap();

    let comments = env.state.comments.post_comments(post.id).await.unwrap();
    assert_eq!(
        comments.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![first.id, second.id]
    );
}

#[tokio::test]
async fn post_detail_requires_matching_author() {
    let env = test_env();
    let author = create_user(env.repo(), "leo").await;
    create_user(env.repo(), "other").await;
    let post = env
        .state
        .posts
        .create_post(author.id, text_form("detail"))
        .await
        .unwrap();
    env.state
        .posts
        .create_post(author.id, text_form("another"))
        .await
        .unwrap();
    env.state
        .comments
        .create_comment(author.id, post.id, "self reply")
        .await
        .unwrap();

    let detail = env.state.feed.post_detail("leo", post.id).await.unwrap();
    assert_eq!(detail.post.id, post.id);
    assert_eq!(detail.author.id, author.id);
    assert_eq!(detail.author_post_count, 2);
    assert_eq!(detail.comments.len(), 1);

    let err = env
        .state
        .feed
        .post_detail("other", post.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn registration_hashes_password_and_rejects_duplicates() {
    let env = test_env();
    let form = SignupForm {
        username: "leo".into(),
        email: "leo@yatube.dev".into(),
        password: "war-and-peace".into(),
    };

    let user = env.state.users.register(form.clone()).await.unwrap();
    assert_eq!(user.username, "leo");
    assert!(user.password_hash.starts_with("$argon2"));
    assert_ne!(user.password_hash, "war-and-peace");

    let err = env.state.users.register(form).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = env
        .state
        .users
        .register(SignupForm {
            username: "bad name".into(),
            email: "x@yatube.dev".into(),
            password: "long enough".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
