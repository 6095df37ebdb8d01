use super::ContentRepository;
use crate::error::Result;
use crate::models::{
    Comment, FollowStats, Group, GroupId, NewComment, NewGroup, NewPost, NewUser, Post,
    PostChanges, PostFilter, PostId, User, UserId,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

const POST_COLUMNS: &str =
    "p.id, p.text, p.image, p.author_id, p.group_id, p.created_at, p.updated_at";

/// PostgreSQL repository (source of truth)
#[derive(Clone)]
pub struct PostgresContentRepository {
    pool: PgPool,
}

impl PostgresContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append the FROM-side join and WHERE clause selecting the posts of a listing
fn push_post_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: PostFilter) {
    match filter {
        PostFilter::All => {}
        PostFilter::Group(group_id) => {
            qb.push(" WHERE p.group_id = ").push_bind(group_id);
        }
        PostFilter::Author(author_id) => {
            qb.push(" WHERE p.author_id = ").push_bind(author_id);
        }
        PostFilter::FollowedBy(user_id) => {
            qb.push(" JOIN follows f ON f.followee_id = p.author_id WHERE f.follower_id = ")
                .push_bind(user_id)
                .push(" AND p.author_id <> ")
                .push_bind(user_id);
        }
    }
}

#[async_trait::async_trait]
impl ContentRepository for PostgresContentRepository {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?;

        debug!(user_id = created.id, username = %created.username, "Created user");
        Ok(created)
    }

    async fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_group(&self, group: NewGroup) -> Result<Group> {
        let created = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (title, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, title, slug, description
            "#,
        )
        .bind(&group.title)
        .bind(&group.slug)
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await?;

        debug!(group_id = created.id, slug = %created.slug, "Created group");
        Ok(created)
    }

    async fn get_group(&self, group_id: GroupId) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups WHERE id = $1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (text, image, author_id, group_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, text, image, author_id, group_id, created_at, updated_at
            "#,
        )
        .bind(&post.text)
        .bind(&post.image)
        .bind(post.author_id)
        .bind(post.group_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(post_id = created.id, author_id = created.author_id, "Created post");
        Ok(created)
    }

    async fn get_post(&self, post_id: PostId) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, text, image, author_id, group_id, created_at, updated_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn update_post(
        &self,
        post_id: PostId,
        author_id: UserId,
        changes: PostChanges,
    ) -> Result<Option<Post>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET text = $1,
                group_id = $2,
                image = COALESCE($3::VARCHAR, image),
                updated_at = NOW()
            WHERE id = $4 AND author_id = $5
            RETURNING id, text, image, author_id, group_id, created_at, updated_at
            "#,
        )
        .bind(&changes.text)
        .bind(changes.group_id)
        .bind(&changes.image)
        .bind(post_id)
        .bind(author_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        if updated.is_some() {
            debug!(%post_id, %author_id, "Updated post");
        }
        Ok(updated)
    }

    async fn delete_post(&self, post_id: PostId, author_id: UserId) -> Result<bool> {
        let affected = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
            .bind(post_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        debug!(%post_id, %author_id, affected, "Deleted post");
        Ok(affected > 0)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Post>, i64)> {
        // Count and page come from the same snapshot
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p");
        push_post_filter(&mut count_qb, filter);
        let (total,) = count_qb
            .build_query_as::<(i64,)>()
            .fetch_one(&mut *tx)
            .await?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM posts p", POST_COLUMNS));
        push_post_filter(&mut qb, filter);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let posts = qb.build_query_as::<Post>().fetch_all(&mut *tx).await?;

        tx.commit().await?;

        Ok((posts, total))
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        let created = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (post_id, author_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, author_id, text, created_at
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.text)
        .fetch_one(&self.pool)
        .await?;

        debug!(comment_id = created.id, post_id = created.post_id, "Created comment");
        Ok(created)
    }

    async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, post_id, author_id, text, created_at
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn create_follow(&self, follower_id: UserId, followee_id: UserId) -> Result<bool> {
        let inserted = sqlx::query_as::<_, (UserId,)>(
            r#"
            INSERT INTO follows (follower_id, followee_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (follower_id, followee_id) DO NOTHING
            RETURNING follower_id
            "#,
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_optional(&self.pool)
        .await?;

        debug!(
            "Created FOLLOWS in PostgreSQL: {} -> {} (new: {})",
            follower_id,
            followee_id,
            inserted.is_some()
        );
        Ok(inserted.is_some())
    }

    async fn delete_follow(&self, follower_id: UserId, followee_id: UserId) -> Result<bool> {
        let affected =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
                .bind(follower_id)
                .bind(followee_id)
                .execute(&self.pool)
                .await?
                .rows_affected();

        debug!(
            "Deleted FOLLOWS in PostgreSQL: {} -> {} (removed: {})",
            follower_id,
            followee_id,
            affected > 0
        );
        Ok(affected > 0)
    }

    async fn is_following(&self, follower_id: UserId, followee_id: UserId) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2)",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn follow_stats(&self, user_id: UserId) -> Result<FollowStats> {
        let (followers, following): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM follows WHERE followee_id = $1) AS followers,
                (SELECT COUNT(*) FROM follows WHERE follower_id = $1) AS following
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(FollowStats {
            followers,
            following,
        })
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
