/// Post service - creation, in-place update, and the detail aggregate
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{comment_repo, post_repo};
use crate::error::{AppError, Result};
use crate::models::{Comment, Post};

pub struct PostService {
    pool: PgPool,
}

/// Validated input for creating or editing a post.
#[derive(Debug)]
pub struct NewPost<'a> {
    pub text: &'a str,
    pub group_id: Option<Uuid>,
    pub image_key: Option<&'a str>,
}

/// Detail aggregate: the post, the author's total post count, and the
/// conversation under it.
pub struct PostDetail {
    pub post: Post,
    pub num_posts: i64,
    pub comments: Vec<Comment>,
}

impl PostService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a post by id
    pub async fn get(&self, post_id: Uuid) -> Result<Option<Post>> {
        Ok(post_repo::find_by_id(&self.pool, post_id).await?)
    }

    /// Create a post authored by `author_id`
    pub async fn create(&self, author_id: Uuid, input: &NewPost<'_>) -> Result<Post> {
        let id = post_repo::create(
            &self.pool,
            author_id,
            input.text,
            input.group_id,
            input.image_key,
        )
        .await?;

        tracing::info!(post_id = %id, author_id = %author_id, "post created");

        post_repo::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("post {id} vanished after insert")))
    }

    /// Update a post in place. Last write wins; ownership is decided by the
    /// caller before this point.
    pub async fn update(&self, post_id: Uuid, input: &NewPost<'_>) -> Result<Post> {
        post_repo::update(
            &self.pool,
            post_id,
            input.text,
            input.group_id,
            input.image_key,
        )
        .await?;

        tracing::info!(post_id = %post_id, "post updated");

        post_repo::find_by_id(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post '{post_id}'")))
    }

    /// Detail aggregate for the post's page
    pub async fn detail(&self, post_id: Uuid) -> Result<Option<PostDetail>> {
        let Some(post) = post_repo::find_by_id(&self.pool, post_id).await? else {
            return Ok(None);
        };

        let num_posts = post_repo::count_by_author(&self.pool, post.author_id).await?;
        let comments = comment_repo::list_by_post(&self.pool, post.id).await?;

        Ok(Some(PostDetail {
            post,
            num_posts,
            comments,
        }))
    }
}
