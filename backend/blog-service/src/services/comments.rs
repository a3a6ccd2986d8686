/// Comment service
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::comment_repo;
use crate::error::Result;

pub struct CommentService {
    pool: PgPool,
}

impl CommentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach a comment by `author_id` to an existing post
    pub async fn add(&self, post_id: Uuid, author_id: Uuid, text: &str) -> Result<Uuid> {
        let id = comment_repo::create(&self.pool, post_id, author_id, text).await?;

        tracing::info!(comment_id = %id, post_id = %post_id, "comment created");

        Ok(id)
    }
}
