/// Follow edge lifecycle
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::permissions;
use crate::db::follow_repo;
use crate::error::{AppError, Result};

pub struct FollowService {
    pool: PgPool,
}

impl FollowService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotently ensure the edge. Self-follows are a silent no-op.
    pub async fn follow(&self, user_id: Uuid, author_id: Uuid) -> Result<()> {
        if !permissions::can_follow(user_id, author_id) {
            return Ok(());
        }

        if follow_repo::create(&self.pool, user_id, author_id).await? {
            tracing::info!(%user_id, %author_id, "follow edge created");
        }

        Ok(())
    }

    /// Remove the edge; NotFound when none exists.
    pub async fn unfollow(&self, user_id: Uuid, author_id: Uuid) -> Result<()> {
        if !follow_repo::delete(&self.pool, user_id, author_id).await? {
            return Err(AppError::NotFound(format!(
                "follow edge {user_id} -> {author_id}"
            )));
        }

        tracing::info!(%user_id, %author_id, "follow edge removed");

        Ok(())
    }
}
