/// Feed composition - the four paginated list views
///
/// Every view resolves its page plan against a count query and slices with
/// LIMIT/OFFSET, so pagination semantics are identical across the global,
/// group, profile, and followed feeds.
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{follow_repo, group_repo, post_repo, user_repo};
use crate::error::{AppError, Result};
use crate::models::{Group, Post, User};
use crate::pagination::{Page, PagePlan};

pub struct FeedService {
    pool: PgPool,
}

/// Profile feed aggregate: the author, their page of posts, and whether the
/// viewer follows them (only resolved for authenticated viewers).
pub struct ProfileFeed {
    pub author: User,
    pub num_posts: i64,
    pub following: Option<bool>,
    pub page: Page<Post>,
}

impl FeedService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All posts, newest first.
    pub async fn global(&self, page: Option<&str>) -> Result<Page<Post>> {
        let total = post_repo::count_all(&self.pool).await?;
        let plan = PagePlan::resolve(total, page);
        let posts = post_repo::list_all(&self.pool, plan.limit, plan.offset).await?;

        Ok(Page::new(posts, &plan))
    }

    /// Posts tagged to the group named by `slug`.
    pub async fn group(&self, slug: &str, page: Option<&str>) -> Result<(Group, Page<Post>)> {
        let group = group_repo::find_by_slug(&self.pool, slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("group '{slug}'")))?;

        let total = post_repo::count_by_group(&self.pool, group.id).await?;
        let plan = PagePlan::resolve(total, page);
        let posts = post_repo::list_by_group(&self.pool, group.id, plan.limit, plan.offset).await?;

        Ok((group, Page::new(posts, &plan)))
    }

    /// Posts written by the author named by `username`.
    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<Uuid>,
        page: Option<&str>,
    ) -> Result<ProfileFeed> {
        let author = user_repo::find_by_username(&self.pool, username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{username}'")))?;

        let total = post_repo::count_by_author(&self.pool, author.id).await?;
        let plan = PagePlan::resolve(total, page);
        let posts =
            post_repo::list_by_author(&self.pool, author.id, plan.limit, plan.offset).await?;

        let following = match viewer {
            Some(viewer_id) => Some(follow_repo::exists(&self.pool, viewer_id, author.id).await?),
            None => None,
        };

        Ok(ProfileFeed {
            author,
            num_posts: total,
            following,
            page: Page::new(posts, &plan),
        })
    }

    /// Posts written by the authors `user_id` follows.
    pub async fn followed(&self, user_id: Uuid, page: Option<&str>) -> Result<Page<Post>> {
        let total = post_repo::count_followed(&self.pool, user_id).await?;
        let plan = PagePlan::resolve(total, page);
        let posts = post_repo::list_followed(&self.pool, user_id, plan.limit, plan.offset).await?;

        Ok(Page::new(posts, &plan))
    }
}
