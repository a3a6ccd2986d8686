/// Feed handlers - the four paginated list views
///
/// The global feed is served through the home-page cache: while the slot is
/// warm the cached bytes are returned as-is, whatever the `page` parameter
/// says. Cache failures degrade to a fresh render and are never surfaced.
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;

use crate::auth::{AuthUser, MaybeUser};
use crate::cache::IndexCache;
use crate::error::Result;
use crate::metrics::{FEED_REQUEST_TOTAL, INDEX_CACHE_EVENTS};
use crate::models::{Group, Post, User};
use crate::pagination::{Page, PageMeta};
use crate::services::FeedService;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Raw `page` parameter; resolution and clamping happen in pagination.
    pub page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedDocument {
    pub posts: Vec<Post>,
    pub page: PageMeta,
}

impl From<Page<Post>> for FeedDocument {
    fn from(page: Page<Post>) -> Self {
        Self {
            posts: page.items,
            page: page.meta,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupFeedDocument {
    pub group: Group,
    pub posts: Vec<Post>,
    pub page: PageMeta,
}

#[derive(Debug, Serialize)]
pub struct ProfileDocument {
    pub author: User,
    pub num_posts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following: Option<bool>,
    pub posts: Vec<Post>,
    pub page: PageMeta,
}

/// Global feed, cached for a short window
pub async fn index(
    pool: web::Data<PgPool>,
    cache: web::Data<Arc<IndexCache>>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    FEED_REQUEST_TOTAL.with_label_values(&["global"]).inc();

    match cache.fetch().await {
        Ok(Some(body)) => {
            INDEX_CACHE_EVENTS.with_label_values(&["hit"]).inc();
            return Ok(HttpResponse::Ok()
                .content_type("application/json")
                .body(body));
        }
        Ok(None) => {
            INDEX_CACHE_EVENTS.with_label_values(&["miss"]).inc();
        }
        Err(err) => {
            INDEX_CACHE_EVENTS.with_label_values(&["error"]).inc();
            tracing::warn!("index cache read failed: {err}");
        }
    }

    let service = FeedService::new((**pool).clone());
    let feed = FeedDocument::from(service.global(query.page.as_deref()).await?);
    let body = serde_json::to_string(&feed)?;

    if let Err(err) = cache.store(&body).await {
        tracing::warn!("index cache write failed: {err}");
    }

    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

/// Posts of one group; 404 for an unknown slug
pub async fn group_posts(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    FEED_REQUEST_TOTAL.with_label_values(&["group"]).inc();

    let slug = path.into_inner();
    let service = FeedService::new((**pool).clone());
    let (group, page) = service.group(&slug, query.page.as_deref()).await?;

    Ok(HttpResponse::Ok().json(GroupFeedDocument {
        group,
        posts: page.items,
        page: page.meta,
    }))
}

/// One author's posts; 404 for an unknown username. The `following` flag is
/// only resolved for authenticated viewers.
pub async fn profile(
    pool: web::Data<PgPool>,
    viewer: MaybeUser,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    FEED_REQUEST_TOTAL.with_label_values(&["profile"]).inc();

    let username = path.into_inner();
    let viewer_id = viewer.0.map(|user| user.id);
    let service = FeedService::new((**pool).clone());
    let profile = service
        .profile(&username, viewer_id, query.page.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(ProfileDocument {
        author: profile.author,
        num_posts: profile.num_posts,
        following: profile.following,
        posts: profile.page.items,
        page: profile.page.meta,
    }))
}

/// Posts of the authors the principal follows
pub async fn follow_index(
    user: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    FEED_REQUEST_TOTAL.with_label_values(&["followed"]).inc();

    let service = FeedService::new((**pool).clone());
    let feed = FeedDocument::from(service.followed(user.0.id, query.page.as_deref()).await?);

    Ok(HttpResponse::Ok().json(feed))
}
