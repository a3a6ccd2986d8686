/// Follow handlers
///
/// Both endpoints resolve the target author by username and answer with a
/// redirect to that author's profile. Creation is idempotent (and a silent
/// no-op for self-follows); removing a non-existent edge is a 404.
use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use super::{profile_path, redirect_to};
use crate::auth::AuthUser;
use crate::db::user_repo;
use crate::error::{AppError, Result};
use crate::services::FollowService;

/// Start following the named author
pub async fn profile_follow(
    user: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let username = path.into_inner();
    let author = user_repo::find_by_username(pool.get_ref(), &username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user '{username}'")))?;

    FollowService::new((**pool).clone())
        .follow(user.0.id, author.id)
        .await?;

    Ok(redirect_to(profile_path(&author.username)))
}

/// Stop following the named author
pub async fn profile_unfollow(
    user: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let username = path.into_inner();
    let author = user_repo::find_by_username(pool.get_ref(), &username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user '{username}'")))?;

    FollowService::new((**pool).clone())
        .unfollow(user.0.id, author.id)
        .await?;

    Ok(redirect_to(profile_path(&author.username)))
}
