/// Comment handler
///
/// Commenting always answers with a redirect to the post's detail view. An
/// invalid form is discarded without surfacing errors; only the post lookup
/// can fail the request.
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use validator::Validate;

use super::{parse_post_id, post_detail_path, redirect_to};
use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::services::{CommentService, PostService};

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub text: Option<String>,
}

#[derive(Debug, Validate)]
struct CommentInput {
    #[validate(length(min = 1, message = "This field is required."))]
    text: String,
}

/// Attach a comment to an existing post and redirect to its detail view
pub async fn add_comment(
    user: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    form: web::Form<CommentForm>,
) -> Result<HttpResponse> {
    let post_id = parse_post_id(&path)?;
    let post = PostService::new((**pool).clone())
        .get(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post '{post_id}'")))?;

    let input = CommentInput {
        text: form.text.as_deref().unwrap_or("").trim().to_string(),
    };
    match input.validate() {
        Ok(()) => {
            CommentService::new((**pool).clone())
                .add(post.id, user.0.id, &input.text)
                .await?;
        }
        Err(_) => {
            tracing::debug!(%post_id, "discarded invalid comment form");
        }
    }

    Ok(redirect_to(post_detail_path(post.id)))
}
