/// Post handlers - detail view, create and edit form flows
///
/// Create and edit mirror a browser form flow: GET renders the form
/// document, POST validates and either redirects (success) or re-renders the
/// form with field errors (HTTP 200). Editing is gated by the ownership
/// predicate; a non-author is silently redirected to the detail view.
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::{parse_post_id, post_detail_path, profile_path, redirect_to, FormErrors};
use crate::auth::{permissions, AuthUser};
use crate::db::group_repo;
use crate::error::{AppError, Result};
use crate::models::{Comment, Post};
use crate::services::{NewPost, PostService};

/// Raw create/edit form fields as submitted by the browser
#[derive(Debug, Deserialize)]
pub struct PostForm {
    pub text: Option<String>,
    /// Group id; an empty value means "no group"
    pub group: Option<String>,
    /// Key of an already-uploaded image in the media store
    pub image_key: Option<String>,
}

#[derive(Debug, Validate)]
struct PostInput {
    #[validate(length(min = 1, message = "This field is required."))]
    text: String,
    group_id: Option<Uuid>,
    image_key: Option<String>,
}

/// Form state rendered back to the browser
#[derive(Debug, Serialize)]
pub struct PostFormValues {
    pub text: String,
    pub group: Option<Uuid>,
    pub image_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostFormDocument {
    pub values: PostFormValues,
    pub errors: FormErrors,
    pub is_edit: bool,
}

impl PostFormDocument {
    fn empty() -> Self {
        Self {
            values: PostFormValues {
                text: String::new(),
                group: None,
                image_key: None,
            },
            errors: FormErrors::new(),
            is_edit: false,
        }
    }

    fn rejected(input: &PostInput, errors: FormErrors, is_edit: bool) -> Self {
        Self {
            values: PostFormValues {
                text: input.text.clone(),
                group: input.group_id,
                image_key: input.image_key.clone(),
            },
            errors,
            is_edit,
        }
    }

    fn prefilled(post: &Post) -> Self {
        Self {
            values: PostFormValues {
                text: post.text.clone(),
                group: post.group_id,
                image_key: post.image_key.clone(),
            },
            errors: FormErrors::new(),
            is_edit: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostDetailDocument {
    pub post: Post,
    pub num_posts: i64,
    pub comments: Vec<Comment>,
}

fn normalize(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Normalize and validate the submitted form. The group reference is checked
/// against the store; a dangling or malformed id is a field error, not a
/// request error.
async fn build_input(pool: &PgPool, form: &PostForm) -> Result<(PostInput, FormErrors)> {
    let mut errors = FormErrors::new();

    let group_id = match normalize(form.group.as_deref()) {
        None => None,
        Some(raw) => match Uuid::parse_str(&raw) {
            Ok(id) => {
                if group_repo::find_by_id(pool, id).await?.is_some() {
                    Some(id)
                } else {
                    errors.add("group", "Select a valid group.");
                    None
                }
            }
            Err(_) => {
                errors.add("group", "Select a valid group.");
                None
            }
        },
    };

    let input = PostInput {
        text: form.text.as_deref().unwrap_or("").trim().to_string(),
        group_id,
        image_key: normalize(form.image_key.as_deref()),
    };

    if let Err(validation) = input.validate() {
        errors.extend_validation(&validation);
    }

    Ok((input, errors))
}

/// Post detail with the author's post count and the comment thread
pub async fn post_detail(pool: web::Data<PgPool>, path: web::Path<String>) -> Result<HttpResponse> {
    let post_id = parse_post_id(&path)?;
    let service = PostService::new((**pool).clone());
    let detail = service
        .detail(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post '{post_id}'")))?;

    Ok(HttpResponse::Ok().json(PostDetailDocument {
        post: detail.post,
        num_posts: detail.num_posts,
        comments: detail.comments,
    }))
}

/// Empty create form
pub async fn post_create_form(_user: AuthUser) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(PostFormDocument::empty()))
}

/// Create a post and redirect to the author's profile
pub async fn post_create(
    user: AuthUser,
    pool: web::Data<PgPool>,
    form: web::Form<PostForm>,
) -> Result<HttpResponse> {
    let (input, errors) = build_input(pool.get_ref(), &form).await?;
    if !errors.is_empty() {
        return Ok(HttpResponse::Ok().json(PostFormDocument::rejected(&input, errors, false)));
    }

    let service = PostService::new((**pool).clone());
    service
        .create(
            user.0.id,
            &NewPost {
                text: &input.text,
                group_id: input.group_id,
                image_key: input.image_key.as_deref(),
            },
        )
        .await?;

    Ok(redirect_to(profile_path(&user.0.username)))
}

/// Edit form, pre-filled for the author; non-authors land on the detail view
pub async fn post_edit_form(
    user: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let post_id = parse_post_id(&path)?;
    let service = PostService::new((**pool).clone());
    let post = service
        .get(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post '{post_id}'")))?;

    if !permissions::can_edit_post(&post, user.0.id) {
        return Ok(redirect_to(post_detail_path(post.id)));
    }

    Ok(HttpResponse::Ok().json(PostFormDocument::prefilled(&post)))
}

/// Apply an edit and redirect to the detail view; non-authors are redirected
/// there without modification
pub async fn post_edit(
    user: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    form: web::Form<PostForm>,
) -> Result<HttpResponse> {
    let post_id = parse_post_id(&path)?;
    let service = PostService::new((**pool).clone());
    let post = service
        .get(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post '{post_id}'")))?;

    if !permissions::can_edit_post(&post, user.0.id) {
        return Ok(redirect_to(post_detail_path(post.id)));
    }

    let (input, errors) = build_input(pool.get_ref(), &form).await?;
    if !errors.is_empty() {
        return Ok(HttpResponse::Ok().json(PostFormDocument::rejected(&input, errors, true)));
    }

    service
        .update(
            post.id,
            &NewPost {
                text: &input.text,
                group_id: input.group_id,
                image_key: input.image_key.as_deref(),
            },
        )
        .await?;

    Ok(redirect_to(post_detail_path(post.id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_blank_values() {
        assert_eq!(normalize(None), None);
        assert_eq!(normalize(Some("")), None);
        assert_eq!(normalize(Some("   ")), None);
        assert_eq!(normalize(Some(" key.png ")), Some("key.png".to_string()));
    }

    #[test]
    fn blank_text_fails_validation() {
        for text in ["", "   ", "\n\t"] {
            let input = PostInput {
                text: text.trim().to_string(),
                group_id: None,
                image_key: None,
            };
            assert!(input.validate().is_err(), "text={text:?}");
        }
    }

    #[test]
    fn non_empty_text_passes_validation() {
        let input = PostInput {
            text: "an actual post".to_string(),
            group_id: Some(Uuid::new_v4()),
            image_key: Some("posts/small.gif".to_string()),
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn rejected_document_echoes_submitted_values() {
        let input = PostInput {
            text: String::new(),
            group_id: None,
            image_key: Some("posts/small.gif".to_string()),
        };
        let mut errors = FormErrors::new();
        errors.add("text", "This field is required.");

        let doc = PostFormDocument::rejected(&input, errors, true);
        assert!(doc.is_edit);
        assert_eq!(doc.values.image_key.as_deref(), Some("posts/small.gif"));
        assert!(!doc.errors.is_empty());
    }
}
