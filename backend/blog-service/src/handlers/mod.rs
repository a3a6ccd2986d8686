/// HTTP request handlers and the route table
///
/// Handlers translate between the HTTP surface (forms, query parameters,
/// redirects) and the service layer. Mutations answer with 302 redirects the
/// way a browser form flow expects; list and detail views answer with
/// rendered JSON documents.
pub mod comments;
pub mod feed;
pub mod follow;
pub mod posts;

use std::collections::BTreeMap;

use actix_web::{http::header, web, HttpResponse};
use serde::Serialize;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::error::AppError;

/// 302 redirect to `location`.
pub(crate) fn redirect_to(location: impl Into<String>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.into()))
        .finish()
}

pub(crate) fn profile_path(username: &str) -> String {
    format!("/profile/{username}/")
}

pub(crate) fn post_detail_path(post_id: Uuid) -> String {
    format!("/posts/{post_id}/")
}

/// Post ids arrive as a path segment; anything that is not a uuid behaves
/// like an unknown post.
pub(crate) fn parse_post_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("post '{raw}'")))
}

/// Field → messages accumulator rendered into form documents.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn extend_validation(&mut self, errors: &ValidationErrors) {
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                self.add(field, &message);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Route table; shared between `main` and the integration tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(feed::index))
        .route("/follow/", web::get().to(feed::follow_index))
        .route("/group/{slug}/", web::get().to(feed::group_posts))
        .route("/profile/{username}/", web::get().to(feed::profile))
        .route(
            "/profile/{username}/follow/",
            web::get().to(follow::profile_follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            web::get().to(follow::profile_unfollow),
        )
        .service(
            web::resource("/create/")
                .route(web::get().to(posts::post_create_form))
                .route(web::post().to(posts::post_create)),
        )
        .route("/posts/{post_id}/", web::get().to(posts::post_detail))
        .service(
            web::resource("/posts/{post_id}/edit/")
                .route(web::get().to(posts::post_edit_form))
                .route(web::post().to(posts::post_edit)),
        )
        .route(
            "/posts/{post_id}/comment/",
            web::post().to(comments::add_comment),
        );
}
