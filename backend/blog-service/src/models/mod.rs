/// Data models for the blog service
///
/// Row types map directly onto the relational schema. `Post` and `Comment`
/// are read through joins that denormalize the author username (and group
/// title/slug for posts) so that list documents render without extra
/// lookups. Follow edges live in the `follows` table and are only ever
/// observed through `db::follow_repo`, never materialized as a row type.
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A principal. Managed by the identity provider; this service only reads.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A topic posts can be tagged with. Administered out of band.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// A published post, denormalized with its author and optional group.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub text: String,
    pub author_id: Uuid,
    pub author_username: String,
    pub group_id: Option<Uuid>,
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
    /// Key of the attached image in the media store, if any.
    pub image_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A comment on a post, denormalized with its author.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
