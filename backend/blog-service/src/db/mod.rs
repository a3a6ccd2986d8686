/// Database access layer
///
/// One repository module per entity, all free functions over `&PgPool`.
/// Repositories return `sqlx::Error`; the service layer converts into
/// `AppError`.
pub mod comment_repo;
pub mod follow_repo;
pub mod group_repo;
pub mod post_repo;
pub mod user_repo;
