/// Authorization predicates.
///
/// Ownership decisions are made here, on already-loaded resources, so that
/// handlers and the storage layer stay free of permission logic. A denied
/// edit is answered with a redirect to the post's detail view, not an error
/// page; the follow predicate makes self-follows a silent no-op.
use uuid::Uuid;

use crate::models::Post;

/// May `principal` edit `post`? Only the author may.
pub fn can_edit_post(post: &Post, principal: Uuid) -> bool {
    post.author_id == principal
}

/// May `user` hold a follow edge to `author`? Self-follows are excluded.
pub fn can_follow(user: Uuid, author: Uuid) -> bool {
    user != author
}
