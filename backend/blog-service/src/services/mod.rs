/// Business logic layer
///
/// - `feeds`: composes the four paginated list views
/// - `posts`: post creation, update, and the detail aggregate
/// - `comments`: comment creation
/// - `follow`: follow edge lifecycle
pub mod comments;
pub mod feeds;
pub mod follow;
pub mod posts;

pub use comments::CommentService;
pub use feeds::{FeedService, ProfileFeed};
pub use follow::FollowService;
pub use posts::{NewPost, PostDetail, PostService};
