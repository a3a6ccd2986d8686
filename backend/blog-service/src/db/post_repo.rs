use crate::models::Post;
use sqlx::PgPool;
use uuid::Uuid;

// Every select joins the author (and optional group) so list documents
// render without per-row lookups. `created_at DESC, id DESC` keeps the
// ordering stable when timestamps collide within one transaction.

/// Find a post by id
pub async fn find_by_id(pool: &PgPool, post_id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    let post = sqlx::query_as::<_, Post>(
        r#"
        SELECT p.id, p.text, p.author_id, u.username AS author_username,
               p.group_id, g.title AS group_title, g.slug AS group_slug,
               p.image_key, p.created_at
        FROM posts p
        JOIN users u ON u.id = p.author_id
        LEFT JOIN groups g ON g.id = p.group_id
        WHERE p.id = $1
        "#,
    )
    .bind(post_id)
    .fetch_optional(pool)
    .await?;

    Ok(post)
}

/// Count all posts
pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await
}

/// List all posts, newest first
pub async fn list_all(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Post>, sqlx::Error> {
    let posts = sqlx::query_as::<_, Post>(
        r#"
        SELECT p.id, p.text, p.author_id, u.username AS author_username,
               p.group_id, g.title AS group_title, g.slug AS group_slug,
               p.image_key, p.created_at
        FROM posts p
        JOIN users u ON u.id = p.author_id
        LEFT JOIN groups g ON g.id = p.group_id
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

/// Count posts tagged to a group
pub async fn count_by_group(pool: &PgPool, group_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE group_id = $1")
        .bind(group_id)
        .fetch_one(pool)
        .await
}

/// List posts tagged to a group, newest first
pub async fn list_by_group(
    pool: &PgPool,
    group_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Post>, sqlx::Error> {
    let posts = sqlx::query_as::<_, Post>(
        r#"
        SELECT p.id, p.text, p.author_id, u.username AS author_username,
               p.group_id, g.title AS group_title, g.slug AS group_slug,
               p.image_key, p.created_at
        FROM posts p
        JOIN users u ON u.id = p.author_id
        LEFT JOIN groups g ON g.id = p.group_id
        WHERE p.group_id = $1
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(group_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

/// Count posts written by an author
pub async fn count_by_author(pool: &PgPool, author_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
}

/// List posts written by an author, newest first
pub async fn list_by_author(
    pool: &PgPool,
    author_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Post>, sqlx::Error> {
    let posts = sqlx::query_as::<_, Post>(
        r#"
        SELECT p.id, p.text, p.author_id, u.username AS author_username,
               p.group_id, g.title AS group_title, g.slug AS group_slug,
               p.image_key, p.created_at
        FROM posts p
        JOIN users u ON u.id = p.author_id
        LEFT JOIN groups g ON g.id = p.group_id
        WHERE p.author_id = $1
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(author_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

/// Count posts written by authors the user follows
pub async fn count_followed(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM posts p
        JOIN follows f ON f.author_id = p.author_id
        WHERE f.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// List posts written by authors the user follows, newest first
pub async fn list_followed(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Post>, sqlx::Error> {
    let posts = sqlx::query_as::<_, Post>(
        r#"
        SELECT p.id, p.text, p.author_id, u.username AS author_username,
               p.group_id, g.title AS group_title, g.slug AS group_slug,
               p.image_key, p.created_at
        FROM posts p
        JOIN follows f ON f.author_id = p.author_id
        JOIN users u ON u.id = p.author_id
        LEFT JOIN groups g ON g.id = p.group_id
        WHERE f.user_id = $1
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

/// Create a post; returns the new id
pub async fn create(
    pool: &PgPool,
    author_id: Uuid,
    text: &str,
    group_id: Option<Uuid>,
    image_key: Option<&str>,
) -> Result<Uuid, sqlx::Error> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO posts (text, author_id, group_id, image_key)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(text)
    .bind(author_id)
    .bind(group_id)
    .bind(image_key)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Update a post's editable fields in place
pub async fn update(
    pool: &PgPool,
    post_id: Uuid,
    text: &str,
    group_id: Option<Uuid>,
    image_key: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE posts
        SET text = $1, group_id = $2, image_key = $3
        WHERE id = $4
        "#,
    )
    .bind(text)
    .bind(group_id)
    .bind(image_key)
    .bind(post_id)
    .execute(pool)
    .await?;

    Ok(())
}
