use sqlx::PgPool;
use uuid::Uuid;

// Duplicate edges are prevented by the (user_id, author_id) primary key;
// creation leans on ON CONFLICT rather than application-level locking.

/// Idempotent create; returns true if a new edge was inserted
pub async fn create(pool: &PgPool, user_id: Uuid, author_id: Uuid) -> Result<bool, sqlx::Error> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO follows (user_id, author_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, author_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(inserted > 0)
}

/// Delete the edge; returns true if one existed
pub async fn delete(pool: &PgPool, user_id: Uuid, author_id: Uuid) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query(
        r#"
        DELETE FROM follows
        WHERE user_id = $1 AND author_id = $2
        "#,
    )
    .bind(user_id)
    .bind(author_id)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

/// Does `user_id` follow `author_id`?
pub async fn exists(pool: &PgPool, user_id: Uuid, author_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_one(pool)
    .await
}
