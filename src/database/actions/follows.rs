use sqlx::{Pool, Postgres};

use crate::{
    constants::{DEFAULT_RECIPES_LIMIT, SUBSCRIPTION_COUNT_PER_PAGE},
    error::Error,
    pagination::PageContext,
    schema::{AuthorRow, Follow, RecipeSummary, Subscription, UserProfile},
};

use super::get_user_by_id;

pub async fn is_subscribed(
    user_id: i32,
    author_id: i32,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT author_id FROM user_follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

/// Subscribes `user_id` to `author_id`'s recipes. Self-follows are rejected
/// at this write boundary; duplicates are reported by the storage constraint.
pub async fn subscribe(
    user_id: i32,
    author_id: i32,
    pool: &Pool<Postgres>,
) -> Result<Follow, Error> {
    if user_id == author_id {
        return Err(Error::SelfFollow);
    }

    get_user_by_id(pool, author_id)
        .await?
        .ok_or(Error::NotFound("user"))?;

    let result =
        sqlx::query("INSERT INTO user_follows (user_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(author_id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(Error::AlreadyExists("subscription"));
    }

    Ok(Follow { user_id, author_id })
}

pub async fn unsubscribe(user_id: i32, author_id: i32, pool: &Pool<Postgres>) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM user_follows WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("subscription"));
    }

    Ok(())
}

/// Lists the authors `user_id` follows, each with a capped preview of their
/// recipes (`recipes_limit`, defaulting to a few per author).
pub async fn list_subscriptions(
    user_id: i32,
    offset: i64,
    recipes_limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<PageContext<Subscription>, Error> {
    let recipes_limit = recipes_limit.unwrap_or(DEFAULT_RECIPES_LIMIT).max(0);

    let authors: Vec<AuthorRow> = sqlx::query_as(
        "
        SELECT u.id, u.username, u.email, u.first_name, u.last_name, COUNT(*) OVER() AS count
        FROM user_follows f
        INNER JOIN users u ON u.id = f.author_id
        WHERE f.user_id = $1
        ORDER BY u.username
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(SUBSCRIPTION_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total_count = authors.first().map(|a| a.count).unwrap_or(0);

    let mut subscriptions = Vec::with_capacity(authors.len());
    for author in authors {
        let recipes: Vec<RecipeSummary> = sqlx::query_as(
            "
            SELECT id, name, image, cooking_time
            FROM recipes
            WHERE author_id = $1
            ORDER BY pub_date DESC
            LIMIT $2
        ",
        )
        .bind(author.id)
        .bind(recipes_limit)
        .fetch_all(pool)
        .await?;

        let recipes_count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
                .bind(author.id)
                .fetch_one(pool)
                .await?;

        subscriptions.push(Subscription {
            author: UserProfile {
                id: author.id,
                username: author.username,
                email: author.email,
                first_name: author.first_name,
                last_name: author.last_name,
                is_subscribed: true,
            },
            recipes,
            recipes_count: recipes_count.0,
        });
    }

    Ok(PageContext::from_rows(
        subscriptions,
        total_count,
        SUBSCRIPTION_COUNT_PER_PAGE,
        offset,
    ))
}
