use sqlx::{Pool, Postgres};

use crate::{
    constants::RECIPE_COUNT_PER_PAGE,
    error::Error,
    pagination::PageContext,
    schema::{RecipeRow, RecipeSummary},
};

use super::get_recipe;

pub async fn is_favorite(
    recipe_id: i32,
    user_id: i32,
    pool: &Pool<Postgres>,
) -> Result<bool, Error> {
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT recipe_id FROM user_favorites WHERE recipe_id = $1 AND user_id = $2")
            .bind(recipe_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.is_some())
}

/// Adds a recipe to the user's favorites. The uniqueness constraint is the
/// authoritative duplicate signal, so a concurrent double-add cannot insert
/// two rows.
pub async fn add_to_favorites(
    recipe_id: i32,
    user_id: i32,
    pool: &Pool<Postgres>,
) -> Result<RecipeSummary, Error> {
    let recipe = get_recipe(recipe_id, pool)
        .await?
        .ok_or(Error::NotFound("recipe"))?;

    let result =
        sqlx::query("INSERT INTO user_favorites (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(recipe_id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(Error::AlreadyExists("favorite"));
    }

    Ok(RecipeSummary::from(recipe))
}

pub async fn remove_from_favorites(
    recipe_id: i32,
    user_id: i32,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM user_favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("favorite"));
    }

    Ok(())
}

pub async fn fetch_favorites(
    user_id: i32,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, Error> {
    let rows: Vec<RecipeRow> = sqlx::query_as(
        "
        SELECT r.*, COUNT(*) OVER() AS count
        FROM user_favorites f
        INNER JOIN recipes r ON r.id = f.recipe_id
        WHERE f.user_id = $1
        ORDER BY r.pub_date DESC
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(RECIPE_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    Ok(PageContext::from_rows(
        rows,
        total_count,
        RECIPE_COUNT_PER_PAGE,
        offset,
    ))
}
