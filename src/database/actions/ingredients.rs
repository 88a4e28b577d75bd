use std::collections::HashSet;

use sqlx::{Pool, Postgres};

use crate::{error::Error, schema::Ingredient};

/// Lists the ingredient catalog, optionally filtered by a name prefix.
pub async fn list_ingredients(
    search: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = match search {
        Some(search) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name")
                .bind(format!("{search}%"))
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
                .fetch_all(pool)
                .await?
        }
    };

    Ok(rows)
}

pub async fn get_ingredient(id: i32, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn find_ingredient(name: &str, pool: &Pool<Postgres>) -> Result<Option<i32>, Error> {
    let row: Option<(i32,)> =
        sqlx::query_as("SELECT id FROM ingredients WHERE LOWER(name) = LOWER($1)")
            .bind(name)
            .fetch_optional(pool)
            .await?;

    Ok(row.map(|r| r.0))
}

/// Catalog maintenance; callers invalidate the reference cache afterwards.
pub async fn create_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
) -> Result<i32, Error> {
    if name.trim().is_empty() {
        return Err(Error::invalid_field("name", "must not be empty"));
    }
    if measurement_unit.trim().is_empty() {
        return Err(Error::invalid_field(
            "measurement_unit",
            "must not be empty",
        ));
    }

    let row: Option<(i32,)> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(id) => Ok(id.0),
        None => Err(Error::AlreadyExists("ingredient")),
    }
}

/// Batch existence check used by recipe validation: every id must resolve to
/// a catalog row, otherwise the payload references a dangling ingredient.
pub async fn resolve_ingredients(
    ids: &[i32],
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let rows: Vec<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;

    let unique: HashSet<i32> = ids.iter().copied().collect();
    if rows.len() != unique.len() {
        return Err(Error::NotFound("ingredient"));
    }

    Ok(rows)
}
