use std::collections::HashSet;

use sqlx::{Pool, Postgres};

use crate::{error::Error, schema::Tag};

fn valid_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    let rows: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

pub async fn get_tag(id: i32, pool: &Pool<Postgres>) -> Result<Option<Tag>, Error> {
    let row: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn find_tag(slug: &str, pool: &Pool<Postgres>) -> Result<Option<i32>, Error> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT id FROM tags WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|tag| tag.0))
}

/// Catalog maintenance; callers invalidate the reference cache afterwards.
pub async fn create_tag(
    name: &str,
    color: &str,
    slug: &str,
    pool: &Pool<Postgres>,
) -> Result<i32, Error> {
    if name.trim().is_empty() {
        return Err(Error::invalid_field("name", "must not be empty"));
    }
    if !valid_color(color) {
        return Err(Error::invalid_field("color", "expected #RRGGBB"));
    }
    if !valid_slug(slug) {
        return Err(Error::invalid_field(
            "slug",
            "only lowercase letters, digits, '-' and '_' are allowed",
        ));
    }

    let row: Option<(i32,)> = sqlx::query_as(
        "
        INSERT INTO tags (name, color, slug)
        VALUES ($1, $2, $3)
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(name)
    .bind(color)
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(id) => Ok(id.0),
        None => Err(Error::AlreadyExists("tag")),
    }
}

pub async fn list_recipe_tags(pool: &Pool<Postgres>, recipe_id: i32) -> Result<Vec<Tag>, Error> {
    let rows: Vec<Tag> = sqlx::query_as(
        "
        SELECT t.*
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = $1
        ORDER BY t.name
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Batch existence check mirroring `resolve_ingredients`.
pub async fn resolve_tags(ids: &[i32], pool: &Pool<Postgres>) -> Result<Vec<Tag>, Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let rows: Vec<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;

    let unique: HashSet<i32> = ids.iter().copied().collect();
    if rows.len() != unique.len() {
        return Err(Error::NotFound("tag"));
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_must_be_a_hex_triplet() {
        assert!(valid_color("#49B64E"));
        assert!(valid_color("#ffffff"));
        assert!(!valid_color("49B64E"));
        assert!(!valid_color("#49B64"));
        assert!(!valid_color("#49B64G"));
    }

    #[test]
    fn slug_charset_is_enforced() {
        assert!(valid_slug("breakfast"));
        assert!(valid_slug("low-carb_2"));
        assert!(!valid_slug("Breakfast"));
        assert!(!valid_slug("salty soup"));
        assert!(!valid_slug(""));
    }
}
