use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    authentication::permissions::ActionType,
    constants::RECIPE_COUNT_PER_PAGE,
    error::Error,
    form::{IngredientEntry, RecipeForm},
    jwt::SessionData,
    pagination::PageContext,
    schema::{Recipe, RecipeDetail, RecipeIngredient, RecipeOrder, RecipeRow},
};

use super::{get_profile, list_recipe_tags, resolve_ingredients, resolve_tags};

pub async fn get_recipe(id: i32, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Fetches a recipe for mutation: the author may edit their own recipes, an
/// administrator may edit any. Everyone else is rejected.
pub async fn get_recipe_mut(
    id: i32,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, Error> {
    let recipe = get_recipe(id, pool).await?.ok_or(Error::NotFound("recipe"))?;

    session.authorize(ActionType::ManageOwnRecipes)?;
    if session.authorize(ActionType::ManageAllRecipes).is_ok() {
        return Ok(recipe);
    }
    if recipe.author_id != session.user_id {
        return Err(Error::Forbidden);
    }

    Ok(recipe)
}

pub async fn fetch_recipes(
    author: Option<i32>,
    tag_slug: Option<&str>,
    order: Option<RecipeOrder>,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, Error> {
    let order = order
        .map(|order| match order {
            RecipeOrder::Newest => "pub_date DESC",
            RecipeOrder::Alphabetical => "name",
        })
        .unwrap_or("pub_date DESC");

    let rows: Vec<RecipeRow> = match (author, tag_slug) {
        (Some(author), Some(tag_slug)) => {
            sqlx::query_as(&format!("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE r.author_id = $1 AND r.id IN (SELECT rt.recipe_id FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE t.slug = $2) ORDER BY {order} LIMIT $3 OFFSET $4"))
                .bind(author)
                .bind(tag_slug)
                .bind(RECIPE_COUNT_PER_PAGE)
                .bind(offset)
                .fetch_all(pool).await?
        }
        (Some(author), None) => {
            sqlx::query_as(&format!("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE r.author_id = $1 ORDER BY {order} LIMIT $2 OFFSET $3"))
                .bind(author)
                .bind(RECIPE_COUNT_PER_PAGE)
                .bind(offset)
                .fetch_all(pool).await?
        }
        (None, Some(tag_slug)) => {
            sqlx::query_as(&format!("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r WHERE r.id IN (SELECT rt.recipe_id FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE t.slug = $1) ORDER BY {order} LIMIT $2 OFFSET $3"))
                .bind(tag_slug)
                .bind(RECIPE_COUNT_PER_PAGE)
                .bind(offset)
                .fetch_all(pool).await?
        }
        (None, None) => {
            sqlx::query_as(&format!("SELECT r.*, COUNT(*) OVER() AS count FROM recipes r ORDER BY {order} LIMIT $1 OFFSET $2"))
                .bind(RECIPE_COUNT_PER_PAGE)
                .bind(offset)
                .fetch_all(pool).await?
        }
    };

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    Ok(PageContext::from_rows(
        rows,
        total_count,
        RECIPE_COUNT_PER_PAGE,
        offset,
    ))
}

/// Associations of one recipe, joined to the catalog and ordered by
/// ingredient name (client payload order is not preserved).
pub async fn list_recipe_ingredients(
    pool: &Pool<Postgres>,
    recipe_id: i32,
) -> Result<Vec<RecipeIngredient>, Error> {
    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT ri.recipe_id, ri.ingredient_id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
        ORDER BY i.name
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Assembles the full read projection for a recipe as seen by `viewer`.
pub async fn get_recipe_detail(
    id: i32,
    viewer: Option<i32>,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeDetail>, Error> {
    let recipe = match get_recipe(id, pool).await? {
        Some(recipe) => recipe,
        None => return Ok(None),
    };

    let author = get_profile(pool, recipe.author_id, viewer)
        .await?
        .ok_or(Error::NotFound("user"))?;
    let tags = list_recipe_tags(pool, recipe.id).await?;
    let ingredients = list_recipe_ingredients(pool, recipe.id).await?;

    let flags: (bool, bool) = sqlx::query_as(
        "
        SELECT
            EXISTS(SELECT 1 FROM user_favorites WHERE user_id = $1 AND recipe_id = $2),
            EXISTS(SELECT 1 FROM user_shopping_cart WHERE user_id = $1 AND recipe_id = $2)
    ",
    )
    .bind(viewer)
    .bind(recipe.id)
    .fetch_one(pool)
    .await?;

    Ok(Some(RecipeDetail {
        id: recipe.id,
        author,
        name: recipe.name,
        text: recipe.text,
        image: recipe.image,
        cooking_time: recipe.cooking_time,
        pub_date: recipe.pub_date,
        tags,
        ingredients,
        is_favorited: flags.0,
        is_in_shopping_cart: flags.1,
    }))
}

/// Creates the whole aggregate in one transaction: recipe row, ingredient
/// associations and tag links either all exist afterwards or none do.
pub async fn create_recipe(
    author_id: i32,
    form: &RecipeForm,
    image: String,
    pool: &Pool<Postgres>,
) -> Result<i32, Error> {
    form.validate()?;
    let ingredient_ids: Vec<i32> = form.ingredients.iter().map(|entry| entry.id).collect();
    resolve_ingredients(&ingredient_ids, pool).await?;
    resolve_tags(&form.tags, pool).await?;

    let mut tr = pool.begin().await?;

    let id: (i32,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time, pub_date)
        VALUES ($1, $2, $3, $4, $5, NOW())
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&form.name)
    .bind(&form.text)
    .bind(&image)
    .bind(form.cooking_time)
    .fetch_one(&mut *tr)
    .await?;

    insert_recipe_ingredients(&mut tr, id.0, &form.ingredients).await?;
    insert_recipe_tags(&mut tr, id.0, &form.tags).await?;

    tr.commit().await?;

    Ok(id.0)
}

/// Updates the aggregate by wholesale replacement: the existing association
/// and tag sets are deleted and the payload's sets inserted, in one
/// transaction. Ingredient lists are small, so no diffing.
pub async fn update_recipe(
    recipe: &Recipe,
    form: &RecipeForm,
    image: Option<String>,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    form.validate()?;
    let ingredient_ids: Vec<i32> = form.ingredients.iter().map(|entry| entry.id).collect();
    resolve_ingredients(&ingredient_ids, pool).await?;
    resolve_tags(&form.tags, pool).await?;

    let mut tr = pool.begin().await?;

    sqlx::query(
        "
        UPDATE recipes
        SET name = $1, text = $2, cooking_time = $3, image = COALESCE($4, image)
        WHERE id = $5
    ",
    )
    .bind(&form.name)
    .bind(&form.text)
    .bind(form.cooking_time)
    .bind(image)
    .bind(recipe.id)
    .execute(&mut *tr)
    .await?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe.id)
        .execute(&mut *tr)
        .await?;

    insert_recipe_ingredients(&mut tr, recipe.id, &form.ingredients).await?;
    insert_recipe_tags(&mut tr, recipe.id, &form.tags).await?;

    tr.commit().await?;

    Ok(())
}

pub async fn delete_recipe(id: i32, pool: &Pool<Postgres>) -> Result<(), Error> {
    let mut tr = pool.begin().await?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM user_favorites WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM user_shopping_cart WHERE recipe_id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await?;

    tr.commit().await?;
    Ok(())
}

async fn insert_recipe_ingredients(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: i32,
    entries: &[IngredientEntry],
) -> Result<(), Error> {
    if entries.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
    builder.push_values(entries, |mut row, entry| {
        row.push_bind(recipe_id)
            .push_bind(entry.id)
            .push_bind(entry.amount);
    });
    builder.build().execute(&mut **tr).await?;

    Ok(())
}

async fn insert_recipe_tags(
    tr: &mut Transaction<'_, Postgres>,
    recipe_id: i32,
    tag_ids: &[i32],
) -> Result<(), Error> {
    if tag_ids.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    builder.push_values(tag_ids, |mut row, tag_id| {
        row.push_bind(recipe_id).push_bind(tag_id);
    });
    builder.build().execute(&mut **tr).await?;

    Ok(())
}
