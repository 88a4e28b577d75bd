use redis::{aio::MultiplexedConnection, AsyncCommands, FromRedisValue, ToRedisArgs};
use redis_macros::{FromRedisValue, ToRedisArgs};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};

use crate::{
    actions::{list_ingredients, list_tags},
    error::{CacheError, Error},
    schema::{Ingredient, Tag},
};

pub const INGREDIENT_CATALOG_KEY: &str = "catalog:ingredients";
pub const TAG_CATALOG_KEY: &str = "catalog:tags";

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone)]
pub struct IngredientCatalog {
    pub rows: Vec<Ingredient>,
}

#[derive(Serialize, Deserialize, FromRedisValue, ToRedisArgs, Clone)]
pub struct TagCatalog {
    pub rows: Vec<Tag>,
}

/// Ingredient catalog, served from the reference cache when possible. Cache
/// failures are logged and degrade to a direct database read; callers never
/// see them.
pub async fn ingredient_catalog(
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Vec<Ingredient>, Error> {
    match get_cache_value::<_, IngredientCatalog>(INGREDIENT_CATALOG_KEY, cache).await {
        Ok(Some(catalog)) => {
            log::trace!("> found {INGREDIENT_CATALOG_KEY}");
            return Ok(catalog.rows);
        }
        Ok(None) => {}
        Err(e) => log::error!("> catalog cache read failed: {e}"),
    }

    log::trace!("> fetching {INGREDIENT_CATALOG_KEY}");
    let rows = list_ingredients(None, pool).await?;

    if let Err(e) = set_cache_value(
        INGREDIENT_CATALOG_KEY,
        IngredientCatalog { rows: rows.clone() },
        cache,
    )
    .await
    {
        log::error!("> catalog cache write failed: {e}");
    }

    Ok(rows)
}

pub async fn invalidate_ingredient_catalog(
    cache: &mut MultiplexedConnection,
) -> Result<(), CacheError> {
    delete_cache_value(INGREDIENT_CATALOG_KEY, cache).await
}

/// Tag list, served from the reference cache when possible.
pub async fn tag_catalog(
    pool: &Pool<Postgres>,
    cache: &mut MultiplexedConnection,
) -> Result<Vec<Tag>, Error> {
    match get_cache_value::<_, TagCatalog>(TAG_CATALOG_KEY, cache).await {
        Ok(Some(catalog)) => {
            log::trace!("> found {TAG_CATALOG_KEY}");
            return Ok(catalog.rows);
        }
        Ok(None) => {}
        Err(e) => log::error!("> catalog cache read failed: {e}"),
    }

    log::trace!("> fetching {TAG_CATALOG_KEY}");
    let rows = list_tags(pool).await?;

    if let Err(e) = set_cache_value(TAG_CATALOG_KEY, TagCatalog { rows: rows.clone() }, cache).await
    {
        log::error!("> catalog cache write failed: {e}");
    }

    Ok(rows)
}

pub async fn invalidate_tag_catalog(cache: &mut MultiplexedConnection) -> Result<(), CacheError> {
    delete_cache_value(TAG_CATALOG_KEY, cache).await
}

// Cache - raw handlers

pub async fn set_cache_value<K: ToRedisArgs + Send + Sync, V: ToRedisArgs + Send + Sync>(
    key: K,
    value: V,
    cache: &mut MultiplexedConnection,
) -> Result<(), CacheError> {
    let _: () = cache.set(key, value).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn delete_cache_value<K: ToRedisArgs + Send + Sync>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<(), CacheError> {
    let _: () = cache.del(key).await.map_err(CacheError::from)?;

    Ok(())
}

pub async fn get_cache_value<K: ToRedisArgs + Send + Sync, V: FromRedisValue>(
    key: K,
    cache: &mut MultiplexedConnection,
) -> Result<Option<V>, CacheError> {
    let value: Option<V> = cache.get(key).await.map_err(CacheError::from)?;

    Ok(value)
}
