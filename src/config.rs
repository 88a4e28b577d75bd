use std::path::PathBuf;

use redis::aio::MultiplexedConnection;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::error::{CacheError, Error};

/// Builds the postgres pool from `DATABASE_URL`. `.env` is honored when
/// present.
pub async fn connect_database() -> Result<Pool<Postgres>, Error> {
    dotenv::dotenv().ok();

    let url = std::env::var("DATABASE_URL")
        .map_err(|_e| Error::invalid_field("DATABASE_URL", "environment variable is not set"))?;

    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await?;

    log::info!("connected to postgres");
    Ok(pool)
}

/// Opens the redis connection backing the reference-data cache, from
/// `REDIS_URL` (defaulting to a local instance).
pub async fn connect_cache() -> Result<MultiplexedConnection, Error> {
    dotenv::dotenv().ok();

    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| String::from("redis://127.0.0.1/"));
    let client = redis::Client::open(url).map_err(CacheError::from)?;

    let connection = client
        .get_multiplexed_async_connection()
        .await
        .map_err(CacheError::from)?;

    log::info!("connected to redis");
    Ok(connection)
}

/// Directory image uploads are written to, from `MEDIA_ROOT`.
pub fn media_root() -> PathBuf {
    dotenv::dotenv().ok();

    std::env::var("MEDIA_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("media"))
}
