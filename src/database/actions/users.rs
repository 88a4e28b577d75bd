use sqlx::{Pool, Postgres};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::generate_jwt_session,
    },
    error::Error,
    schema::{User, UserProfile},
};

fn valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= 150
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

pub async fn get_user(pool: &Pool<Postgres>, username: &str) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: i32) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Fetches a user as seen by `viewer`; `is_subscribed` is false for anonymous
/// viewers.
pub async fn get_profile(
    pool: &Pool<Postgres>,
    user_id: i32,
    viewer: Option<i32>,
) -> Result<Option<UserProfile>, Error> {
    let row: Option<UserProfile> = sqlx::query_as(
        "
        SELECT u.id, u.username, u.email, u.first_name, u.last_name,
            EXISTS(
                SELECT 1 FROM user_follows f
                WHERE f.user_id = $2 AND f.author_id = u.id
            ) AS is_subscribed
        FROM users u
        WHERE u.id = $1
    ",
    )
    .bind(user_id)
    .bind(viewer)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Registers a user. The password is hashed before it touches storage; the
/// username/email uniqueness constraint is the authoritative duplicate check.
pub async fn register_user(
    username: &str,
    email: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<i32, Error> {
    if !valid_username(username) {
        return Err(Error::invalid_field(
            "username",
            "only letters, digits, '-' and '_' are allowed",
        ));
    }
    if !valid_email(email) {
        return Err(Error::invalid_field("email", "not a valid address"));
    }
    if password.len() < 8 {
        return Err(Error::invalid_field(
            "password",
            "must be at least 8 characters",
        ));
    }

    let password = hash_password(password)
        .map_err(|_e| Error::invalid_field("password", "could not be hashed"))?;

    let row: Option<(i32,)> = sqlx::query_as(
        "
        INSERT INTO users (username, email, first_name, last_name, password, role)
        VALUES ($1, $2, $3, $4, $5, 'user')
        ON CONFLICT DO NOTHING RETURNING id;
    ",
    )
    .bind(username)
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .bind(password)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(id) => Ok(id.0),
        None => Err(Error::AlreadyExists("user")),
    }
}

pub async fn login_user(
    username: &str,
    password: &str,
    pool: &Pool<Postgres>,
) -> Result<String, Error> {
    let user = get_user(pool, username)
        .await?
        .ok_or(Error::InvalidCredentials)?;

    let authenticated =
        verify_password(password, &user.password).map_err(|_e| Error::InvalidCredentials)?;
    if !authenticated {
        return Err(Error::InvalidCredentials);
    }

    generate_jwt_session(&user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_charset_is_enforced() {
        assert!(valid_username("chef_anna-42"));
        assert!(!valid_username(""));
        assert!(!valid_username("anna baker"));
        assert!(!valid_username("anna@home"));
    }

    #[test]
    fn email_shape_is_enforced() {
        assert!(valid_email("anna@example.com"));
        assert!(!valid_email("anna"));
        assert!(!valid_email("@example.com"));
        assert!(!valid_email("anna@nodot"));
    }
}
