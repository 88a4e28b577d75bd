use std::convert::Infallible;

use serde::Serialize;
use warp::{http::StatusCode, reject::Rejection, reply::Reply};

/// Domain error taxonomy. Every validation failure is detected before any
/// write happens; storage-level constraint violations that race past the
/// application checks are translated here instead of leaking raw sqlx errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("ingredient {ingredient_id} has a non-positive amount ({amount})")]
    InvalidQuantity { ingredient_id: i32, amount: i32 },
    #[error("ingredient {ingredient_id} is listed more than once")]
    DuplicateIngredient { ingredient_id: i32 },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0} already exists")]
    AlreadyExists(&'static str),
    #[error("subscribing to yourself is not allowed")]
    SelfFollow,
    #[error("you don't have permission to perform this action")]
    Forbidden,
    #[error("shopping cart is empty")]
    EmptyCart,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid session: {0}")]
    InvalidSession(&'static str),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidField { .. }
            | Error::InvalidQuantity { .. }
            | Error::DuplicateIngredient { .. }
            | Error::AlreadyExists(_)
            | Error::SelfFollow
            | Error::EmptyCart => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials | Error::InvalidSession(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Query(_) | Error::Cache(_) | Error::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl warp::reject::Reject for Error {}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        if let sqlx::Error::Database(e) = &value {
            match e.kind() {
                sqlx::error::ErrorKind::UniqueViolation => return Error::AlreadyExists("record"),
                sqlx::error::ErrorKind::ForeignKeyViolation => {
                    return Error::NotFound("referenced record")
                }
                _ => {}
            }
        }
        Error::Query(QueryError::from(value))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("query failed: {info}")]
pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self::new(String::from("row not found")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("worker crashed")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("type not found: {type_name}"))
            }
            sqlx::Error::ColumnNotFound(column) => Self::new(format!("column not found: {column}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("column decode failed at {index}: {source}"))
            }
            e => Self::new(format!("{e}")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("cache unavailable: {info}")]
pub struct CacheError {
    info: String,
}

impl CacheError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

#[derive(Serialize)]
struct ErrorMessage {
    code: u16,
    message: String,
}

/// Warp recovery filter mapping domain errors to a status code and JSON body.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, String::from("resource not found"))
    } else if let Some(e) = err.find::<Error>() {
        if e.status().is_server_error() {
            log::error!("request failed: {e}");
        }
        (e.status(), e.to_string())
    } else if err
        .find::<warp::filters::body::BodyDeserializeError>()
        .is_some()
    {
        (StatusCode::BAD_REQUEST, String::from("malformed request body"))
    } else {
        log::error!("unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("internal server error"),
        )
    };

    let body = warp::reply::json(&ErrorMessage {
        code: code.as_u16(),
        message,
    });

    Ok(warp::reply::with_status(body, code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_bad_request() {
        assert_eq!(
            Error::invalid_field("cooking_time", "must be positive").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::InvalidQuantity {
                ingredient_id: 3,
                amount: 0
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::DuplicateIngredient { ingredient_id: 3 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::EmptyCart.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn lookup_and_permission_errors_keep_their_codes() {
        assert_eq!(Error::NotFound("recipe").status(), StatusCode::NOT_FOUND);
        assert_eq!(Error::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            Error::InvalidSession("token expired").status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn unique_violations_become_already_exists() {
        // sqlx does not expose a constructor for database errors, so check the
        // fallback wrapping path instead.
        let err = Error::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, Error::Query(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn recovery_maps_rejections_to_json_responses() {
        let _ = env_logger::builder().is_test(true).try_init();

        let response = handle_rejection(warp::reject::custom(Error::NotFound("recipe")))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = handle_rejection(warp::reject::not_found())
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        // Server errors are logged by the recovery filter before responding.
        let response = handle_rejection(warp::reject::custom(Error::from(sqlx::Error::RowNotFound)))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
