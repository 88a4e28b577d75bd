use warp::{reject::Rejection, Filter};

use super::jwt::{verify_jwt_session, SessionData};

pub fn with_auth() -> impl Filter<Extract = ((),), Error = Rejection> + Copy {
    warp::cookie::<String>("session").and_then(|session: String| async move {
        match verify_jwt_session(session) {
            Ok(_) => Ok(()),
            Err(e) => Err(warp::reject::custom(e)),
        }
    })
}

pub fn with_session() -> impl Filter<Extract = (SessionData,), Error = Rejection> + Copy {
    warp::cookie::<String>("session").and_then(|session: String| async move {
        match verify_jwt_session(session) {
            Ok(data) => Ok(SessionData::from(data)),
            Err(e) => Err(warp::reject::custom(e)),
        }
    })
}

/// Like `with_session`, but anonymous requests pass through with `None`
/// instead of being rejected. Invalid tokens are still rejected.
pub fn with_possible_session(
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Copy {
    warp::cookie::optional::<String>("session").and_then(|session: Option<String>| async move {
        match session {
            Some(session) => match verify_jwt_session(session) {
                Ok(data) => Ok(Some(SessionData::from(data))),
                Err(e) => Err(warp::reject::custom(e)),
            },
            None => Ok::<_, Rejection>(None),
        }
    })
}
