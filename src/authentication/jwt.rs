use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::constants::SESSION_LIFETIME_HOURS;
use crate::error::Error;
use crate::schema::{User, UserRole};

use super::permissions::ActionType;

fn session_key() -> Hmac<Sha256> {
    let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        log::warn!("JWT_SECRET is not set, signing sessions with the insecure default");
        String::from("insecure-dev-secret")
    });
    Hmac::new_from_slice(secret.as_bytes()).expect("hmac accepts keys of any length")
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: i32, username: String, role: UserRole) -> Self {
        Self::with_lifetime(id, username, role, Duration::hours(SESSION_LIFETIME_HOURS))
    }

    pub fn with_lifetime(id: i32, username: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authorize(&self, action: ActionType) -> Result<(), Error> {
        if !action.permitted(self) {
            return Err(Error::Forbidden);
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

pub fn generate_jwt_session(user: &User) -> Result<String, Error> {
    let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.role);

    claims
        .sign_with_key(&session_key())
        .map_err(|_e| Error::InvalidSession("could not sign token"))
}

pub fn verify_jwt_session(token: String) -> Result<JwtSessionData, Error> {
    let session: JwtSessionData = token
        .verify_with_key(&session_key())
        .map_err(|_e| Error::InvalidSession("invalid token"))?;

    if (session.exp - Local::now().timestamp()).is_negative() {
        return Err(Error::InvalidSession("token expired"));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            username: String::from("chef_anna"),
            email: String::from("anna@example.com"),
            first_name: None,
            last_name: None,
            password: String::from("<hash>"),
            role: UserRole::User,
        }
    }

    #[test]
    fn session_round_trips_through_the_token() {
        let token = generate_jwt_session(&user()).unwrap();
        let session = verify_jwt_session(token).unwrap();

        assert_eq!(session.user_id, 7);
        assert_eq!(session.username, "chef_anna");
        assert_eq!(session.role, UserRole::User);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let claims = JwtSessionData::with_lifetime(
            7,
            String::from("chef_anna"),
            UserRole::User,
            Duration::hours(-2),
        );
        let token = claims.sign_with_key(&session_key()).unwrap();

        assert!(matches!(
            verify_jwt_session(token),
            Err(Error::InvalidSession("token expired"))
        ));
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let mut token = generate_jwt_session(&user()).unwrap();
        token.push('x');

        assert!(matches!(
            verify_jwt_session(token),
            Err(Error::InvalidSession("invalid token"))
        ));
    }

    #[test]
    fn admin_flag_follows_the_role() {
        let session: SessionData =
            JwtSessionData::new(1, String::from("root"), UserRole::Admin).into();
        assert!(session.is_admin);

        let session: SessionData =
            JwtSessionData::new(2, String::from("guest"), UserRole::User).into();
        assert!(!session.is_admin);
    }
}
