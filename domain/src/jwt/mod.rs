//! Issuing and verifying the HS256 login tokens handed out by the login endpoint.
//!
//! The same token authenticates REST calls (as an `Authorization: Bearer`
//! header) and WebSocket connections (as the `token` query parameter or an
//! `authenticate` event).
//!
//! # Example
//!
//! ```rust
//! use domain::{jwt, store::Store, user};
//! use service::config::Config;
//!
//! let config = Config::from_defaults();
//! let store = Store::new();
//! let user = user::register(
//!     &store,
//!     user::Registration {
//!         username: "alice".into(),
//!         email: "alice@example.com".into(),
//!         password: "password123".into(),
//!     },
//! )
//! .unwrap();
//!
//! let jwt = jwt::issue_token(&config, &user).unwrap();
//! let claims = jwt::verify_token(&config, &jwt.token).unwrap();
//! assert_eq!(claims.username, "alice");
//! ```

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use serde::Serialize;
use service::config::Config;
use utoipa::ToSchema;

use crate::error::Error;
use crate::user::User;

pub use claims::Claims;

pub(crate) mod claims;

/// Represents a JSON Web Token (JWT).
///
/// - `token`: the encoded JWT.
/// - `sub`: the subject of the JWT, for reading it without decoding the token.
#[derive(Serialize, Debug, Clone, ToSchema)]
#[schema(as = jwt::Jwt)]
pub struct Jwt {
    pub token: String,
    pub sub: String,
}

pub fn issue_token(config: &Config, user: &User) -> Result<Jwt, Error> {
    let iat = Utc::now().timestamp().max(0) as u64;
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        iat,
        exp: iat + config.jwt_expiry_seconds,
    };
    encode_claims(config, &claims)
}

pub fn verify_token(config: &Config, token: &str) -> Result<Claims, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret().as_bytes()),
        &validation,
    )
    .map_err(|err| {
        debug!("Rejected token: {err}");
        Error::from(err)
    })?;

    Ok(data.claims)
}

fn encode_claims(config: &Config, claims: &Claims) -> Result<Jwt, Error> {
    let token = encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(config.jwt_secret().as_bytes()),
    )?;

    Ok(Jwt {
        token,
        sub: claims.sub.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, TokenErrorKind};
    use crate::store::Store;
    use crate::user::{register, Registration};

    fn user() -> User {
        register(
            &Store::new(),
            Registration {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "password123".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn issued_tokens_verify_with_the_same_secret() {
        let config = Config::from_defaults().set_jwt_secret("test-secret");
        let user = user();

        let jwt = issue_token(&config, &user).unwrap();
        assert_eq!(jwt.sub, user.id.to_string());

        let claims = verify_token(&config, &jwt.token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, config.jwt_expiry_seconds);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_invalid() {
        let user = user();
        let jwt = issue_token(&Config::from_defaults().set_jwt_secret("one"), &user).unwrap();

        let err = verify_token(&Config::from_defaults().set_jwt_secret("two"), &jwt.token)
            .unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Token(TokenErrorKind::Invalid)
        );
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let config = Config::from_defaults();
        let now = Utc::now().timestamp() as u64;
        let jwt = encode_claims(
            &config,
            &Claims {
                sub: "u1".to_string(),
                username: "alice".to_string(),
                iat: now - 120,
                exp: now - 60,
            },
        )
        .unwrap();

        let err = verify_token(&config, &jwt.token).unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Token(TokenErrorKind::Expired)
        );
    }

    #[test]
    fn garbage_is_an_invalid_token() {
        let err = verify_token(&Config::from_defaults(), "not-a-jwt").unwrap_err();
        assert!(matches!(err.error_kind, DomainErrorKind::Token(_)));
    }
}
