//! Request identity: a signed session token round-tripped in a cookie,
//! plus one-shot flash notices.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::AppError;
use crate::state::AppState;
use crate::users::repo::{self, User};

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

/// Signing and verification keys for the session token.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let SessionConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
        } = state.config.session.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            ttl: Duration::minutes(ttl_minutes),
        }
    }
}

impl SessionKeys {
    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let claims = SessionClaims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: (now + self.ttl).unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "session token signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<SessionClaims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<SessionClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

/// Establishes the session identity: called exactly once per successful
/// authentication.
pub fn login(jar: CookieJar, keys: &SessionKeys, user_id: Uuid) -> anyhow::Result<CookieJar> {
    let token = keys.sign(user_id)?;
    Ok(jar.add(
        Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true),
    ))
}

/// Clears the session identity.
pub fn logout(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

fn token_from_parts(parts: &Parts, jar: &CookieJar) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    // Bearer fallback for non-browser clients.
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

async fn actor_from_parts(parts: &mut Parts, state: &AppState) -> Option<User> {
    let jar = CookieJar::from_request_parts(parts, state).await.ok()?;
    let token = token_from_parts(parts, &jar)?;
    let keys = SessionKeys::from_ref(state);
    let claims = match keys.verify(&token) {
        Ok(c) => c,
        Err(_) => {
            warn!("invalid or expired session token");
            return None;
        }
    };
    match repo::find_by_id(&state.db, claims.sub).await {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, user_id = %claims.sub, "session user lookup failed");
            None
        }
    }
}

/// The authenticated actor. Rejects with a redirect to `/login`, so a
/// protected handler never runs without an identity.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        actor_from_parts(parts, state)
            .await
            .map(CurrentUser)
            .ok_or(AppError::LoginRequired)
    }
}

/// Optional identity for routes open to anonymous visitors.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(actor_from_parts(parts, state).await))
    }
}

/// A one-shot notice shown on the next rendered response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flash {
    pub message: String,
    pub category: String,
}

/// Attaches a flash notice to the next response. The JSON payload is
/// base64-encoded: message text contains quotes and spaces, which are not
/// valid in a Set-Cookie value.
pub fn set_flash(jar: CookieJar, message: &str, category: &str) -> CookieJar {
    let flash = Flash {
        message: message.to_string(),
        category: category.to_string(),
    };
    let json = serde_json::to_vec(&flash).unwrap_or_default();
    let value = URL_SAFE_NO_PAD.encode(json);
    jar.add(Cookie::build((FLASH_COOKIE, value)).path("/").http_only(true))
}

/// Consumes the pending flash notice, if any.
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let flash = jar
        .get(FLASH_COOKIE)
        .and_then(|c| URL_SAFE_NO_PAD.decode(c.value()).ok())
        .and_then(|bytes| serde_json::from_slice::<Flash>(&bytes).ok());
    let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
    (jar, flash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> SessionKeys {
        SessionKeys::from_ref(&AppState::fake())
    }

    #[tokio::test]
    async fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[tokio::test]
    async fn verify_rejects_tampered_token() {
        let keys = make_keys();
        let mut token = keys.sign(Uuid::new_v4()).expect("sign");
        token.push('x');
        assert!(keys.verify(&token).is_err());
    }

    #[tokio::test]
    async fn login_sets_and_logout_removes_cookie() {
        let keys = make_keys();
        let jar = login(CookieJar::new(), &keys, Uuid::new_v4()).expect("login");
        assert!(jar.get(SESSION_COOKIE).is_some());
        let jar = logout(jar);
        assert!(jar.get(SESSION_COOKIE).is_none());
    }

    #[test]
    fn flash_cookie_value_is_cookie_safe() {
        let jar = set_flash(CookieJar::new(), "Your answer has been submitted.", "success");
        let value = jar.get(FLASH_COOKIE).expect("flash cookie set").value().to_string();
        assert!(!value.is_empty());
        // RFC 6265 forbids whitespace, double quotes, commas and semicolons.
        assert!(value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn flash_is_one_shot() {
        let jar = set_flash(CookieJar::new(), "Account created.", "success");
        let (jar, flash) = take_flash(jar);
        assert_eq!(
            flash,
            Some(Flash {
                message: "Account created.".into(),
                category: "success".into(),
            })
        );
        assert!(jar.get(FLASH_COOKIE).is_none());
    }
}
