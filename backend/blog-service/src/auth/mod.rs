/// Authentication extractors for the blog service
///
/// Identity is established upstream by the identity provider, which issues an
/// HS256 session token carrying the user id. This module only validates that
/// token (taken from the `Authorization: Bearer` header or the `session`
/// cookie) and resolves it to a `users` row.
///
/// Gated endpoints extract [`AuthUser`]; an anonymous request is answered
/// with a redirect to the login flow carrying the originally requested path
/// in the `next` parameter. Public views that merely personalize their
/// output extract [`MaybeUser`], which never fails.
pub mod permissions;

use actix_web::dev::Payload;
use actix_web::error::ErrorInternalServerError;
use actix_web::http::{header, StatusCode};
use actix_web::{web, Error, FromRequest, HttpRequest, HttpResponse, ResponseError};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::user_repo;
use crate::models::User;

/// Path of the external login flow gated endpoints redirect to.
pub const LOGIN_PATH: &str = "/auth/login/";

/// Cookie the browser flow stores the session token in.
pub const SESSION_COOKIE: &str = "session";

/// Claims carried by a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Expiry (seconds since epoch)
    pub exp: usize,
}

/// Token validation material shared across requests.
#[derive(Clone)]
pub struct AuthSettings {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthSettings {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Validate a token and extract the user id it names.
    fn decode(&self, token: &str) -> Option<Uuid> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .ok()
            .and_then(|data| Uuid::parse_str(&data.claims.sub).ok())
    }
}

/// Login redirect target preserving the originally requested path.
pub fn login_redirect_target(next: &str) -> String {
    format!("{LOGIN_PATH}?next={next}")
}

/// Error answered with a login redirect rather than an error body.
#[derive(Debug)]
pub struct LoginRequired {
    next: String,
}

impl std::fmt::Display for LoginRequired {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "authentication required for {}", self.next)
    }
}

impl ResponseError for LoginRequired {
    fn status_code(&self) -> StatusCode {
        StatusCode::FOUND
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Found()
            .insert_header((header::LOCATION, login_redirect_target(&self.next)))
            .finish()
    }
}

/// Session token from the request, header first, cookie as fallback.
fn request_token(req: &HttpRequest) -> Option<String> {
    if let Some(value) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    req.cookie(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Resolve the request's principal, if any, against the `users` table.
async fn resolve_user(req: &HttpRequest) -> Result<Option<User>, Error> {
    let settings = req
        .app_data::<web::Data<AuthSettings>>()
        .ok_or_else(|| ErrorInternalServerError("auth settings not configured"))?;
    let pool = req
        .app_data::<web::Data<PgPool>>()
        .ok_or_else(|| ErrorInternalServerError("database pool not configured"))?;

    let Some(token) = request_token(req) else {
        return Ok(None);
    };
    let Some(user_id) = settings.decode(&token) else {
        return Ok(None);
    };

    user_repo::find_by_id(pool.get_ref(), user_id)
        .await
        .map_err(ErrorInternalServerError)
}

/// The authenticated principal. Extraction fails into a login redirect.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            match resolve_user(&req).await? {
                Some(user) => Ok(AuthUser(user)),
                None => Err(LoginRequired {
                    next: req.path().to_string(),
                }
                .into()),
            }
        })
    }
}

/// The viewer, when one can be resolved. Never fails extraction.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl FromRequest for MaybeUser {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            match resolve_user(&req).await {
                Ok(user) => Ok(MaybeUser(user)),
                Err(err) => {
                    tracing::debug!("viewer resolution failed: {err}");
                    Ok(MaybeUser(None))
                }
            }
        })
    }
}
