use crate::{
    error::{AppError, AppResult},
    models::{Role, User, UserModel},
    utils::jwt::decode_jwt,
};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
    Extension,
};
use sea_orm::{DatabaseConnection, EntityTrait};
use std::convert::Infallible;

/// Identity resolved from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub role: Role,
}

impl AuthUser {
    fn from_user(user: &UserModel) -> Self {
        Self {
            user_id: user.id,
            role: user.role(),
        }
    }
}

/// JWT authentication middleware
///
/// Rejects the request unless the Authorization header carries a valid token
/// for an existing user.
pub async fn auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    let auth_user = resolve_token(&db, &token)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Like [`auth_middleware`], but lets anonymous requests through.
///
/// A missing, malformed or expired token leaves the request anonymous; the
/// handler decides what an anonymous caller may do.
pub async fn optional_auth_middleware(
    Extension(db): Extension<DatabaseConnection>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = extract_bearer_token(&headers) {
        match resolve_token(&db, &token).await? {
            Some(auth_user) => {
                request.extensions_mut().insert(auth_user);
            }
            None => tracing::debug!("ignoring invalid bearer token on optional-auth route"),
        }
    }

    Ok(next.run(request).await)
}

/// `Ok(None)` for tokens that fail verification or name a deleted user.
async fn resolve_token(db: &DatabaseConnection, token: &str) -> AppResult<Option<AuthUser>> {
    let Ok(claims) = decode_jwt(token) else {
        return Ok(None);
    };
    let Ok(user_id) = claims.sub.parse::<i32>() else {
        return Ok(None);
    };

    let user = User::find_by_id(user_id).one(db).await?;
    Ok(user.as_ref().map(AuthUser::from_user))
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Verify the current user has the admin role
pub fn require_admin(auth_user: &AuthUser) -> AppResult<i32> {
    if auth_user.role != Role::Admin {
        return Err(AppError::Forbidden);
    }
    Ok(auth_user.user_id)
}

/// Verify the current user may moderate comments
pub fn require_moderator(auth_user: &AuthUser) -> AppResult<i32> {
    if !auth_user.role.can_moderate() {
        return Err(AppError::Forbidden);
    }
    Ok(auth_user.user_id)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthUser>().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, HeaderValue};

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(
            extract_bearer_token(&headers_with("Bearer abc.def")),
            Some("abc.def".to_string())
        );
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_ignored() {
        assert_eq!(extract_bearer_token(&headers_with("Basic dXNlcg==")), None);
        assert_eq!(extract_bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn role_guards() {
        let user = AuthUser { user_id: 1, role: Role::User };
        let moderator = AuthUser { user_id: 2, role: Role::Moderator };
        let admin = AuthUser { user_id: 3, role: Role::Admin };

        assert!(require_moderator(&user).is_err());
        assert_eq!(require_moderator(&moderator).unwrap(), 2);
        assert!(require_admin(&moderator).is_err());
        assert_eq!(require_admin(&admin).unwrap(), 3);
    }
}
