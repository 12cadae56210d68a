use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Raw bearer token from `x-auth-token`, falling back to `Authorization: Bearer`.
/// Absence is not a rejection; the verify operation decides what that means.
pub struct AuthToken(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for AuthToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let parts: &Parts = parts;
        let token = header_value(parts, AUTH_TOKEN_HEADER).or_else(|| {
            header_value(parts, AUTHORIZATION.as_str()).and_then(|auth| {
                auth.strip_prefix("Bearer ")
                    .or_else(|| auth.strip_prefix("bearer "))
            })
        });

        Ok(AuthToken(token.map(|t| t.trim().to_owned())))
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
