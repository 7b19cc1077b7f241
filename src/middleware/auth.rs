use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

/// Identity taken from a verified token, available to handlers as an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub is_admin: bool,
}

impl CurrentUser {
    pub fn ensure_admin(&self) -> crate::error::Result<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(crate::error::Error::Forbidden(
                "Administrator role required".to_string(),
            ))
        }
    }
}

fn reject(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "error": code }))).into_response()
}

fn verify(req: &Request, secret: &str) -> Result<CurrentUser, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(reject(StatusCode::UNAUTHORIZED, "bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(reject(StatusCode::UNAUTHORIZED, "unsupported_scheme"));
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| reject(StatusCode::UNAUTHORIZED, "invalid_token"))?;

    let Ok(id) = Uuid::parse_str(&data.claims.sub) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "invalid_subject"));
    };
    let is_admin = data
        .claims
        .role
        .as_deref()
        .is_some_and(|r| r.eq_ignore_ascii_case("admin"));
    Ok(CurrentUser { id, is_admin })
}

pub async fn require_bearer_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match verify(&req, &state.jwt_secret) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(response) => response,
    }
}

pub async fn require_admin(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match verify(&req, &state.jwt_secret) {
        Ok(user) if user.is_admin => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Ok(_) => reject(StatusCode::FORBIDDEN, "forbidden"),
        Err(response) => response,
    }
}

/// Signs an HS256 token for `user_id`. Used by operator tooling and tests.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    role: &str,
    ttl: chrono::Duration,
) -> jsonwebtoken::errors::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now() + ttl).timestamp().max(0) as usize,
        role: Some(role.to_string()),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
