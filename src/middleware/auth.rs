use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::errors::{AppError, Result};
use crate::models::account::Account;
use crate::models::partner::Partner;
use crate::models::user::User;
use crate::state::AppState;

/// The account behind the request's bearer token.
#[derive(Debug, Clone)]
pub struct CurrentAccount(pub Account);

impl CurrentAccount {
    pub fn user(&self) -> Result<&User> {
        self.0.as_user().ok_or(AppError::Unauthorized)
    }

    pub fn partner(&self) -> Result<&Partner> {
        self.0.as_partner().ok_or(AppError::Unauthorized)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = bearer_token(request.headers()).ok_or(AppError::AuthError)?;
    let claims = state.tokens.decode(token)?;

    // the token is only good while its account exists
    let account = state
        .resolver
        .find_by_id(claims.account_type, &claims.account_id()?)
        .await?
        .ok_or(AppError::AuthError)?;

    request.extensions_mut().insert(CurrentAccount(account));
    Ok(next.run(request).await)
}
