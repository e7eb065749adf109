use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    extract::WithRejection,
    headers::{Authorization, authorization::Bearer},
};
use tracing::debug;

use convohub_types::api::TokenType;
use convohub_types::models::CurrentUser;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Extract and validate the access token from the Authorization header.
/// The loaded account is placed in request extensions as [`CurrentUser`].
pub async fn require_auth(
    State(state): State<AppState>,
    WithRejection(TypedHeader(Authorization(bearer)), _): WithRejection<
        TypedHeader<Authorization<Bearer>>,
        ApiError,
    >,
    mut req: Request,
    next: Next,
) -> ApiResult<Response> {
    let user = authenticate(&state, bearer.token()).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Resolve an access token to the account it was issued for.
pub async fn authenticate(state: &AppState, token: &str) -> ApiResult<CurrentUser> {
    let claims = state.tokens.decode(token, TokenType::Access).map_err(|e| {
        debug!("Rejected access token: {}", e);
        ApiError::Unauthorized("Given token not valid for any token type".into())
    })?;

    let user = state
        .db_call(move |db| Ok(db.get_user_by_id(claims.sub)?))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    Ok(CurrentUser {
        id: user.id,
        username: user.username,
        is_superuser: user.is_superuser,
    })
}

pub fn require_superuser(user: &CurrentUser, message: &str) -> ApiResult<()> {
    if user.is_superuser {
        Ok(())
    } else {
        Err(ApiError::Forbidden(message.to_string()))
    }
}
