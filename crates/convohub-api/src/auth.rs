use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Extension, Json, extract::State};
use axum_extra::extract::WithRejection;
use rand_core::OsRng;
use tracing::{debug, info, warn};

use convohub_types::api::{
    Empty, LoginRequest, RefreshRequest, RefreshResponse, SignupRequest, TokenPairResponse,
    TokenType,
};
use convohub_types::models::CurrentUser;

use crate::error::{ApiError, ApiResult};
use crate::reply::Reply;
use crate::state::AppState;
use crate::validate::is_institutional_email;

pub async fn signup(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SignupRequest>, ApiError>,
) -> ApiResult<Reply<TokenPairResponse>> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();
    let password = req.password.trim().to_string();

    let tokens = state.tokens.clone();
    let pair = state
        .db_call(move |db| {
            if username.is_empty() {
                return Err(ApiError::validation("Username is required"));
            }
            if db.get_user_by_username(&username)?.is_some() {
                return Err(ApiError::Conflict("Username already exists!".into()));
            }
            if email.is_empty() {
                return Err(ApiError::validation("Email is required"));
            }
            if db.email_exists(&email)? {
                return Err(ApiError::Conflict("Email already exists!".into()));
            }
            if !is_institutional_email(&email) {
                return Err(ApiError::validation(
                    "Only NUCES email can be used to create an account",
                ));
            }
            if password.is_empty() {
                return Err(ApiError::validation("Password is required"));
            }

            // Hash password with Argon2id
            let salt = SaltString::generate(&mut OsRng);
            let password_hash = Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
                .to_string();

            // A concurrent signup can still win the race past the checks above.
            let user_id = db
                .create_user(&username, &email, &password_hash)
                .map_err(|e| ApiError::conflict_on_unique(e, "Username or email already exists!"))?;

            Ok(tokens.issue_pair(db, user_id, &username)?)
        })
        .await?;

    info!("Registered user {}", pair.username);
    Ok(Reply::created("Successfully Registered!", pair))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<Reply<TokenPairResponse>> {
    let username = req.username.trim().to_string();
    let password = req.password;
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::validation("Username and password are required"));
    }

    let tokens = state.tokens.clone();
    let pair = state
        .db_call(move |db| {
            let user = db
                .get_user_by_username(&username)?
                .ok_or_else(|| ApiError::Unauthorized("Not Registered".into()))?;

            let parsed_hash = PasswordHash::new(&user.password)
                .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unreadable: {}", e)))?;
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .map_err(|_| ApiError::Unauthorized("Incorrect password".into()))?;

            Ok(tokens.issue_pair(db, user.id, &user.username)?)
        })
        .await?;

    Ok(Reply::ok("Success", pair))
}

/// Revoke every refresh token issued to the caller.
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Reply<Empty>> {
    let user_id = user.id;
    state
        .db_call(move |db| {
            let outstanding = db.outstanding_tokens_for_user(user_id)?;
            if outstanding.is_empty() {
                return Err(ApiError::validation("No refresh tokens found for the user."));
            }

            for token in outstanding.iter().filter(|t| !t.blacklisted) {
                if let Err(e) = db.blacklist_token(&token.jti) {
                    warn!("Failed to blacklist token {}: {}", token.jti, e);
                }
            }
            Ok(())
        })
        .await?;

    info!("User {} logged out", user.username);
    Ok(Reply::ok("Successfully logged out.", Empty {}))
}

/// Exchange a live refresh token for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RefreshRequest>, ApiError>,
) -> ApiResult<Reply<RefreshResponse>> {
    let claims = state
        .tokens
        .decode(req.refresh_token.trim(), TokenType::Refresh)
        .map_err(|e| {
            debug!("Rejected refresh token: {}", e);
            ApiError::Unauthorized("Token is invalid or expired".into())
        })?;

    let jti = claims.jti.to_string();
    let user_id = claims.sub;
    let user = state
        .db_call(move |db| {
            if db.is_token_blacklisted(&jti)? {
                return Err(ApiError::Unauthorized("Token is blacklisted".into()));
            }
            db.get_user_by_id(user_id)?
                .ok_or_else(|| ApiError::Unauthorized("User not found".into()))
        })
        .await?;

    let (access_token, _) = state.tokens.encode(user.id, &user.username, TokenType::Access)?;
    Ok(Reply::ok("Token refreshed", RefreshResponse { access_token }))
}
