//! Authentication handlers

use axum::{extract::State, http::StatusCode, Json};
use shared::{ApiResponse, LoginInput, RefreshTokenInput};

use super::ok;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::{ClientMeta, RequestContext};
use crate::services::auth::{AuthTokens, LoginResponse, UserProfile};
use crate::services::{Actor, AuthService};
use crate::AppState;

/// Login with username or email
pub async fn login(
    State(state): State<AppState>,
    client: ClientMeta,
    AppJson(input): AppJson<LoginInput>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let actor = Actor {
        user_id: None,
        ip_address: client.ip_address,
        user_agent: client.user_agent,
    };

    let service = AuthService::new(state.db, &state.config);
    let response = service.login(input, &actor).await?;
    Ok(ok("Login successful", response))
}

/// Exchange a refresh token for a new token pair
pub async fn refresh_token(
    State(state): State<AppState>,
    AppJson(input): AppJson<RefreshTokenInput>,
) -> AppResult<Json<ApiResponse<AuthTokens>>> {
    let service = AuthService::new(state.db, &state.config);
    let tokens = service.refresh(input).await?;
    Ok(ok("Token refreshed", tokens))
}

pub async fn logout(
    State(state): State<AppState>,
    ctx: RequestContext,
    AppJson(input): AppJson<RefreshTokenInput>,
) -> AppResult<StatusCode> {
    let service = AuthService::new(state.db, &state.config);
    service.logout(&ctx.actor(), ctx.user.user_id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Profile of the authenticated user
pub async fn me(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let service = AuthService::new(state.db, &state.config);
    Ok(ok("Profile retrieved", service.me(ctx.user.user_id).await?))
}
