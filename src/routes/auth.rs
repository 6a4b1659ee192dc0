use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::{error::ApiError, state::AppState};

#[derive(Deserialize)]
struct LoginPayload {
    password: String,
}

#[derive(Deserialize)]
struct TokenPayload {
    token: Option<String>,
}

#[derive(Deserialize)]
struct RevealPayload {
    password: String,
    #[serde(rename = "sessionToken")]
    session_token: Option<String>,
}

#[derive(Deserialize)]
struct SessionPayload {
    #[serde(rename = "sessionToken")]
    session_token: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/auth")
            .service(web::resource("/login").route(web::post().to(login)))
            .service(web::resource("/verify").route(web::post().to(verify)))
            .service(web::resource("/logout").route(web::post().to(logout))),
    )
    .service(web::resource("/api/admin/reveal-data").route(web::post().to(reveal_data)))
    .service(web::resource("/api/admin/hide-data").route(web::post().to(hide_data)))
    .service(web::resource("/api/admin/check-reveal").route(web::post().to(check_reveal)));
}

async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, ApiError> {
    if payload.password != state.config.admin_password {
        return Err(ApiError::AuthenticationFailed("Incorrect password"));
    }
    let token = state.sessions.open_session();
    Ok(HttpResponse::Ok().json(json!({ "success": true, "token": token })))
}

async fn verify(state: web::Data<AppState>, payload: web::Json<TokenPayload>) -> HttpResponse {
    let valid = payload
        .token
        .as_deref()
        .map(|token| state.sessions.is_valid(token))
        .unwrap_or(false);
    if valid {
        HttpResponse::Ok().json(json!({ "valid": true }))
    } else {
        HttpResponse::Unauthorized().json(json!({ "valid": false }))
    }
}

async fn logout(state: web::Data<AppState>, payload: web::Json<TokenPayload>) -> HttpResponse {
    if let Some(token) = payload.token.as_deref() {
        state.sessions.close_session(token);
    }
    HttpResponse::Ok().json(json!({ "success": true }))
}

/// Unmasks PII for 30 minutes. Requires a live admin session first, then the
/// reveal password on top of it.
async fn reveal_data(
    state: web::Data<AppState>,
    payload: web::Json<RevealPayload>,
) -> Result<HttpResponse, ApiError> {
    let token = payload
        .session_token
        .as_deref()
        .filter(|token| state.sessions.is_valid(token))
        .ok_or(ApiError::Unauthorized("Not authenticated"))?;

    if payload.password != state.config.reveal_password {
        return Err(ApiError::AuthenticationFailed("Incorrect password"));
    }

    if !state.sessions.grant_reveal(token) {
        return Err(ApiError::Unauthorized("Not authenticated"));
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Data revealed" })))
}

async fn hide_data(state: web::Data<AppState>, payload: web::Json<SessionPayload>) -> HttpResponse {
    if let Some(token) = payload.session_token.as_deref() {
        state.sessions.revoke_reveal(token);
    }
    HttpResponse::Ok().json(json!({ "success": true, "message": "Data hidden" }))
}

async fn check_reveal(
    state: web::Data<AppState>,
    payload: web::Json<SessionPayload>,
) -> HttpResponse {
    let revealed = payload
        .session_token
        .as_deref()
        .map(|token| state.sessions.should_reveal(token))
        .unwrap_or(false);
    HttpResponse::Ok().json(json!({ "revealed": revealed }))
}
