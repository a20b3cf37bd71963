//! Account route handlers: signup, login, password flows, profile and
//! account administration.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use cookie::Cookie;
use serde::Deserialize;
use serde_json::json;

use teeshop_core::{AccountId, Email, Role};

use super::extract::{FormParts, parse_id};
use crate::db::AccountRepository;
use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user};
use crate::middleware::CurrentAccount;
use crate::models::{Account, account::validate_name};
use crate::services::auth::{AuthService, TOKEN_COOKIE};
use crate::services::{MediaFolder, Upload};
use crate::state::AppState;

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminUpdateRequest {
    pub name: String,
    pub email: String,
    pub role: String,
}

// =============================================================================
// Credential cookie
// =============================================================================

fn token_cookie(token: &str, days: i64) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token.to_owned()))
        .http_only(true)
        .path("/")
        .max_age(cookie::time::Duration::days(days))
        .build()
}

fn expired_token_cookie() -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, ""))
        .http_only(true)
        .path("/")
        .max_age(cookie::time::Duration::ZERO)
        .build()
}

/// Issue a credential for `account`, set it as a cookie and return it in the
/// body alongside the account.
fn signed_in(state: &AppState, account: &Account, status: StatusCode) -> Result<Response> {
    let token = state.token_keys().issue(account.id)?;
    let cookie = token_cookie(&token, state.config().auth.cookie_days);

    Ok((
        status,
        [(header::SET_COOKIE, cookie.to_string())],
        Json(json!({ "success": true, "token": token, "user": account })),
    )
        .into_response())
}

async fn upload_avatar(state: &AppState, upload: Upload) -> Result<teeshop_core::ImageRef> {
    Ok(state.media().upload(upload, MediaFolder::Users).await?)
}

// =============================================================================
// Public handlers
// =============================================================================

/// `POST /signup` (multipart: name, email, password, photo).
pub async fn signup(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let mut form = FormParts::read(multipart).await?;
    let photo = form
        .take_file("photo")
        .ok_or_else(|| AppError::BadRequest("uploading a photo is necessary".to_owned()))?;
    let name = validate_name(form.required("name")?).map_err(AppError::BadRequest)?;
    let email = form.required("email")?;
    let password = form.required("password")?;

    // Fail on bad input before anything reaches the image host.
    Email::parse(email).map_err(crate::services::AuthError::from)?;
    crate::services::auth::validate_password(password)?;

    let image = upload_avatar(&state, photo).await?;
    let account = match AuthService::new(state.pool())
        .register(&name, email, password, &image)
        .await
    {
        Ok(account) => account,
        Err(e) => {
            state.media().destroy_all([&image]).await;
            return Err(e.into());
        }
    };

    tracing::info!(account_id = %account.id, "account registered");
    signed_in(&state, &account, StatusCode::CREATED)
}

/// `POST /login`.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest(
            "email and password are required".to_owned(),
        ));
    }
    let account = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;

    add_breadcrumb("auth", "Logged in", Some(&[("account_id", &account.id.to_string())]));
    signed_in(&state, &account, StatusCode::OK)
}

/// `GET /logout`.
pub async fn logout() -> Response {
    clear_sentry_user();
    (
        [(header::SET_COOKIE, expired_token_cookie().to_string())],
        Json(json!({ "success": true, "message": "Logout success" })),
    )
        .into_response()
}

/// `POST /forgotPassword`.
///
/// Responds the same way whether or not the email is registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    let auth = AuthService::new(state.pool());
    let message = format!("If an account uses {}, a reset link was sent to it", body.email.trim());

    let Some((account, token)) = auth.start_password_reset(&body.email).await? else {
        return Ok(Json(json!({ "success": true, "message": message })));
    };

    let url = state.config().password_reset_url(&token.raw);
    if let Err(e) = state
        .email()
        .send_password_reset(account.email.as_str(), &account.name, &url)
        .await
    {
        auth.cancel_password_reset(account.id).await?;
        return Err(e.into());
    }

    Ok(Json(json!({ "success": true, "message": message })))
}

/// `POST /password/reset/{token}`.
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Response> {
    let account = AuthService::new(state.pool())
        .reset_password(&token, &body.password, &body.confirm_password)
        .await?;

    tracing::info!(account_id = %account.id, "password reset");
    signed_in(&state, &account, StatusCode::OK)
}

// =============================================================================
// Signed-in handlers
// =============================================================================

/// `GET /userDashboard`.
pub async fn dashboard(CurrentAccount(account): CurrentAccount) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "user": account }))
}

/// `PATCH /password/update`.
pub async fn change_password(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Response> {
    AuthService::new(state.pool())
        .change_password(account.id, &body.old_password, &body.new_password)
        .await?;

    signed_in(&state, &account, StatusCode::OK)
}

/// `PATCH /userDashboard/update` (multipart: name, email, optional photo).
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    let mut form = FormParts::read(multipart).await?;
    let name = validate_name(form.text("name").unwrap_or(&account.name))
        .map_err(AppError::BadRequest)?;
    let email = match form.text("email") {
        Some(raw) => Email::parse(raw).map_err(crate::services::AuthError::from)?,
        None => account.email.clone(),
    };

    let new_photo = match form.take_file("photo") {
        Some(upload) => Some(upload_avatar(&state, upload).await?),
        None => None,
    };

    let updated = match AccountRepository::new(state.pool())
        .update_profile(account.id, &name, &email, new_photo.as_ref())
        .await
    {
        Ok(updated) => updated,
        Err(e) => {
            state.media().destroy_all(new_photo.as_ref()).await;
            return Err(e.into());
        }
    };

    if new_photo.is_some() {
        state.media().destroy_all([&account.photo]).await;
    }

    Ok(Json(json!({ "success": true, "user": updated })))
}

// =============================================================================
// Administration
// =============================================================================

/// `GET /admin/allUsers`.
pub async fn admin_list(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let users = AccountRepository::new(state.pool()).list_all().await?;
    Ok(Json(json!({ "success": true, "users": users })))
}

/// `GET /manager/allUsers`: customer accounts only.
pub async fn manager_list(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let users = AccountRepository::new(state.pool())
        .list_by_role(&Role::user())
        .await?;
    Ok(Json(json!({ "success": true, "users": users })))
}

/// `GET /admin/user/{id}`.
pub async fn admin_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id: AccountId = parse_id(&id, "account")?;
    let user = AccountRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("account {id}")))?;
    Ok(Json(json!({ "success": true, "user": user })))
}

/// `PUT /admin/user/{id}`: name, email and role.
pub async fn admin_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AdminUpdateRequest>,
) -> Result<Json<serde_json::Value>> {
    let id: AccountId = parse_id(&id, "account")?;
    let name = validate_name(&body.name).map_err(AppError::BadRequest)?;
    let email = Email::parse(&body.email).map_err(crate::services::AuthError::from)?;
    let role = Role::parse(&body.role).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = AccountRepository::new(state.pool())
        .update_by_admin(id, &name, &email, &role)
        .await?;

    tracing::info!(account_id = %id, role = %role, "account updated by administrator");
    Ok(Json(json!({ "success": true, "user": user })))
}

/// `DELETE /admin/user/{id}`: also releases the account photo.
pub async fn admin_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id: AccountId = parse_id(&id, "account")?;
    let removed = AccountRepository::new(state.pool()).delete(id).await?;
    state.media().destroy_all([&removed.photo]).await;

    tracing::info!(account_id = %id, "account deleted");
    Ok(Json(json!({ "success": true, "message": "User deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_cookie_attributes() {
        let cookie = token_cookie("abc", 3).to_string();
        assert!(cookie.starts_with("token=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=259200"));
    }

    #[test]
    fn test_logout_cookie_expires() {
        let cookie = expired_token_cookie().to_string();
        assert!(cookie.starts_with("token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
