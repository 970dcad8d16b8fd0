/// Authentication Routes
///
/// Sign-in, token refresh, sign-out and current-user endpoints. Payloads
/// are validated here; everything past validation is the token issuer's.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{TokenClaims, TokenClass, TokenIssuer, TokenPair};
use crate::error::{AppError, ErrorContext};
use crate::users::Role;
use crate::validators::{is_present_password, is_valid_email, is_well_formed_token};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize, Default)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Authentication response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthResponse {
    fn bearer(pair: TokenPair, issuer: &TokenIssuer) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: issuer.codec().lifetime(TokenClass::Access),
        }
    }
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

/// POST /auth/login
///
/// # Errors
/// - 400: Malformed email or missing password
/// - 401: Unknown email or wrong password (indistinguishable)
/// - 503: User store unavailable
pub async fn login(
    form: web::Json<LoginRequest>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let email = is_valid_email(&form.email)?;
    is_present_password(&form.password)?;

    let pair = issuer.sign_in(&email, &form.password).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    tracing::info!(request_id = %context.request_id, "Login succeeded");
    Ok(HttpResponse::Ok().json(AuthResponse::bearer(pair, &issuer)))
}

/// POST /auth/refresh
///
/// Exchanges a refresh token for a new pair. The presented token is rotated
/// out and cannot be redeemed again.
///
/// # Errors
/// - 401: Malformed, invalid, expired, revoked or already-rotated refresh token
/// - 503: Store unavailable, or rotation could not be recorded (retry)
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    // Shape failures are codec failures and answer like any other bad token
    is_well_formed_token(&form.refresh_token).map_err(|e| {
        tracing::warn!(request_id = %context.request_id, error = %e, "Refresh rejected: malformed token");
        AppError::Unauthorized
    })?;

    let pair = issuer.refresh(form.refresh_token.trim()).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    Ok(HttpResponse::Ok().json(AuthResponse::bearer(pair, &issuer)))
}

/// POST /auth/logout
///
/// Revokes the presented access token and, when supplied in the body, the
/// matching refresh token. **Requires a valid access token.**
pub async fn logout(
    claims: web::ReqData<TokenClaims>,
    body: Option<web::Json<LogoutRequest>>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, AppError> {
    let claims = claims.into_inner();
    let context = ErrorContext::new("user_logout").with_user_id(claims.sub.to_string());
    let body = body.map(|b| b.into_inner()).unwrap_or_default();

    issuer
        .sign_out(&claims, body.refresh_token.as_deref())
        .await
        .map_err(|e| {
            context.log_error(&e);
            e
        })?;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /auth/me
///
/// Identity of the caller as carried by their access token.
/// **Requires a valid access token.**
pub async fn get_current_user(claims: web::ReqData<TokenClaims>) -> HttpResponse {
    let claims = claims.into_inner();

    HttpResponse::Ok().json(UserResponse {
        id: claims.sub.to_string(),
        email: claims.email,
        full_name: claims.full_name,
        role: claims.role,
    })
}
