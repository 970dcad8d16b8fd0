/// Token Issuer
///
/// Produces, rotates and revokes token pairs. Per refresh token the only
/// states are ISSUED, ROTATED-OUT (blacklisted) and EXPIRED.
///
/// Every rejection is `AppError::Unauthorized`; the reason is logged here
/// and nowhere else. Store failures propagate as retryable errors and are
/// never read as "not revoked".

use serde::Serialize;
use std::sync::Arc;

use crate::auth::blacklist::TokenBlacklist;
use crate::auth::claims::{TokenClaims, TokenClass};
use crate::auth::jwt::TokenCodec;
use crate::auth::password::{verify_against_dummy, verify_password};
use crate::error::AppError;
use crate::users::{UserRecord, UserStore};

/// Access and refresh token issued together
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct TokenIssuer {
    users: Arc<dyn UserStore>,
    blacklist: Arc<dyn TokenBlacklist>,
    codec: TokenCodec,
}

impl TokenIssuer {
    pub fn new(
        users: Arc<dyn UserStore>,
        blacklist: Arc<dyn TokenBlacklist>,
        codec: TokenCodec,
    ) -> Self {
        Self {
            users,
            blacklist,
            codec,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Exchange email and password for a new pair.
    ///
    /// Unknown email and wrong password fail identically, and cost the same
    /// bcrypt work.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        let user = self.users.find_by_email(email).await?;
        let password = password.to_string();

        let user = match user {
            Some(user) => {
                let hash = user.password_hash.clone();
                let valid = run_blocking(move || verify_password(&password, &hash)).await?;
                if !valid {
                    tracing::warn!(user_id = %user.id, "Sign-in rejected: wrong password");
                    return Err(AppError::Unauthorized);
                }
                user
            }
            None => {
                run_blocking(move || verify_against_dummy(&password)).await?;
                tracing::warn!("Sign-in rejected: unknown email");
                return Err(AppError::Unauthorized);
            }
        };

        let pair = self.issue_pair(&user)?;
        tracing::info!(user_id = %user.id, "User signed in");
        Ok(pair)
    }

    /// Redeem a refresh token for a new pair. A refresh token can be
    /// redeemed at most once.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let claims = self
            .codec
            .verify(refresh_token, TokenClass::Refresh)
            .map_err(|_| {
                tracing::warn!("Refresh rejected: invalid refresh token");
                AppError::Unauthorized
            })?;

        if self.blacklist.is_revoked(claims.jti, TokenClass::Refresh).await? {
            tracing::warn!(
                jti = %claims.jti,
                user_id = %claims.sub,
                "Refresh rejected: token already rotated or revoked"
            );
            return Err(AppError::Unauthorized);
        }

        let user = match self.users.find_by_email(&claims.email).await? {
            Some(user) if user.id == claims.sub => user,
            _ => {
                tracing::warn!(user_id = %claims.sub, "Refresh rejected: user no longer exists");
                return Err(AppError::Unauthorized);
            }
        };

        let pair = self.issue_pair(&user)?;

        // The pair is handed out only if this call is the one that rotated
        // the old token out.
        match self
            .blacklist
            .revoke_once(claims.jti, TokenClass::Refresh, claims.remaining_ttl())
            .await
        {
            Ok(true) => {
                tracing::info!(user_id = %user.id, rotated_jti = %claims.jti, "Token pair refreshed");
                Ok(pair)
            }
            Ok(false) => {
                tracing::warn!(
                    jti = %claims.jti,
                    user_id = %claims.sub,
                    "Refresh rejected: token consumed by a concurrent request"
                );
                Err(AppError::Unauthorized)
            }
            Err(e) => {
                tracing::error!(
                    jti = %claims.jti,
                    user_id = %claims.sub,
                    error = %e,
                    "Refresh token could not be rotated out; withholding new pair"
                );
                Err(AppError::RotationIncomplete(e))
            }
        }
    }

    /// Validate an access token for a protected request.
    pub async fn authenticate(&self, access_token: &str) -> Result<TokenClaims, AppError> {
        let claims = self
            .codec
            .verify(access_token, TokenClass::Access)
            .map_err(|_| AppError::Unauthorized)?;

        if self.blacklist.is_revoked(claims.jti, TokenClass::Access).await? {
            tracing::warn!(jti = %claims.jti, user_id = %claims.sub, "Revoked access token presented");
            return Err(AppError::Unauthorized);
        }

        Ok(claims)
    }

    /// Revoke the caller's access token and, when given, their refresh
    /// token. A refresh token that is invalid or belongs to someone else is
    /// ignored.
    pub async fn sign_out(
        &self,
        access: &TokenClaims,
        refresh_token: Option<&str>,
    ) -> Result<(), AppError> {
        self.blacklist
            .revoke(access.jti, TokenClass::Access, access.remaining_ttl())
            .await?;

        if let Some(token) = refresh_token {
            match self.codec.verify(token, TokenClass::Refresh) {
                Ok(refresh) if refresh.sub == access.sub => {
                    self.blacklist
                        .revoke(refresh.jti, TokenClass::Refresh, refresh.remaining_ttl())
                        .await?;
                }
                _ => {
                    tracing::warn!(user_id = %access.sub, "Ignoring unusable refresh token on sign-out");
                }
            }
        }

        tracing::info!(user_id = %access.sub, "User signed out");
        Ok(())
    }

    fn issue_pair(&self, user: &UserRecord) -> Result<TokenPair, AppError> {
        let access = self.codec.sign(user, TokenClass::Access)?;
        let refresh = self.codec.sign(user, TokenClass::Refresh)?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
        })
    }
}

/// bcrypt is CPU-bound; keep it off the async workers.
async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))
}
