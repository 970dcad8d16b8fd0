/// JWT Token Codec
///
/// Signs and verifies token claims. Access and refresh tokens use separate
/// HS256 secrets, and the class is also embedded in the signed payload so a
/// token of one class is refused where the other is expected.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{TokenClaims, TokenClass};
use crate::configuration::JwtSettings;
use crate::error::TokenError;
use crate::users::UserRecord;

#[derive(Clone)]
struct ClassKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: i64,
}

impl ClassKeys {
    fn new(secret: &str, lifetime: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }
}

/// A signed token together with the claims it carries
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub claims: TokenClaims,
}

#[derive(Clone)]
pub struct TokenCodec {
    access: ClassKeys,
    refresh: ClassKeys,
    issuer: String,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(config: &JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;

        Self {
            access: ClassKeys::new(&config.access_secret, config.access_token_expiry),
            refresh: ClassKeys::new(&config.refresh_secret, config.refresh_token_expiry),
            issuer: config.issuer.clone(),
            validation,
        }
    }

    fn keys(&self, class: TokenClass) -> &ClassKeys {
        match class {
            TokenClass::Access => &self.access,
            TokenClass::Refresh => &self.refresh,
        }
    }

    /// Configured lifetime of a token class, in seconds
    pub fn lifetime(&self, class: TokenClass) -> i64 {
        self.keys(class).lifetime
    }

    /// Sign a new token of `class` for `user`, with a fresh jti and an
    /// expiry of now plus the class lifetime.
    ///
    /// # Errors
    /// Returns `TokenError::Signing` if encoding fails
    pub fn sign(&self, user: &UserRecord, class: TokenClass) -> Result<SignedToken, TokenError> {
        let claims = TokenClaims::new(user, class, self.lifetime(class), &self.issuer);
        let token = self.encode_claims(&claims)?;
        Ok(SignedToken { token, claims })
    }

    fn encode_claims(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.keys(claims.token_type).encoding,
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Validate a token that is expected to be of class `expected`.
    ///
    /// # Errors
    /// Returns `TokenError::InvalidToken` on a bad signature, malformed
    /// payload, wrong issuer, expiry, or class mismatch
    pub fn verify(&self, token: &str, expected: TokenClass) -> Result<TokenClaims, TokenError> {
        let claims = decode::<TokenClaims>(token, &self.keys(expected).decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(expected = %expected, error = %e, "JWT validation error");
                TokenError::InvalidToken
            })?;

        if claims.token_type != expected {
            tracing::warn!(
                expected = %expected,
                actual = %claims.token_type,
                jti = %claims.jti,
                "Token presented with the wrong class"
            );
            return Err(TokenError::InvalidToken);
        }

        // The library accepts exp == now; we do not
        if claims.is_expired() {
            return Err(TokenError::InvalidToken);
        }

        Ok(claims)
    }
}
