/// Error Handling Module
///
/// Unified error handling for the token core and its HTTP surface.
/// It covers:
/// 1. Domain-specific error types (token codec, stores, validation, settings)
/// 2. The unified `AppError` used for control flow
/// 3. HTTP response mapping with structured logging
/// 4. Error context enrichment for route handlers
///
/// Every authentication failure collapses into `AppError::Unauthorized`.
/// The precise cause is logged where it is detected and never reaches the
/// response body.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for request payloads
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is empty")]
    EmptyField(String),
    #[error("{0} is too short (minimum {1} characters)")]
    TooShort(String, usize),
    #[error("{0} is too long (maximum {1} characters)")]
    TooLong(String, usize),
    #[error("{0} has invalid format")]
    InvalidFormat(String),
    #[error("{0} contains suspicious content")]
    SuspiciousContent(String),
}

/// Token codec failures.
///
/// `InvalidToken` deliberately carries no detail: signature mismatch,
/// malformed payload, expiry and class mismatch all look the same.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token")]
    InvalidToken,
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Failures of the external stores (user persistence, blacklist)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{store} store unavailable: {message}")]
    Unavailable { store: &'static str, message: String },
    #[error("{0} already exists")]
    Conflict(String),
}

impl StoreError {
    pub fn unavailable(store: &'static str, message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            store,
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let error_msg = err.to_string();

        if error_msg.contains("duplicate key") || error_msg.contains("unique constraint") {
            StoreError::Conflict("user".to_string())
        } else {
            StoreError::unavailable("user", error_msg)
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::unavailable("blacklist", err.to_string())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Missing required config: {0}")]
    MissingRequired(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
    #[error("Config load error: {0}")]
    Load(#[from] config::ConfigError),
}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that all application errors map to
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad credentials, invalid/expired/revoked/wrong-class token, or a user
    /// that vanished between issuance and refresh.
    #[error("Invalid credentials")]
    Unauthorized,
    /// Persistence or blacklist backend unreachable. Retryable.
    #[error(transparent)]
    StoreUnavailable(StoreError),
    /// A new pair was minted but the consumed refresh token could not be
    /// revoked. The pair is withheld; the caller may retry.
    #[error("token rotation incomplete: {0}")]
    RotationIncomplete(StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True for failures a client may retry unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::StoreUnavailable(StoreError::Unavailable { .. })
                | AppError::RotationIncomplete(_)
        )
    }
}

// ============================================================================
// FROM IMPLEMENTATIONS (Control Flow Error Conversion)
// ============================================================================

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::StoreUnavailable(err)
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken => AppError::Unauthorized,
            TokenError::Signing(msg) => AppError::Internal(msg),
        }
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking (request ID or trace ID)
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Invalid credentials".to_string(),
            ),
            AppError::StoreUnavailable(StoreError::Conflict(_)) => (
                StatusCode::CONFLICT,
                "DUPLICATE_ENTRY",
                self.to_string(),
            ),
            AppError::StoreUnavailable(_) | AppError::RotationIncomplete(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Service temporarily unavailable, please retry".to_string(),
            ),
            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                e.to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        };

        let error_response = ErrorResponse::new(
            request_id.to_string(),
            message,
            code.to_string(),
            status.as_u16(),
        );

        (status, error_response)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Unauthorized => {
                tracing::warn!(request_id = request_id, "Request rejected as unauthorized");
            }
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::StoreUnavailable(e @ StoreError::Conflict(_)) => {
                tracing::warn!(request_id = request_id, error = %e, "Duplicate entry");
            }
            AppError::StoreUnavailable(e) => {
                tracing::error!(request_id = request_id, error = %e, "Store error");
            }
            AppError::RotationIncomplete(e) => {
                tracing::error!(
                    request_id = request_id,
                    error = %e,
                    "Refresh token rotation left incomplete"
                );
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::StoreUnavailable(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            AppError::StoreUnavailable(_) | AppError::RotationIncomplete(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-request context carried by route handlers for correlated logging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn log_error(&self, error: &AppError) {
        let context = serde_json::json!({
            "request_id": self.request_id,
            "operation": self.operation,
            "user_id": self.user_id,
            "timestamp": self.timestamp.to_rfc3339(),
        });

        if error.is_retryable() || matches!(error, AppError::Internal(_)) {
            tracing::error!(error = %error, context = ?context, "Operation failed");
        } else {
            tracing::warn!(error = %error, context = ?context, "Operation rejected");
        }
    }
}
