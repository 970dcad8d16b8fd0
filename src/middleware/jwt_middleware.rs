/// JWT Authentication Middleware
///
/// Consults the route's access flag; for authenticated routes validates the
/// Bearer access token (signature, class, expiry, blacklist) and injects the
/// claims into request extensions for route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::TokenIssuer;
use crate::error::AppError;
use crate::middleware::access::{AccessPolicy, RouteAccess};

pub struct JwtMiddleware {
    issuer: TokenIssuer,
    policy: AccessPolicy,
}

impl JwtMiddleware {
    pub fn new(issuer: TokenIssuer, policy: AccessPolicy) -> Self {
        Self { issuer, policy }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            issuer: self.issuer.clone(),
            policy: Rc::new(self.policy.clone()),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    issuer: TokenIssuer,
    policy: Rc<AccessPolicy>,
}

/// Token from an `Authorization: Bearer <token>` header
fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        if self.policy.access_for(req.path()) == RouteAccess::Public {
            return Box::pin(async move { service.call(req).await });
        }

        let issuer = self.issuer.clone();
        let token = bearer_token(&req);

        Box::pin(async move {
            let token = match token {
                Some(token) => token,
                None => {
                    tracing::warn!(path = %req.path(), "Missing or invalid Authorization header");
                    return Err(AppError::Unauthorized.into());
                }
            };

            let claims = issuer.authenticate(&token).await?;
            tracing::debug!(user_id = %claims.sub, jti = %claims.jti, "JWT validated successfully");
            req.extensions_mut().insert(claims);

            service.call(req).await
        })
    }
}
