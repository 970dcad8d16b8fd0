/// Middleware module
///
/// Request authentication and per-route access flags.

mod access;
mod jwt_middleware;

pub use access::{AccessPolicy, RouteAccess};
pub use jwt_middleware::JwtMiddleware;
