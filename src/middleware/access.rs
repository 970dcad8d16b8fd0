/// Per-route access flags
///
/// Every route the server registers is declared here as `Public` or
/// `Authenticated`. Paths that were never declared are treated as
/// `Authenticated`.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    Authenticated,
}

#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    routes: HashMap<String, RouteAccess>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn public(self, path: &str) -> Self {
        self.route(path, RouteAccess::Public)
    }

    pub fn authenticated(self, path: &str) -> Self {
        self.route(path, RouteAccess::Authenticated)
    }

    pub fn route(mut self, path: &str, access: RouteAccess) -> Self {
        self.routes.insert(normalise(path).to_string(), access);
        self
    }

    pub fn access_for(&self, path: &str) -> RouteAccess {
        self.routes
            .get(normalise(path))
            .copied()
            .unwrap_or(RouteAccess::Authenticated)
    }
}

fn normalise(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}
