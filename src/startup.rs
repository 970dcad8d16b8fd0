use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;

use crate::auth::TokenIssuer;
use crate::logger::LoggerMiddleware;
use crate::middleware::{AccessPolicy, JwtMiddleware};
use crate::routes::{get_current_user, health_check, login, logout, refresh};

/// Access flag for every registered route
pub fn access_policy() -> AccessPolicy {
    AccessPolicy::new()
        .public("/health_check")
        .public("/auth/login")
        .public("/auth/refresh")
        .authenticated("/auth/logout")
        .authenticated("/auth/me")
}

pub fn run(listener: TcpListener, issuer: TokenIssuer) -> Result<Server, std::io::Error> {
    let issuer_data = web::Data::new(issuer.clone());
    let policy = access_policy();

    let server = HttpServer::new(move || {
        App::new()
            // The last wrap runs first, so request logging also sees rejections
            .wrap(JwtMiddleware::new(issuer.clone(), policy.clone()))
            .wrap(LoggerMiddleware)
            .app_data(issuer_data.clone())
            .route("/health_check", web::get().to(health_check))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/logout", web::post().to(logout))
            .route("/auth/me", web::get().to(get_current_user))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
