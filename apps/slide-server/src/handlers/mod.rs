//! HTTP handlers and route configuration.

mod health;
mod hit;

use actix_web::middleware::Condition;
use actix_web::web;

use crate::middleware::rate_limit::RateLimitMiddleware;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig, rate_limit: Condition<RateLimitMiddleware>) {
    cfg.service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Limited routes
            .service(
                web::scope("/buckets")
                    .wrap(rate_limit)
                    .route("/{bucket}/keys/{key}/hit", web::post().to(hit::hit)),
            ),
    );
}
