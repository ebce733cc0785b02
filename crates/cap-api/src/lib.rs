//! # cap-api
//!
//! The web routing layer for Captionary. Thin by design: request
//! decoding and response envelopes live here, everything else is the
//! pipeline's business.

pub mod handlers;
pub mod middleware;

use actix_web::web;

/// Configures the image API routes.
///
/// # Developer Note
/// We use a scoped configuration to allow the main binary to mount
/// the API under different paths if needed (e.g., /api/v2/).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/images")
            .route("/upload", web::post().to(handlers::upload_image))
            .route("/owner/{owner_id}", web::get().to(handlers::list_owner_images))
            .route("/owner/{owner_id}/stats", web::get().to(handlers::owner_stats))
            .route("/{image_id}", web::get().to(handlers::get_image))
            .route("/{image_id}", web::delete().to(handlers::delete_image)),
    );
}
