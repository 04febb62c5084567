pub mod redirect;
pub mod shorturls;

pub use redirect::RedirectService;
pub use shorturls::{CreateShortUrlBody, CreateShortUrlResponse, ShortUrlApi, StatsResponse};

use actix_web::{HttpRequest, error, web};

use crate::config::StaticConfig;
use crate::errors::ShortUrlError;
use crate::services::ShortUrlService;

/// Maximum accepted JSON body size
pub const JSON_BODY_LIMIT: usize = 16 * 1024;

/// Per-request settings the handlers read from app data
#[derive(Debug, Clone, Default)]
pub struct ApiSettings {
    pub trusted_proxies: Vec<String>,
    pub base_url: Option<String>,
}

impl ApiSettings {
    pub fn from_config(config: &StaticConfig) -> Self {
        Self {
            trusted_proxies: config.server.trusted_proxies.clone(),
            base_url: config.links.base_url.clone(),
        }
    }
}

/// Malformed JSON bodies become `400 {"error": "Invalid request body"}`.
fn json_error_handler(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    let detail = err.to_string();
    match req.app_data::<web::Data<ShortUrlService>>() {
        Some(service) => service.reject_malformed(&detail).into(),
        None => ShortUrlError::invalid_request(detail).into(),
    }
}

/// Register the three routes. `/shorturls/{code}` goes first so it is never
/// mistaken for a short code.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_BODY_LIMIT)
            .error_handler(json_error_handler),
    )
    .route("/shorturls", web::post().to(ShortUrlApi::create))
    .route("/shorturls/{code}", web::get().to(ShortUrlApi::stats))
    .route("/{code}", web::get().to(RedirectService::handle_redirect))
    .route("/{code}", web::head().to(RedirectService::handle_redirect));
}
