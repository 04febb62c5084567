use actix_web::http::header::{self, HeaderValue};
use actix_web::{HttpRequest, HttpResponse, web};
use tracing::trace;

use super::ApiSettings;
use crate::errors::ShortUrlError;
use crate::services::{ShortUrlService, Visit};
use crate::utils::ip::extract_client_address;

pub struct RedirectService {}

impl RedirectService {
    pub async fn handle_redirect(
        req: HttpRequest,
        path: web::Path<String>,
        service: web::Data<ShortUrlService>,
        settings: web::Data<ApiSettings>,
    ) -> Result<HttpResponse, ShortUrlError> {
        let code = path.into_inner();

        let visit = Visit {
            referrer: Self::referrer(&req),
            client_address: extract_client_address(&req, &settings.trusted_proxies),
        };
        trace!("Redirect request for {} from {}", code, visit.client_address);

        // 点击已在 resolve_redirect 内写入；location 已编码为合法的 header 值
        let redirect = service.resolve_redirect(&code, visit)?;
        let location = HeaderValue::from_str(&redirect.location).map_err(|e| {
            ShortUrlError::internal(format!("unencodable location for {}: {}", code, e))
        })?;

        Ok(HttpResponse::Found()
            .insert_header((header::LOCATION, location))
            .finish())
    }

    #[inline]
    fn referrer(req: &HttpRequest) -> Option<String> {
        req.headers()
            .get(header::REFERER)
            .and_then(|h| h.to_str().ok())
            .map(String::from)
    }
}
