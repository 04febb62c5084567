//! `/shorturls` endpoints: create a link, read its stats

use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ApiSettings;
use crate::analytics::ClickEvent;
use crate::errors::ShortUrlError;
use crate::services::{CreateLinkRequest, LinkStats, ShortUrlService};
use crate::utils::time::{iso_millis, to_iso_millis};

/// `POST /shorturls` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateShortUrlBody {
    /// Missing `url` is reported as an invalid URL, not as a malformed body
    #[serde(default)]
    pub url: Option<String>,
    /// Minutes, any JSON number; `null` or absent means the configured default
    #[serde(default)]
    pub validity: Option<f64>,
    #[serde(default)]
    pub shortcode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShortUrlResponse {
    pub short_link: String,
    pub expiry: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub original_url: String,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso_millis")]
    pub expires_at: DateTime<Utc>,
    pub total_clicks: usize,
    pub clicks: Vec<ClickEvent>,
}

impl From<LinkStats> for StatsResponse {
    fn from(stats: LinkStats) -> Self {
        Self {
            original_url: stats.original_url,
            created_at: stats.created_at,
            expires_at: stats.expires_at,
            total_clicks: stats.total_clicks,
            clicks: stats.clicks,
        }
    }
}

pub struct ShortUrlApi {}

impl ShortUrlApi {
    pub async fn create(
        req: HttpRequest,
        body: web::Json<CreateShortUrlBody>,
        service: web::Data<ShortUrlService>,
        settings: web::Data<ApiSettings>,
    ) -> Result<HttpResponse, ShortUrlError> {
        let body = body.into_inner();

        let result = service.create(CreateLinkRequest {
            original_url: body.url.unwrap_or_default(),
            validity_minutes: body.validity,
            custom_code: body.shortcode,
        })?;

        let short_link = Self::short_link(&req, &settings, &result.link.short_code);
        info!(
            "Created {} -> {} (generated: {})",
            result.link.short_code, result.link.original_url, result.generated_code
        );

        Ok(HttpResponse::Created().json(CreateShortUrlResponse {
            short_link,
            expiry: to_iso_millis(&result.link.expires_at),
        }))
    }

    pub async fn stats(
        path: web::Path<String>,
        service: web::Data<ShortUrlService>,
    ) -> Result<HttpResponse, ShortUrlError> {
        let code = path.into_inner();
        let stats = service.stats(&code)?;
        Ok(HttpResponse::Ok().json(StatsResponse::from(stats)))
    }

    /// `{base_url}/{code}` when configured, else scheme and host of the request.
    fn short_link(req: &HttpRequest, settings: &ApiSettings, code: &str) -> String {
        match settings.base_url.as_deref() {
            Some(base) if !base.is_empty() => {
                format!("{}/{}", base.trim_end_matches('/'), code)
            }
            _ => {
                let conn = req.connection_info();
                format!("{}://{}/{}", conn.scheme(), conn.host(), code)
            }
        }
    }
}
