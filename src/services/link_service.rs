//! Short URL service
//!
//! Business logic for the three operations (create, redirect, stats), shared by
//! the HTTP handlers. Stores, code generator, clock and remote logger are all
//! injected so tests can swap any of them.
//!
//! Every outcome emits one remote log event; logging never changes the result.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::analytics::{AnalyticsStore, ClickEvent, MemoryAnalyticsStore};
use crate::config::LinksConfig;
use crate::errors::{Result, ShortUrlError};
use crate::remote_log::{EventLogger, Level, Package};
use crate::storage::{LinkRecord, LinkStore, MemoryLinkStore, is_expired};
use crate::utils::url_validator::{encode_location, validate_url};
use crate::utils::{Clock, CodeGenerator, RandomCodeGenerator, SystemClock};

// ============ Request/Response DTOs ============

/// Request to create a new link
#[derive(Debug, Clone, Default)]
pub struct CreateLinkRequest {
    /// Target URL, stored exactly as given
    pub original_url: String,
    /// Validity window in minutes, fractions allowed (None = configured default)
    pub validity_minutes: Option<f64>,
    /// Caller-chosen short code (None or empty = generate one)
    pub custom_code: Option<String>,
}

/// Result of link creation
#[derive(Debug, Clone)]
pub struct LinkCreateResult {
    pub link: LinkRecord,
    /// Whether the code was auto-generated
    pub generated_code: bool,
}

/// A resolved redirect whose click is already recorded
#[derive(Debug, Clone)]
pub struct Redirect {
    pub link: LinkRecord,
    /// `original_url` encoded for the `Location` header
    pub location: String,
}

/// Who followed a link
#[derive(Debug, Clone, Default)]
pub struct Visit {
    pub referrer: Option<String>,
    pub client_address: String,
}

/// Link details together with its click history
#[derive(Debug, Clone)]
pub struct LinkStats {
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub total_clicks: usize,
    pub clicks: Vec<ClickEvent>,
}

// ============ ShortUrlService Implementation ============

pub struct ShortUrlService {
    links: Arc<dyn LinkStore>,
    analytics: Arc<dyn AnalyticsStore>,
    generator: Arc<dyn CodeGenerator>,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn EventLogger>,
    config: LinksConfig,
    /// Serializes the collision check with the paired store writes
    creation_lock: Mutex<()>,
}

impl ShortUrlService {
    pub fn new(
        links: Arc<dyn LinkStore>,
        analytics: Arc<dyn AnalyticsStore>,
        generator: Arc<dyn CodeGenerator>,
        clock: Arc<dyn Clock>,
        logger: Arc<dyn EventLogger>,
        config: LinksConfig,
    ) -> Self {
        Self {
            links,
            analytics,
            generator,
            clock,
            logger,
            config,
            creation_lock: Mutex::new(()),
        }
    }

    /// In-memory stores, random codes and the system clock.
    pub fn in_memory(config: LinksConfig, logger: Arc<dyn EventLogger>) -> Self {
        let generator = RandomCodeGenerator::new(config.code_length);
        Self::new(
            Arc::new(MemoryLinkStore::new()),
            Arc::new(MemoryAnalyticsStore::new()),
            Arc::new(generator),
            Arc::new(SystemClock),
            logger,
            config,
        )
    }

    pub fn config(&self) -> &LinksConfig {
        &self.config
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Create a link and its empty click history.
    pub fn create(&self, req: CreateLinkRequest) -> Result<LinkCreateResult> {
        if let Err(e) = validate_url(&req.original_url) {
            debug!("Rejected target URL {:?}: {}", req.original_url, e);
            self.logger
                .backend(Level::Error, Package::Handler, "Invalid URL provided");
            return Err(ShortUrlError::invalid_url(e.to_string()));
        }

        let validity = req
            .validity_minutes
            .unwrap_or(f64::from(self.config.default_validity_minutes));
        if !validity.is_finite() {
            return Err(self.reject_malformed(&format!("validity {} is not a number", validity)));
        }
        let custom_code = req.custom_code.filter(|c| !c.is_empty());

        let _guard = self.creation_lock.lock();

        let (code, generated_code) = match custom_code {
            Some(code) => {
                if self.links.contains(&code) {
                    return Err(self.collision(&code));
                }
                (code, false)
            }
            None => (self.generate_unique_code()?, true),
        };

        let link = LinkRecord::new(&code, req.original_url, self.clock.now(), validity);

        // 先建分析记录再发布链接，读者永远看不到缺少分析记录的链接
        if let Err(e) = self.analytics.init_for(&code) {
            return Err(self.creation_failed(&code, e));
        }
        if let Err(e) = self.links.put(&code, link.clone()) {
            self.analytics.discard(&code);
            return Err(match e {
                ShortUrlError::Collision(_) => self.collision(&code),
                other => self.creation_failed(&code, other),
            });
        }

        self.logger.backend(
            Level::Info,
            Package::Service,
            &format!("Created short URL: {}", code),
        );

        Ok(LinkCreateResult {
            link,
            generated_code,
        })
    }

    /// Resolve `code` for a redirect and record the click.
    ///
    /// The `Location` value is computed before the click is stored, and the
    /// click is stored before this returns: `Ok` always means a recorded click
    /// and a sendable redirect.
    pub fn resolve_redirect(&self, code: &str, visit: Visit) -> Result<Redirect> {
        let link = match self.links.get(code) {
            Ok(link) => link,
            Err(ShortUrlError::NotFound(msg)) => {
                self.logger
                    .backend(Level::Warn, Package::Handler, "Shortcode not found");
                return Err(ShortUrlError::NotFound(msg));
            }
            Err(e) => {
                self.logger.backend(
                    Level::Error,
                    Package::Handler,
                    &format!("Redirect error: {}", e),
                );
                return Err(ShortUrlError::internal(e.to_string()));
            }
        };

        let now = self.clock.now();
        if is_expired(&link, now) {
            self.logger
                .backend(Level::Warn, Package::Handler, "Expired shortcode");
            return Err(ShortUrlError::expired(format!(
                "short code '{}' expired at {}",
                code, link.expires_at
            )));
        }

        let location = encode_location(&link.original_url);

        // 时间戳在存储的条目锁内读取，并发点击的时间顺序与序列顺序一致
        let recorded = self.analytics.record_click(code, &|| {
            ClickEvent::new(
                self.clock.now(),
                visit.referrer.clone(),
                visit.client_address.clone(),
            )
        });
        if !recorded {
            // 配对不变量被破坏；仍然跳转，但记录下来
            error!("Link {} has no analytics record, click lost", code);
            self.logger.backend(
                Level::Error,
                Package::Handler,
                &format!("Redirect error: click for {} not recorded", code),
            );
        }

        self.logger.backend(
            Level::Info,
            Package::Service,
            &format!("Redirecting: {}", code),
        );
        Ok(Redirect { link, location })
    }

    /// Link details and click history. Works for expired links too.
    pub fn stats(&self, code: &str) -> Result<LinkStats> {
        let link = self.links.get(code);
        let analytics = self.analytics.get_stats(code);

        match (link, analytics) {
            (Ok(link), Ok(analytics)) => {
                self.logger
                    .backend(Level::Info, Package::Service, "Retrieved stats");
                Ok(LinkStats {
                    original_url: link.original_url,
                    created_at: link.created_at,
                    expires_at: link.expires_at,
                    total_clicks: analytics.total_clicks(),
                    clicks: analytics.clicks,
                })
            }
            (Err(ShortUrlError::NotFound(_)), _) | (_, Err(ShortUrlError::NotFound(_))) => {
                self.logger
                    .backend(Level::Warn, Package::Handler, "Stats not found");
                Err(ShortUrlError::not_found(format!(
                    "no stats for short code '{}'",
                    code
                )))
            }
            (Err(e), _) | (_, Err(e)) => {
                self.logger.backend(
                    Level::Error,
                    Package::Handler,
                    &format!("Stats error: {}", e),
                );
                Err(ShortUrlError::internal(e.to_string()))
            }
        }
    }

    /// Report a request body that could not be decoded.
    pub fn reject_malformed(&self, detail: &str) -> ShortUrlError {
        debug!("Malformed request body: {}", detail);
        self.logger
            .backend(Level::Warn, Package::Handler, "Invalid request body");
        ShortUrlError::invalid_request(detail)
    }

    /// Draw generated codes until one is free; caller holds the creation lock.
    fn generate_unique_code(&self) -> Result<String> {
        let attempts = self.config.max_generate_attempts.max(1);
        let mut last = String::new();
        for attempt in 1..=attempts {
            let candidate = self.generator.generate();
            if !self.links.contains(&candidate) {
                return Ok(candidate);
            }
            debug!(
                "Generated code {} already taken (attempt {}/{})",
                candidate, attempt, attempts
            );
            last = candidate;
        }
        Err(self.collision(&last))
    }

    fn collision(&self, code: &str) -> ShortUrlError {
        self.logger
            .backend(Level::Error, Package::Handler, "Shortcode collision");
        ShortUrlError::collision(format!("short code '{}' already exists", code))
    }

    fn creation_failed(&self, code: &str, e: ShortUrlError) -> ShortUrlError {
        error!("Failed to create short URL {}: {}", code, e);
        self.logger.backend(
            Level::Fatal,
            Package::Handler,
            &format!("Creation error: {}", e),
        );
        ShortUrlError::internal(e.to_string())
    }
}
