use std::fmt;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortUrlError {
    InvalidUrl(String),
    InvalidRequest(String),
    Collision(String),
    NotFound(String),
    Expired(String),
    InternalFailure(String),
    Config(String),
}

impl ShortUrlError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ShortUrlError::InvalidUrl(_) => "E001",
            ShortUrlError::InvalidRequest(_) => "E002",
            ShortUrlError::Collision(_) => "E003",
            ShortUrlError::NotFound(_) => "E004",
            ShortUrlError::Expired(_) => "E005",
            ShortUrlError::InternalFailure(_) => "E006",
            ShortUrlError::Config(_) => "E007",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ShortUrlError::InvalidUrl(_) => "Invalid URL",
            ShortUrlError::InvalidRequest(_) => "Invalid Request",
            ShortUrlError::Collision(_) => "Short Code Collision",
            ShortUrlError::NotFound(_) => "Resource Not Found",
            ShortUrlError::Expired(_) => "Link Expired",
            ShortUrlError::InternalFailure(_) => "Internal Failure",
            ShortUrlError::Config(_) => "Configuration Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            ShortUrlError::InvalidUrl(msg) => msg,
            ShortUrlError::InvalidRequest(msg) => msg,
            ShortUrlError::Collision(msg) => msg,
            ShortUrlError::NotFound(msg) => msg,
            ShortUrlError::Expired(msg) => msg,
            ShortUrlError::InternalFailure(msg) => msg,
            ShortUrlError::Config(msg) => msg,
        }
    }

    /// The message returned to HTTP clients in the `{"error": ...}` body.
    ///
    /// Details stay in the server log; clients only see the fixed public text.
    pub fn public_message(&self) -> &'static str {
        match self {
            ShortUrlError::InvalidUrl(_) => "Invalid URL",
            ShortUrlError::InvalidRequest(_) => "Invalid request body",
            ShortUrlError::Collision(_) => "Shortcode exists",
            ShortUrlError::NotFound(_) => "Not found",
            ShortUrlError::Expired(_) => "Expired",
            ShortUrlError::InternalFailure(_) | ShortUrlError::Config(_) => "Server error",
        }
    }

    /// 格式化为彩色输出（用于启动失败时的终端输出）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ShortUrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ShortUrlError {}

// 便捷的构造函数
impl ShortUrlError {
    pub fn invalid_url<T: Into<String>>(msg: T) -> Self {
        ShortUrlError::InvalidUrl(msg.into())
    }

    pub fn invalid_request<T: Into<String>>(msg: T) -> Self {
        ShortUrlError::InvalidRequest(msg.into())
    }

    pub fn collision<T: Into<String>>(msg: T) -> Self {
        ShortUrlError::Collision(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ShortUrlError::NotFound(msg.into())
    }

    pub fn expired<T: Into<String>>(msg: T) -> Self {
        ShortUrlError::Expired(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        ShortUrlError::InternalFailure(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        ShortUrlError::Config(msg.into())
    }
}

/// JSON error body: `{"error": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

impl ResponseError for ShortUrlError {
    fn status_code(&self) -> StatusCode {
        match self {
            ShortUrlError::InvalidUrl(_) | ShortUrlError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ShortUrlError::Collision(_) => StatusCode::CONFLICT,
            ShortUrlError::NotFound(_) => StatusCode::NOT_FOUND,
            ShortUrlError::Expired(_) => StatusCode::GONE,
            ShortUrlError::InternalFailure(_) | ShortUrlError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.public_message(),
        })
    }
}

// 为常见的错误类型实现 From trait
impl From<std::io::Error> for ShortUrlError {
    fn from(err: std::io::Error) -> Self {
        ShortUrlError::InternalFailure(err.to_string())
    }
}

impl From<serde_json::Error> for ShortUrlError {
    fn from(err: serde_json::Error) -> Self {
        ShortUrlError::InvalidRequest(err.to_string())
    }
}

impl From<config::ConfigError> for ShortUrlError {
    fn from(err: config::ConfigError) -> Self {
        ShortUrlError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShortUrlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ShortUrlError::invalid_url("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ShortUrlError::invalid_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ShortUrlError::collision("x").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ShortUrlError::not_found("x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ShortUrlError::expired("x").status_code(), StatusCode::GONE);
        assert_eq!(
            ShortUrlError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_public_message_hides_detail() {
        let err = ShortUrlError::internal("lock poisoned in analytics store");
        assert_eq!(err.public_message(), "Server error");
        assert_eq!(
            err.format_simple(),
            "Internal Failure: lock poisoned in analytics store"
        );
    }

    #[test]
    fn test_codes_are_distinct() {
        let all = [
            ShortUrlError::invalid_url(""),
            ShortUrlError::invalid_request(""),
            ShortUrlError::collision(""),
            ShortUrlError::not_found(""),
            ShortUrlError::expired(""),
            ShortUrlError::internal(""),
            ShortUrlError::config(""),
        ];
        let codes: std::collections::HashSet<_> = all.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), all.len());
    }
}
