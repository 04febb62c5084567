use serde::{Deserialize, Serialize};

/// 环境变量前缀，例如 `SU__SERVER__PORT=4000`
pub const ENV_PREFIX: &str = "SU";

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - server: 监听地址、端口、worker 数量、可信代理
/// - links: 短链接默认有效期、短码长度、生成重试次数
/// - logging: 本地日志配置
/// - remote_log: 远程日志收集器配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub remote_log: RemoteLogConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config file > 默认值
    /// 出错时回退到默认值，不会中断启动
    pub fn load(path: Option<&str>) -> Self {
        match Self::try_load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("[ERROR] Failed to load config: {}", e);
                Self::default()
            }
        }
    }

    /// 与 [`StaticConfig::load`] 相同，但把错误交给调用方
    pub fn try_load(path: Option<&str>) -> crate::errors::Result<Self> {
        use config::{Config, Environment, File};

        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.trusted_proxies"),
            )
            .build()?;

        let config: StaticConfig = settings.try_deserialize()?;
        if std::path::Path::new(path).exists() {
            eprintln!("[INFO] Configuration loaded from: {}", path);
        }
        Ok(config)
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// 可信反向代理（单个 IP 或 CIDR），只有它们的 X-Forwarded-For 会被采信
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

/// 短链接策略配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    /// 未指定 validity 时的有效期（分钟）
    #[serde(default = "default_validity_minutes")]
    pub default_validity_minutes: u32,
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    /// 自动生成短码冲突时的最大尝试次数
    #[serde(default = "default_max_generate_attempts")]
    pub max_generate_attempts: usize,
    /// 覆盖返回给客户端的短链接前缀，如 `https://sho.rt`
    #[serde(default)]
    pub base_url: Option<String>,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 远程日志收集器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteLogConfig {
    #[serde(default = "default_remote_log_enabled")]
    pub enabled: bool,
    #[serde(default = "default_remote_log_endpoint")]
    pub endpoint: String,
    /// 未配置时读取 `ACCESS_TOKEN` 环境变量
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_remote_log_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_remote_log_queue_capacity")]
    pub queue_capacity: usize,
}

// ============================================================
// Default value functions for static config
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_workers() -> usize {
    num_cpus::get().min(32)
}

fn default_validity_minutes() -> u32 {
    30
}

fn default_code_length() -> usize {
    6
}

fn default_max_generate_attempts() -> usize {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_remote_log_enabled() -> bool {
    true
}

fn default_remote_log_endpoint() -> String {
    "http://20.244.56.144/evaluation-service/logs".to_string()
}

fn default_remote_log_timeout_ms() -> u64 {
    5000
}

fn default_remote_log_queue_capacity() -> usize {
    1024
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            workers: default_workers(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            default_validity_minutes: default_validity_minutes(),
            code_length: default_code_length(),
            max_generate_attempts: default_max_generate_attempts(),
            base_url: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for RemoteLogConfig {
    fn default() -> Self {
        Self {
            enabled: default_remote_log_enabled(),
            endpoint: default_remote_log_endpoint(),
            access_token: None,
            timeout_ms: default_remote_log_timeout_ms(),
            queue_capacity: default_remote_log_queue_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_original_behavior() {
        let config = StaticConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.links.default_validity_minutes, 30);
        assert_eq!(config.links.code_length, 6);
        assert_eq!(config.remote_log.timeout_ms, 5000);
        assert!(config.server.workers >= 1 && config.server.workers <= 32);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            r#"
[server]
port = 4321
trusted_proxies = ["10.0.0.0/8"]

[links]
code_length = 8
base_url = "https://sho.rt"

[remote_log]
enabled = false
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = StaticConfig::try_load(Some(&path)).unwrap();

        assert_eq!(config.server.port, 4321);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.trusted_proxies, vec!["10.0.0.0/8".to_string()]);
        assert_eq!(config.links.code_length, 8);
        assert_eq!(config.links.default_validity_minutes, 30);
        assert_eq!(config.links.base_url.as_deref(), Some("https://sho.rt"));
        assert!(!config.remote_log.enabled);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = StaticConfig::load(Some("/definitely/not/here.toml"));
        assert_eq!(config.links.max_generate_attempts, 5);
    }

    #[test]
    fn test_sample_config_round_trips() {
        let sample = StaticConfig::generate_sample_config();
        assert!(sample.contains("[server]"));
        assert!(sample.contains("[remote_log]"));

        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.server.port, 3000);
    }
}
