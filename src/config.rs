use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use micro_emotion_wasm::config::{
    SessionConfig, DEFAULT_CALIBRATION_DURATION_MS, DEFAULT_HISTORY_CAPACITY,
    DEFAULT_HISTORY_MIN_CONFIDENCE, DEFAULT_HISTORY_MIN_GAP_MS, DEFAULT_SMOOTHING_ALPHA,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub cors_origin: String,
    pub trust_proxy: bool,
    pub rate_limit: RateLimitConfig,
    pub worker: WorkerConfig,
    pub sessions: SessionLimits,
    pub limits: LimitsConfig,
    /// 新会话的默认参数，创建请求可逐项覆盖
    pub emotion: SessionConfig,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u64,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub is_leader: bool,
}

#[derive(Debug, Clone)]
pub struct SessionLimits {
    pub max_sessions: usize,
    pub idle_ttl_secs: u64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 1000,
            idle_ttl_secs: 900,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub max_sse_connections: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sse_connections: 256,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = SessionLimits::default();
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            trust_proxy: env_or_bool("TRUST_PROXY", false),
            // 前端每帧都会提交，默认窗口按 60fps 留足余量
            rate_limit: RateLimitConfig {
                window_secs: env_or_parse("RATE_LIMIT_WINDOW_SECS", 60_u64),
                max_requests: env_or_parse("RATE_LIMIT_MAX", 6000_u64),
            },
            worker: WorkerConfig {
                is_leader: env_or_bool("WORKER_LEADER", true),
            },
            sessions: SessionLimits {
                max_sessions: env_or_parse("MAX_SESSIONS", defaults.max_sessions),
                idle_ttl_secs: env_or_parse("SESSION_IDLE_TTL_SECS", defaults.idle_ttl_secs),
            },
            limits: LimitsConfig {
                max_sse_connections: env_or_parse(
                    "MAX_SSE_CONNECTIONS",
                    LimitsConfig::default().max_sse_connections,
                ),
            },
            emotion: SessionConfig {
                calibration_duration_ms: env_or_parse(
                    "CALIBRATION_DURATION_MS",
                    DEFAULT_CALIBRATION_DURATION_MS,
                ),
                smoothing_alpha: env_or_parse("CALIBRATION_SMOOTHING_ALPHA", DEFAULT_SMOOTHING_ALPHA),
                history_capacity: env_or_parse("HISTORY_CAPACITY", DEFAULT_HISTORY_CAPACITY),
                history_min_gap_ms: env_or_parse("HISTORY_MIN_GAP_MS", DEFAULT_HISTORY_MIN_GAP_MS),
                history_min_confidence: env_or_parse(
                    "HISTORY_MIN_CONFIDENCE",
                    DEFAULT_HISTORY_MIN_CONFIDENCE,
                ),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
