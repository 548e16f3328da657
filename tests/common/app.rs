use std::sync::Arc;

use axum::Router;
use tokio::sync::broadcast;

use micro_emotion_server::config::{
    Config, LimitsConfig, RateLimitConfig, SessionLimits, WorkerConfig,
};
use micro_emotion_server::routes::build_router;
use micro_emotion_server::sessions::SessionRegistry;
use micro_emotion_server::state::AppState;
use micro_emotion_wasm::SessionConfig;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    pub shutdown_tx: broadcast::Sender<()>,
}

pub struct TestLimits {
    pub api_requests: u64,
    pub max_sessions: usize,
    pub max_sse_connections: usize,
}

impl Default for TestLimits {
    fn default() -> Self {
        Self {
            api_requests: 1000,
            max_sessions: 16,
            max_sse_connections: 16,
        }
    }
}

fn test_config(limits: &TestLimits) -> Config {
    // 直接构造 Config，避免使用 set_var 造成多线程测试环境变量竞态
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        cors_origin: "http://localhost:5173".to_string(),
        trust_proxy: false,
        rate_limit: RateLimitConfig {
            window_secs: 60,
            max_requests: limits.api_requests,
        },
        worker: WorkerConfig { is_leader: false },
        sessions: SessionLimits {
            max_sessions: limits.max_sessions,
            idle_ttl_secs: 900,
        },
        limits: LimitsConfig {
            max_sse_connections: limits.max_sse_connections,
        },
        emotion: SessionConfig::default(),
    }
}

pub async fn spawn_with(limits: TestLimits) -> TestApp {
    let config = test_config(&limits);
    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let sessions = Arc::new(SessionRegistry::new(config.sessions.max_sessions));
    let state = AppState::new(sessions, &config, shutdown_tx.clone());
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        shutdown_tx,
    }
}

pub async fn spawn_test_app() -> TestApp {
    spawn_with(TestLimits::default()).await
}
