use thiserror::Error;

/// 启动阶段的致命错误。单帧问题不会出现在这里，而是写入帧结果。
#[derive(Debug, Error)]
pub enum InitError {
    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    #[error("invalid CORS_ORIGIN '{origin}': {reason}")]
    InvalidCorsOrigin { origin: String, reason: String },

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server error: {0}")]
    Serve(#[from] std::io::Error),
}
