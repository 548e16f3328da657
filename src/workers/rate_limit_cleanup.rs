use crate::middleware::rate_limit::RateLimitState;

pub async fn run(state: &RateLimitState) {
    let dropped = state.limiter.cleanup().await;
    tracing::debug!(dropped, "rate_limit_cleanup: done");
}
