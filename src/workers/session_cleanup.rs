use std::time::Duration;

use crate::sessions::SessionRegistry;

pub async fn run(registry: &SessionRegistry, idle_ttl: Duration) {
    tracing::debug!("session_cleanup: start");
    let evicted = registry.evict_idle(idle_ttl).await;
    let remaining = registry.len().await;
    tracing::info!(evicted, remaining, "session_cleanup: done");
}
