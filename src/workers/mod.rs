pub mod rate_limit_cleanup;
pub mod session_cleanup;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::WorkerConfig;
use crate::middleware::rate_limit::RateLimitState;
use crate::sessions::SessionRegistry;

/// Timeout for individual worker invocations.
const WORKER_TIMEOUT: Duration = Duration::from_secs(30);

/// Drain period before scheduler shutdown to let in-flight tasks complete.
#[cfg(test)]
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);
#[cfg(not(test))]
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerName {
    SessionCleanup,
    RateLimitCleanup,
}

impl WorkerName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionCleanup => "session_cleanup",
            Self::RateLimitCleanup => "rate_limit_cleanup",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: WorkerName,
    pub cron: &'static str,
    pub enabled: bool,
}

pub struct WorkerManager {
    sessions: Arc<SessionRegistry>,
    rate_limit: Arc<RateLimitState>,
    shutdown_rx: broadcast::Receiver<()>,
    config: WorkerConfig,
    idle_ttl: Duration,
}

impl WorkerManager {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        rate_limit: Arc<RateLimitState>,
        shutdown_rx: broadcast::Receiver<()>,
        config: &WorkerConfig,
        idle_ttl: Duration,
    ) -> Self {
        Self {
            sessions,
            rate_limit,
            shutdown_rx,
            config: config.clone(),
            idle_ttl,
        }
    }

    /// Single source of truth for all planned jobs and their cron schedules.
    pub fn planned_jobs(&self) -> Vec<JobSpec> {
        if !self.config.is_leader {
            return Vec::new();
        }

        vec![
            JobSpec {
                name: WorkerName::SessionCleanup,
                cron: "0 * * * * *",
                // TTL 为 0 时关闭空闲淘汰
                enabled: !self.idle_ttl.is_zero(),
            },
            JobSpec {
                name: WorkerName::RateLimitCleanup,
                cron: "0 */5 * * * *",
                enabled: true,
            },
        ]
    }

    /// Start the worker scheduler. Returns an error if the scheduler cannot be created or started.
    pub async fn start(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.config.is_leader {
            tracing::info!("Worker leader disabled; skipping worker startup");
            return Ok(());
        }

        let mut scheduler = JobScheduler::new().await?;

        self.register_jobs(&scheduler).await;

        scheduler.start().await?;

        tracing::info!("Worker manager started");
        let _ = self.shutdown_rx.recv().await;

        tracing::info!(
            drain_ms = DRAIN_TIMEOUT.as_millis() as u64,
            "Worker manager shutting down"
        );
        tokio::time::sleep(DRAIN_TIMEOUT).await;
        let _ = scheduler.shutdown().await;
        Ok(())
    }

    async fn register_jobs(&self, scheduler: &JobScheduler) {
        for spec in &self.planned_jobs() {
            if !spec.enabled {
                tracing::info!(name = spec.name.as_str(), "Skipping disabled worker");
                continue;
            }

            let name_str = spec.name.as_str();
            match spec.name {
                WorkerName::SessionCleanup => {
                    let sessions = self.sessions.clone();
                    let idle_ttl = self.idle_ttl;
                    add_job(scheduler, spec.cron, name_str, move || {
                        let sessions = sessions.clone();
                        async move {
                            session_cleanup::run(&sessions, idle_ttl).await;
                        }
                    })
                    .await;
                }
                WorkerName::RateLimitCleanup => {
                    let rate_limit = self.rate_limit.clone();
                    add_job(scheduler, spec.cron, name_str, move || {
                        let rate_limit = rate_limit.clone();
                        async move {
                            rate_limit_cleanup::run(&rate_limit).await;
                        }
                    })
                    .await;
                }
            }
            tracing::info!(name = name_str, cron = spec.cron, "Registered worker");
        }
    }
}

/// Add a job to the scheduler with an overlap guard and timeout wrapper.
async fn add_job<Fut, F>(scheduler: &JobScheduler, cron: &str, name: &'static str, mut run: F)
where
    F: FnMut() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(false));

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let guard = running.clone();

        if guard
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(
                worker = name,
                "Skipping worker invocation: previous run still in progress"
            );
            return Box::pin(async {});
        }

        let fut = run();
        Box::pin(async move {
            if tokio::time::timeout(WORKER_TIMEOUT, fut).await.is_err() {
                tracing::error!(
                    worker = name,
                    timeout_secs = WORKER_TIMEOUT.as_secs(),
                    "Worker timed out"
                );
            }
            guard.store(false, Ordering::SeqCst);
        })
    });

    match job {
        Ok(job) => {
            if let Err(err) = scheduler.add(job).await {
                tracing::error!(error=%err, cron, worker = name, "Failed to add worker job");
            }
        }
        Err(err) => tracing::error!(error=%err, cron, worker = name, "Failed to create worker job"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(is_leader: bool, idle_ttl: Duration) -> (WorkerManager, broadcast::Sender<()>) {
        let (tx, _) = broadcast::channel(2);
        let manager = WorkerManager::new(
            Arc::new(SessionRegistry::new(4)),
            Arc::new(RateLimitState::new(60, 10)),
            tx.subscribe(),
            &WorkerConfig { is_leader },
            idle_ttl,
        );
        (manager, tx)
    }

    #[tokio::test]
    async fn leader_switch_controls_job_registration() {
        let (manager, _tx) = manager(false, Duration::from_secs(900));
        assert!(manager.planned_jobs().is_empty());
    }

    #[tokio::test]
    async fn non_leader_start_returns_immediately() {
        let (manager, _tx) = manager(false, Duration::from_secs(900));
        manager
            .start()
            .await
            .expect("non-leader start should succeed");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn leader_start_registers_jobs_and_stops_on_shutdown() {
        let (manager, tx) = manager(true, Duration::from_secs(900));
        let handle = tokio::spawn(manager.start());

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(()).expect("manager subscribed");

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("manager stops after shutdown")
            .expect("join");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn zero_ttl_disables_session_cleanup() {
        let (manager, _tx) = manager(true, Duration::ZERO);
        let jobs = manager.planned_jobs();
        let cleanup = jobs
            .iter()
            .find(|j| j.name == WorkerName::SessionCleanup)
            .expect("session cleanup planned");
        assert!(!cleanup.enabled);
    }

    #[tokio::test]
    async fn leader_plans_every_worker() {
        let (manager, _tx) = manager(true, Duration::from_secs(900));
        let names: Vec<_> = manager.planned_jobs().iter().map(|j| j.name).collect();
        assert_eq!(
            names,
            vec![WorkerName::SessionCleanup, WorkerName::RateLimitCleanup]
        );
        for name in names {
            assert!(!name.as_str().is_empty());
        }
    }
}
