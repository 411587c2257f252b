//! Periodic backend health check with an explicit start/stop lifecycle.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::models::HealthResponse;

pub type HealthResult = Result<HealthResponse, ApiError>;

/// Cancellable scheduled task that polls `GET /health`.
///
/// The first check runs as soon as the poller starts, then once per interval.
/// Failures are handed to the callback like any other result; the loop keeps
/// going. The task is aborted on [`stop`](HealthPoller::stop) or drop.
pub struct HealthPoller {
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl HealthPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Start polling, restarting if already running. The callback returns
    /// `false` to end the loop (e.g. when its receiver is gone).
    pub fn start<F>(&mut self, api: ApiClient, on_result: F)
    where
        F: Fn(HealthResult) -> bool + Send + 'static,
    {
        self.stop();
        let interval = self.interval;
        debug!(?interval, "starting health checks");

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let result = api.check_health().await;
                if !on_result(result) {
                    break;
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("stopping health checks");
            task.abort();
        }
    }
}

impl Drop for HealthPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
