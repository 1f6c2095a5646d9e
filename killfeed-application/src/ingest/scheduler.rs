//! Fixed-delay polling, one task per tracked server.
//!
//! Each server loop owns its poller behind a mutex, so at most one cycle of a
//! server is ever in flight. A cycle runs as its own task: a panic inside it
//! surfaces as a `JoinError` and the loop keeps its schedule.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use killfeed_domain::{TenantKey, TrackedServer};

use super::poller::{IngestDeps, ServerPoller};

struct ServerTask {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

pub struct IngestScheduler {
    runtime: Handle,
    deps: IngestDeps,
    shutdown: CancellationToken,
    tasks: Mutex<HashMap<TenantKey, ServerTask>>,
}

impl IngestScheduler {
    /// `runtime` is where server loops and their remote I/O run.
    pub fn new(runtime: Handle, deps: IngestDeps) -> Self {
        Self {
            runtime,
            deps,
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Starts polling `server`. Returns false when it is disabled, already
    /// running, or the scheduler is shutting down.
    pub async fn start_server(&self, server: TrackedServer) -> bool {
        if !server.enabled {
            info!(tenant = %server.tenant, name = %server.name, "server disabled; not scheduling");
            return false;
        }
        if self.shutdown.is_cancelled() {
            warn!(tenant = %server.tenant, "scheduler shutting down; not scheduling");
            return false;
        }

        let mut tasks = self.tasks.lock().await;
        if let Some(existing) = tasks.get(&server.tenant) {
            if !existing.join.is_finished() {
                warn!(tenant = %server.tenant, "server already scheduled");
                return false;
            }
        }

        let tenant = server.tenant.clone();
        let interval = server.poll_interval;
        let cancel = self.shutdown.child_token();
        let poller = Arc::new(Mutex::new(ServerPoller::new(server, self.deps.clone())));
        let join = self.runtime.spawn(run_server_loop(
            poller,
            tenant.clone(),
            interval,
            cancel.clone(),
            self.deps.clone(),
        ));
        tasks.insert(tenant, ServerTask { cancel, join });
        true
    }

    /// Stops scheduling `tenant` and waits for its in-flight cycle to finish.
    pub async fn disable_server(&self, tenant: &TenantKey) -> bool {
        let task = self.tasks.lock().await.remove(tenant);
        let Some(task) = task else {
            return false;
        };
        task.cancel.cancel();
        if let Err(err) = task.join.await {
            error!(tenant = %tenant, error = %err, "server loop ended abnormally");
        }
        info!(tenant = %tenant, "server disabled");
        true
    }

    pub async fn running(&self) -> Vec<TenantKey> {
        let tasks = self.tasks.lock().await;
        let mut running: Vec<TenantKey> = tasks
            .iter()
            .filter(|(_, task)| !task.join.is_finished())
            .map(|(tenant, _)| tenant.clone())
            .collect();
        running.sort();
        running
    }

    /// Cancels every loop and drains in-flight cycles.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let tasks: Vec<(TenantKey, ServerTask)> = self.tasks.lock().await.drain().collect();
        let count = tasks.len();
        let results = join_all(tasks.into_iter().map(|(tenant, task)| async move {
            (tenant, task.join.await)
        }))
        .await;
        for (tenant, result) in results {
            if let Err(err) = result {
                error!(tenant = %tenant, error = %err, "server loop ended abnormally");
            }
        }
        info!(servers = count, "ingest scheduler drained");
    }
}

async fn run_server_loop(
    poller: Arc<Mutex<ServerPoller>>,
    tenant: TenantKey,
    interval: Duration,
    cancel: CancellationToken,
    deps: IngestDeps,
) {
    info!(tenant = %tenant, interval_ms = interval.as_millis() as u64, "polling started");
    loop {
        if cancel.is_cancelled() {
            break;
        }

        let cycle_poller = poller.clone();
        let cycle = tokio::spawn(async move {
            let mut poller = cycle_poller.lock().await;
            poller.run_cycle().await
        });
        match cycle.await {
            Ok(report) => debug!(
                tenant = %tenant,
                cycle_id = %report.cycle_id,
                success = report.is_success(),
                "cycle complete"
            ),
            Err(err) if err.is_panic() => {
                deps.metrics.record_cycle_failure();
                error!(tenant = %tenant, "poll cycle panicked; keeping schedule");
            }
            Err(err) => warn!(tenant = %tenant, error = %err, "poll cycle cancelled"),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    info!(tenant = %tenant, "polling stopped");
}
