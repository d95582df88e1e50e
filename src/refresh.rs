use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::{MetadataCache, StatusBoard};
use crate::client::BackendClient;
use crate::grid::describe_age;
use crate::types::{FetchStatus, StreamId};

/// One stream the loop polls.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshTarget {
    pub stream_id: StreamId,
    pub meta_url: String,
}

/// Everything the loop needs to know about the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshPlan {
    pub generation: u64,
    pub running: bool,
    pub interval: Duration,
    pub timeout: Duration,
    pub targets: Vec<RefreshTarget>,
}

impl Default for RefreshPlan {
    fn default() -> Self {
        Self {
            generation: 0,
            running: false,
            interval: Duration::from_millis(500),
            timeout: Duration::from_millis(700),
            targets: Vec::new(),
        }
    }
}

/// Requested state, before the loop stamps a generation on it.
#[derive(Debug, Clone)]
pub struct PlanUpdate {
    pub running: bool,
    pub interval: Duration,
    pub timeout: Duration,
    pub targets: Vec<RefreshTarget>,
    /// Force in-flight results to be dropped even if the targets are
    /// unchanged (e.g. the backend switched).
    pub invalidate: bool,
}

#[derive(Clone)]
struct FetchContext {
    client: BackendClient,
    cache: Arc<MetadataCache>,
    statuses: Arc<StatusBoard>,
    generation: Arc<AtomicU64>,
}

/// Periodic metadata poller.
///
/// Runs as its own tokio task driven by a recurring timer. Each tick spawns
/// one fetch per selected stream that has nothing in flight, so a slow or
/// failing stream never holds the others back. The loop never asks the
/// backend for the stream catalog.
pub struct RefreshLoop {
    control: watch::Sender<RefreshPlan>,
    generation: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl RefreshLoop {
    /// Start paused with nothing to poll.
    pub fn spawn(
        client: BackendClient,
        cache: Arc<MetadataCache>,
        statuses: Arc<StatusBoard>,
    ) -> Self {
        let generation = Arc::new(AtomicU64::new(0));
        let (control, control_rx) = watch::channel(RefreshPlan::default());
        let ctx = FetchContext {
            client,
            cache,
            statuses,
            generation: generation.clone(),
        };

        let task = tokio::spawn(async move {
            run_loop(control_rx, ctx).await;
        });

        Self {
            control,
            generation,
            task,
        }
    }

    /// Replace the current plan. Changing the targets, invalidating, or
    /// pausing bumps the generation so late responses are discarded.
    pub fn apply(&self, update: PlanUpdate) {
        self.control.send_modify(|plan| {
            let pausing = plan.running && !update.running;
            if update.invalidate || pausing || plan.targets != update.targets {
                plan.generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            }
            plan.running = update.running;
            plan.interval = update.interval;
            plan.timeout = update.timeout;
            plan.targets = update.targets;
        });
    }

    #[cfg(test)]
    pub fn plan(&self) -> RefreshPlan {
        self.control.borrow().clone()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn run_loop(mut control: watch::Receiver<RefreshPlan>, ctx: FetchContext) {
    let mut plan = control.borrow_and_update().clone();
    let mut ticks = ticker(plan.interval);
    let mut in_flight: HashMap<StreamId, JoinHandle<()>> = HashMap::new();

    info!("🔄 Refresh loop started");

    loop {
        tokio::select! {
            changed = control.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = control.borrow_and_update().clone();

                if next.generation != plan.generation || !next.running {
                    for (stream_id, handle) in in_flight.drain() {
                        debug!("✂️ Cancelling in-flight fetch for {}", stream_id);
                        handle.abort();
                    }
                }

                let resumed = next.running && !plan.running;
                if resumed || next.interval != plan.interval || next.generation != plan.generation {
                    ticks = ticker(next.interval);
                }

                if resumed {
                    info!("▶️ Refresh resumed every {:?}", next.interval);
                } else if plan.running && !next.running {
                    info!("⏸️ Refresh paused");
                }
                plan = next;
            }
            _ = ticks.tick() => {
                if !plan.running {
                    continue;
                }
                in_flight.retain(|_, handle| !handle.is_finished());

                for target in &plan.targets {
                    if in_flight.contains_key(&target.stream_id) {
                        debug!("⏳ {} still fetching, skipping this tick", target.stream_id);
                        continue;
                    }
                    let handle = tokio::spawn(fetch_one(
                        ctx.clone(),
                        target.clone(),
                        plan.generation,
                        plan.timeout,
                    ));
                    in_flight.insert(target.stream_id.clone(), handle);
                }
            }
        }
    }

    for (_, handle) in in_flight.drain() {
        handle.abort();
    }
    info!("🛑 Refresh loop stopped");
}

async fn fetch_one(ctx: FetchContext, target: RefreshTarget, generation: u64, timeout: Duration) {
    let result = ctx.client.get_metadata(&target.meta_url, timeout).await;

    if ctx.generation.load(Ordering::SeqCst) != generation {
        debug!("🗑️ Dropping stale metadata for {}", target.stream_id);
        return;
    }

    let is_current = || ctx.generation.load(Ordering::SeqCst) == generation;
    let now = Utc::now();
    let written = match result {
        Ok(payload) => {
            ctx.cache.put_if(&target.stream_id, payload, now, is_current)
                && ctx
                    .statuses
                    .record_if(&target.stream_id, FetchStatus::Ok { at: now }, is_current)
        }
        Err(e) => {
            let last = ctx.cache.get(&target.stream_id).map(|record| record.fetched_at);
            warn!(
                "⚠️ {}: {} (last update {})",
                target.stream_id,
                e,
                describe_age(last, now)
            );
            ctx.statuses.record_if(
                &target.stream_id,
                FetchStatus::Failed {
                    at: now,
                    message: e.to_string(),
                },
                is_current,
            )
        }
    };

    if !written {
        debug!("🗑️ Plan changed while storing {}, result dropped", target.stream_id);
    }
}
