//! The reconcile worker pool.
//!
//! Triggers are routed to a fixed worker per object identity, so repeated
//! triggers for the same silence are processed one at a time and in order,
//! while distinct silences reconcile concurrently. Reconciliation itself
//! is synchronous and runs on the blocking pool.

use std::hash::{BuildHasher, Hash, Hasher, RandomState};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use hush_alertmanager::SilenceApi;
use hush_reconcile::{ReconcileOutcome, SilenceReconciler, SilenceStore};
use hush_types::SilenceId;

/// Routes reconcile triggers to the worker owning the object's identity.
#[derive(Debug, Clone)]
pub struct TriggerRouter {
    senders: Vec<mpsc::UnboundedSender<SilenceId>>,
    hasher: RandomState,
}

impl TriggerRouter {
    /// Enqueues a reconcile trigger for the given object.
    pub fn trigger(&self, id: SilenceId) {
        let idx = self.worker_index(&id);
        if self.senders[idx].send(id).is_err() {
            debug!("worker channel closed, dropping trigger");
        }
    }

    fn worker_index(&self, id: &SilenceId) -> usize {
        let mut hasher = self.hasher.build_hasher();
        id.hash(&mut hasher);
        (hasher.finish() as usize) % self.senders.len()
    }
}

/// Starts `concurrency` workers over the given reconciler.
///
/// A zero `concurrency` is clamped to one worker, so the returned router
/// always has somewhere to route. Returns the router used to enqueue
/// triggers and the worker task handles. Workers exit when every clone of
/// the router is dropped.
pub fn spawn_workers<S, A>(
    reconciler: Arc<SilenceReconciler<S, A>>,
    concurrency: usize,
    retry_delay: Duration,
) -> (TriggerRouter, Vec<JoinHandle<()>>)
where
    S: SilenceStore + 'static,
    A: SilenceApi + 'static,
{
    let concurrency = concurrency.max(1);
    let mut senders = Vec::with_capacity(concurrency);
    let mut receivers = Vec::with_capacity(concurrency);

    for _ in 0..concurrency {
        let (tx, rx) = mpsc::unbounded_channel();
        senders.push(tx);
        receivers.push(rx);
    }

    let router = TriggerRouter {
        senders,
        hasher: RandomState::new(),
    };

    let handles = receivers
        .into_iter()
        .map(|rx| {
            tokio::spawn(run_worker(
                rx,
                Arc::clone(&reconciler),
                router.clone(),
                retry_delay,
            ))
        })
        .collect();

    (router, handles)
}

async fn run_worker<S, A>(
    mut rx: mpsc::UnboundedReceiver<SilenceId>,
    reconciler: Arc<SilenceReconciler<S, A>>,
    router: TriggerRouter,
    retry_delay: Duration,
) where
    S: SilenceStore + 'static,
    A: SilenceApi + 'static,
{
    while let Some(id) = rx.recv().await {
        let task_reconciler = Arc::clone(&reconciler);
        let task_id = id.clone();
        let result =
            tokio::task::spawn_blocking(move || task_reconciler.reconcile(&task_id)).await;

        match result {
            Ok(Ok(ReconcileOutcome::Done)) => {
                debug!(silence = %id, "reconcile complete");
            }
            Ok(Ok(ReconcileOutcome::Requeue)) => {
                router.trigger(id);
            }
            Ok(Ok(ReconcileOutcome::RequeueAfter(delay))) => {
                schedule(router.clone(), id, delay);
            }
            Ok(Err(err)) => {
                warn!(silence = %id, error = %err, delay_secs = retry_delay.as_secs(),
                    "reconcile failed, will retry");
                schedule(router.clone(), id, retry_delay);
            }
            Err(err) => {
                warn!(silence = %id, error = %err, "reconcile task panicked");
            }
        }
    }
}

fn schedule(router: TriggerRouter, id: SilenceId, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        router.trigger(id);
    });
}
