use std::sync::Arc;

use tokio::{
    sync::{mpsc, oneshot::Receiver},
    task::JoinSet,
};
use tracing::{error, info, warn};

use crate::notification::{
    model::{NotificationClickEvent, PushEvent},
    svc::PushWorker,
};

/// Events the host delivers to the worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    Push(PushEvent),
    NotificationClick(NotificationClickEvent),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeStats {
    pub pushes: usize,
    pub clicks: usize,
    pub failures: usize,
}

pub struct WorkerRuntime {}

impl WorkerRuntime {
    /// Dispatches events until shutdown or until the event source closes.
    /// Every handler runs as its own task and is kept alive until it
    /// finishes, including across shutdown. Events already queued when
    /// shutdown arrives are still handled. Dropping the shutdown sender
    /// counts as a shutdown signal.
    pub async fn start(
        worker: Arc<PushWorker>,
        mut events: mpsc::Receiver<WorkerEvent>,
        mut shutdown_rx: Receiver<()>,
    ) -> RuntimeStats {
        let mut in_flight: JoinSet<Handled> = JoinSet::new();
        let mut stats = RuntimeStats::default();

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            let worker = Arc::clone(&worker);
                            in_flight.spawn(async move { Self::handle_event(&worker, event).await });
                        }
                        None => {
                            info!("event source closed");
                            break;
                        }
                    }
                }
                Some(done) = in_flight.join_next(), if !in_flight.is_empty() => {
                    stats.record(done);
                }
                _ = &mut shutdown_rx => {
                    info!("Shutting down worker...");
                    break;
                }
            }
        }

        events.close();
        while let Some(event) = events.recv().await {
            let worker = Arc::clone(&worker);
            in_flight.spawn(async move { Self::handle_event(&worker, event).await });
        }

        while let Some(done) = in_flight.join_next().await {
            stats.record(done);
        }
        info!(pushes = stats.pushes, clicks = stats.clicks, failures = stats.failures, "worker stopped");
        stats
    }

    async fn handle_event(worker: &PushWorker, event: WorkerEvent) -> Handled {
        match event {
            WorkerEvent::Push(push) => match worker.handle_push(push).await {
                Ok(_) => Handled::Push(true),
                Err(e) => {
                    error!("push handler failed: {}", e);
                    Handled::Push(false)
                }
            },
            WorkerEvent::NotificationClick(click) => {
                match worker.handle_notification_click(click).await {
                    Ok(_) => Handled::Click(true),
                    Err(e) => {
                        error!("notificationclick handler failed: {}", e);
                        Handled::Click(false)
                    }
                }
            }
        }
    }
}

enum Handled {
    Push(bool),
    Click(bool),
}

impl RuntimeStats {
    fn record(&mut self, done: Result<Handled, tokio::task::JoinError>) {
        match done {
            Ok(Handled::Push(ok)) => {
                self.pushes += 1;
                self.failures += usize::from(!ok);
            }
            Ok(Handled::Click(ok)) => {
                self.clicks += 1;
                self.failures += usize::from(!ok);
            }
            Err(e) => {
                warn!("worker task panicked: {}", e);
                self.failures += 1;
            }
        }
    }
}
