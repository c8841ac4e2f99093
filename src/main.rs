use std::sync::Arc;

use anyhow::{Context, Result};
use aria_push::{
    cfg::init_config,
    notification::{
        model::{NotificationClickEvent, PushEvent},
        svc::{PushWorker, WorkerSettings},
    },
    runtime::{WorkerEvent, WorkerRuntime},
    simulated::{ConsoleWorkerHost, FileTokenStore, MemoryPushService},
    subscription::{
        backend::HttpSubscriptionBackend,
        model::Permission,
        svc::{Registrar, RegistrarSettings},
    },
};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = init_config().context("loading configuration")?;

    // Page context: register, subscribe, upload.
    let platform = Arc::new(MemoryPushService::new(Permission::Granted));
    let backend = Arc::new(HttpSubscriptionBackend::new(&cfg.backend_url, &cfg.subscribe_path));
    info!(url = backend.url(), "subscription endpoint");
    let registrar = Registrar::new(
        platform,
        Arc::new(FileTokenStore::new(&cfg.token_file)),
        backend,
        RegistrarSettings::from(cfg),
    );
    if let Some(registered) = registrar.on_page_load().await {
        info!(endpoint = %registered.payload.endpoint, "browser subscription established");
        if let Err(e) = registered.transmission.completion().await {
            warn!("backend did not store the subscription: {}", e);
        }
    }

    // Worker context: one structured push, one malformed push, one click.
    let host = Arc::new(ConsoleWorkerHost::default());
    let worker = Arc::new(PushWorker::new(host.clone(), WorkerSettings::from(cfg)));
    let (event_tx, event_rx) = mpsc::channel(16);
    let (_shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let runtime = tokio::spawn(WorkerRuntime::start(worker, event_rx, shutdown_rx));

    event_tx
        .send(WorkerEvent::Push(PushEvent::new(
            r#"{"title":"Check-in reminder","body":"How are you feeling today?"}"#,
        )))
        .await?;
    event_tx
        .send(WorkerEvent::Push(PushEvent::new("Time for your evening routine")))
        .await?;
    host.wait_for_shown(2).await;

    if let Some(notification) = host.visible().into_iter().next() {
        event_tx
            .send(WorkerEvent::NotificationClick(NotificationClickEvent { notification }))
            .await?;
    }

    // Closing the source lets the runtime drain queued events and stop.
    drop(event_tx);
    let stats = runtime.await.context("worker runtime panicked")?;
    info!(?stats, "done");
    Ok(())
}
