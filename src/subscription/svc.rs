use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{
    backend::{BackendReply, SubscriptionBackend},
    model::{ApplicationServerKey, Permission, PushSubscription, SubscriptionPayload},
    platform::{PushPlatform, TokenStore},
};
use crate::{
    cfg::Config,
    error::{RegistrarError, Result, TransmissionError},
};

/// Static inputs of a registration attempt.
#[derive(Debug, Clone)]
pub struct RegistrarSettings {
    pub worker_script: String,
    pub worker_scope: String,
    pub application_server_key: ApplicationServerKey,
    pub token_storage_key: String,
}

impl From<&Config> for RegistrarSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            worker_script: cfg.worker_script.clone(),
            worker_scope: cfg.worker_scope.clone(),
            application_server_key: cfg.vapid_public_key.clone(),
            token_storage_key: cfg.token_storage_key.clone(),
        }
    }
}

/// Background upload of the subscription. Awaiting it is optional; the
/// registrar outcome never depends on it.
pub struct TransmissionHandle {
    task: JoinHandle<Result<BackendReply, TransmissionError>>,
}

impl TransmissionHandle {
    pub async fn completion(self) -> Result<BackendReply, TransmissionError> {
        self.task.await?
    }
}

/// A browser subscription that was established and handed to the backend.
pub struct Registered {
    pub subscription: PushSubscription,
    pub payload: SubscriptionPayload,
    pub transmission: TransmissionHandle,
}

pub struct Registrar {
    platform: Arc<dyn PushPlatform>,
    tokens: Arc<dyn TokenStore>,
    backend: Arc<dyn SubscriptionBackend>,
    settings: RegistrarSettings,
}

impl Registrar {
    pub fn new(
        platform: Arc<dyn PushPlatform>,
        tokens: Arc<dyn TokenStore>,
        backend: Arc<dyn SubscriptionBackend>,
        settings: RegistrarSettings,
    ) -> Self {
        Self {
            platform,
            tokens,
            backend,
            settings,
        }
    }

    /// Page-load entry point. Runs the flow once and logs any failure;
    /// nothing is propagated to the page.
    pub async fn on_page_load(&self) -> Option<Registered> {
        match self.register().await {
            Ok(registered) => Some(registered),
            Err(RegistrarError::Unsupported) => {
                info!("service workers unavailable, skipping push registration");
                None
            }
            Err(e) => {
                error!("Subscription failed: {}", e);
                None
            }
        }
    }

    /// Runs registration, permission, lookup-or-create, key encoding and the
    /// token check in order, then starts the upload in the background. Any
    /// step failing aborts the rest.
    pub async fn register(&self) -> Result<Registered> {
        if !self.platform.supports_service_workers() {
            return Err(RegistrarError::Unsupported);
        }

        let registration = self
            .platform
            .register_worker(&self.settings.worker_script, &self.settings.worker_scope)
            .await
            .map_err(RegistrarError::Registration)?;
        info!(scope = %registration.scope, "Service Worker registered");

        match self.platform.request_permission().await {
            Permission::Granted => {}
            outcome => return Err(RegistrarError::Permission(outcome)),
        }

        let subscription = self
            .platform
            .get_or_create_subscription(&registration, &self.settings.application_server_key)
            .await
            .map_err(RegistrarError::Subscription)?;
        info!(endpoint = %subscription.endpoint, "push subscription ready");

        let payload = SubscriptionPayload::from_subscription(&subscription)?;

        let token = self
            .tokens
            .get_item(&self.settings.token_storage_key)
            .filter(|token| !token.is_empty())
            .ok_or(RegistrarError::MissingToken)?;

        let transmission = self.transmit(payload.clone(), token);
        Ok(Registered {
            subscription,
            payload,
            transmission,
        })
    }

    fn transmit(&self, payload: SubscriptionPayload, token: String) -> TransmissionHandle {
        let backend = Arc::clone(&self.backend);
        let task = tokio::spawn(async move {
            let result = backend.send_subscription(&payload, &token).await;
            match &result {
                Ok(reply) => info!(status = reply.status, "Subscription response: {}", reply.body),
                Err(e) => warn!(endpoint = %payload.endpoint, "Subscription upload failed: {}", e),
            }
            result
        });
        TransmissionHandle { task }
    }
}
