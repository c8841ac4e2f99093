use async_trait::async_trait;

use super::model::{
    ApplicationServerKey, Permission, PushSubscription, SubscribeOptions, WorkerRegistration,
};
use crate::error::PlatformError;

/// Browser capabilities the registrar needs: service worker registration,
/// the notification permission prompt and the push manager.
#[async_trait]
pub trait PushPlatform: Send + Sync {
    /// Whether service workers exist in this context at all.
    fn supports_service_workers(&self) -> bool {
        true
    }

    async fn register_worker(
        &self,
        script_url: &str,
        scope: &str,
    ) -> Result<WorkerRegistration, PlatformError>;

    async fn request_permission(&self) -> Permission;

    async fn get_subscription(
        &self,
        registration: &WorkerRegistration,
    ) -> Result<Option<PushSubscription>, PlatformError>;

    async fn subscribe(
        &self,
        registration: &WorkerRegistration,
        options: SubscribeOptions,
    ) -> Result<PushSubscription, PlatformError>;

    /// Returns the existing subscription for the registration, creating a
    /// user-visible one only when none exists. The server key is decoded on
    /// the create path only.
    async fn get_or_create_subscription(
        &self,
        registration: &WorkerRegistration,
        server_key: &ApplicationServerKey,
    ) -> Result<PushSubscription, PlatformError> {
        if let Some(existing) = self.get_subscription(registration).await? {
            tracing::debug!(endpoint = %existing.endpoint, "reusing push subscription");
            return Ok(existing);
        }

        let application_server_key = server_key
            .to_bytes()
            .map_err(|e| PlatformError::InvalidServerKey(e.to_string()))?;
        let options = SubscribeOptions {
            user_visible_only: true,
            application_server_key,
        };
        self.subscribe(registration, options).await
    }
}

/// Persistent client-side key/value storage holding the bearer token.
pub trait TokenStore: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
}
