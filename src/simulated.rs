//! In-process stand-ins for the browser: a push service, client storage
//! and a service worker scope. The demo binary runs the pipeline on these.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ring::{
    agreement,
    rand::{SecureRandom, SystemRandom},
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    error::{PlatformError, WorkerError},
    notification::{
        model::{ClientMessage, NotificationHandle, NotificationOptions, WindowClient},
        svc::WorkerHost,
    },
    subscription::{
        model::{Permission, PushSubscription, SubscribeOptions, WorkerRegistration},
        platform::{PushPlatform, TokenStore},
    },
};

const PUSH_ORIGIN: &str = "https://push.example.invalid/wpush/v2";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct StoredSubscription {
    subscription: PushSubscription,
    server_key: Vec<u8>,
}

struct PushState {
    permission: Permission,
    registrations: HashMap<String, String>,
    subscriptions: HashMap<String, StoredSubscription>,
    subscribe_calls: usize,
}

/// Push service plus permission prompt. Subscriptions are kept per scope and
/// carry a fresh P-256 public key and 16-byte auth secret.
pub struct MemoryPushService {
    rng: SystemRandom,
    service_workers: bool,
    state: Mutex<PushState>,
}

impl MemoryPushService {
    pub fn new(permission: Permission) -> Self {
        Self {
            rng: SystemRandom::new(),
            service_workers: true,
            state: Mutex::new(PushState {
                permission,
                registrations: HashMap::new(),
                subscriptions: HashMap::new(),
                subscribe_calls: 0,
            }),
        }
    }

    pub fn without_service_workers(mut self) -> Self {
        self.service_workers = false;
        self
    }

    pub fn set_permission(&self, permission: Permission) {
        lock(&self.state).permission = permission;
    }

    /// Number of subscriptions actually minted.
    pub fn subscribe_calls(&self) -> usize {
        lock(&self.state).subscribe_calls
    }

    pub fn unsubscribe(&self, scope: &str) -> bool {
        lock(&self.state).subscriptions.remove(scope).is_some()
    }

    fn mint(&self) -> Result<PushSubscription, PlatformError> {
        let unavailable = |_| PlatformError::PushServiceRejected("key generation failed".to_string());

        let private = agreement::EphemeralPrivateKey::generate(&agreement::ECDH_P256, &self.rng)
            .map_err(unavailable)?;
        let public = private.compute_public_key().map_err(unavailable)?;

        let mut auth = [0u8; 16];
        self.rng.fill(&mut auth).map_err(unavailable)?;
        let mut id = [0u8; 24];
        self.rng.fill(&mut id).map_err(unavailable)?;

        Ok(PushSubscription {
            endpoint: format!("{}/{}", PUSH_ORIGIN, URL_SAFE_NO_PAD.encode(id)),
            p256dh: Some(public.as_ref().to_vec()),
            auth: Some(auth.to_vec()),
        })
    }
}

#[async_trait]
impl PushPlatform for MemoryPushService {
    fn supports_service_workers(&self) -> bool {
        self.service_workers
    }

    async fn register_worker(
        &self,
        script_url: &str,
        scope: &str,
    ) -> Result<WorkerRegistration, PlatformError> {
        if !script_url.ends_with(".js") {
            return Err(PlatformError::ScriptRejected(format!(
                "{} is not a script",
                script_url
            )));
        }
        if !scope.starts_with('/') {
            return Err(PlatformError::ScriptRejected(format!(
                "scope {} is outside the origin",
                scope
            )));
        }
        lock(&self.state)
            .registrations
            .insert(scope.to_string(), script_url.to_string());
        Ok(WorkerRegistration {
            script_url: script_url.to_string(),
            scope: scope.to_string(),
        })
    }

    async fn request_permission(&self) -> Permission {
        lock(&self.state).permission
    }

    async fn get_subscription(
        &self,
        registration: &WorkerRegistration,
    ) -> Result<Option<PushSubscription>, PlatformError> {
        let state = lock(&self.state);
        if !state.registrations.contains_key(&registration.scope) {
            return Err(PlatformError::UnknownRegistration(registration.scope.clone()));
        }
        Ok(state
            .subscriptions
            .get(&registration.scope)
            .map(|stored| stored.subscription.clone()))
    }

    async fn subscribe(
        &self,
        registration: &WorkerRegistration,
        options: SubscribeOptions,
    ) -> Result<PushSubscription, PlatformError> {
        if !options.user_visible_only {
            return Err(PlatformError::PushServiceRejected(
                "userVisibleOnly must be true".to_string(),
            ));
        }
        let key = &options.application_server_key;
        if key.len() != 65 || key[0] != 0x04 {
            return Err(PlatformError::PushServiceRejected(format!(
                "applicationServerKey is not a P-256 point ({} bytes)",
                key.len()
            )));
        }

        let mut state = lock(&self.state);
        if state.permission != Permission::Granted {
            return Err(PlatformError::PushServiceRejected(
                "notification permission revoked".to_string(),
            ));
        }
        if !state.registrations.contains_key(&registration.scope) {
            return Err(PlatformError::UnknownRegistration(registration.scope.clone()));
        }
        if let Some(stored) = state.subscriptions.get(&registration.scope) {
            if stored.server_key != options.application_server_key {
                return Err(PlatformError::PushServiceRejected(
                    "a subscription with a different applicationServerKey exists".to_string(),
                ));
            }
            return Ok(stored.subscription.clone());
        }

        let subscription = self.mint()?;
        state.subscribe_calls += 1;
        state.subscriptions.insert(
            registration.scope.clone(),
            StoredSubscription {
                subscription: subscription.clone(),
                server_key: options.application_server_key,
            },
        );
        info!(endpoint = %subscription.endpoint, "push service created subscription");
        Ok(subscription)
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_item(&self, key: &str, value: &str) {
        lock(&self.items).insert(key.to_string(), value.to_string());
    }
}

impl TokenStore for MemoryTokenStore {
    fn get_item(&self, key: &str) -> Option<String> {
        lock(&self.items).get(key).cloned()
    }
}

/// Storage backed by a JSON object on disk, read on every lookup.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn get_item(&self, key: &str) -> Option<String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), "storage not readable: {}", e);
                return None;
            }
        };
        let items: HashMap<String, serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                debug!(path = %self.path.display(), "storage is not a JSON object: {}", e);
                return None;
            }
        };
        match items.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Default)]
struct ConsoleState {
    clients: Vec<WindowClient>,
    shown: Vec<NotificationHandle>,
    posted: Vec<(String, String)>,
    next_id: u64,
}

/// Worker scope that logs notifications and keeps a list of windows.
pub struct ConsoleWorkerHost {
    state: Mutex<ConsoleState>,
    shown_total: watch::Sender<usize>,
}

impl Default for ConsoleWorkerHost {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ConsoleWorkerHost {
    pub fn new(clients: Vec<WindowClient>) -> Self {
        let (shown_total, _) = watch::channel(0);
        Self {
            state: Mutex::new(ConsoleState {
                clients,
                ..ConsoleState::default()
            }),
            shown_total,
        }
    }

    /// Resolves once `count` notifications have been shown in total.
    pub async fn wait_for_shown(&self, count: usize) {
        let mut shown = self.shown_total.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel.
        let _ = shown.wait_for(|total| *total >= count).await;
    }

    /// Serialized messages posted to each client, in order.
    pub fn posted(&self) -> Vec<(String, String)> {
        lock(&self.state).posted.clone()
    }

    pub fn clients(&self) -> Vec<WindowClient> {
        lock(&self.state).clients.clone()
    }

    /// Notifications currently on screen.
    pub fn visible(&self) -> Vec<NotificationHandle> {
        lock(&self.state).shown.clone()
    }
}

#[async_trait]
impl WorkerHost for ConsoleWorkerHost {
    async fn show_notification(
        &self,
        title: &str,
        options: NotificationOptions,
    ) -> Result<NotificationHandle, WorkerError> {
        let handle = {
            let mut state = lock(&self.state);
            state.next_id += 1;
            let handle = NotificationHandle {
                id: format!("notification-{}", state.next_id),
                title: title.to_string(),
            };
            state.shown.push(handle.clone());
            handle
        };
        info!(id = %handle.id, %title, body = %options.body, icon = %options.icon, "notification shown");
        self.shown_total.send_modify(|total| *total += 1);
        Ok(handle)
    }

    async fn close_notification(&self, notification: &NotificationHandle) {
        lock(&self.state).shown.retain(|n| n.id != notification.id);
        debug!(id = %notification.id, "notification closed");
    }

    async fn match_all_windows(&self) -> Result<Vec<WindowClient>, WorkerError> {
        Ok(self.clients())
    }

    async fn focus(&self, client: &WindowClient) -> Result<(), WorkerError> {
        if !client.focusable {
            return Err(WorkerError::Focus {
                id: client.id.clone(),
                reason: "not focusable".to_string(),
            });
        }
        info!(client = %client.id, url = %client.url, "window focused");
        Ok(())
    }

    fn can_open_window(&self) -> bool {
        true
    }

    async fn open_window(&self, url: &str) -> Result<(), WorkerError> {
        let mut state = lock(&self.state);
        state.next_id += 1;
        let client = WindowClient {
            id: format!("window-{}", state.next_id),
            url: url.to_string(),
            focusable: true,
        };
        info!(client = %client.id, %url, "window opened");
        state.clients.push(client);
        Ok(())
    }

    async fn post_message(
        &self,
        client: &WindowClient,
        message: &ClientMessage,
    ) -> Result<(), WorkerError> {
        match serde_json::to_string(message) {
            Ok(text) => {
                debug!(client = %client.id, message = %text, "message posted");
                lock(&self.state).posted.push((client.id.clone(), text));
            }
            Err(e) => warn!(client = %client.id, "message could not be serialized: {}", e),
        }
        Ok(())
    }
}
