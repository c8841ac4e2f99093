// Shared spies and scripted hosts for the integration tests.
#![allow(dead_code)]

use std::{
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use aria_push::{
    error::{PlatformError, TransmissionError, WorkerError},
    notification::{
        model::{ClientMessage, NotificationHandle, NotificationOptions, WindowClient},
        svc::WorkerHost,
    },
    subscription::{
        backend::{BackendReply, SubscriptionBackend},
        model::{
            Permission, PushSubscription, SubscribeOptions, SubscriptionPayload,
            WorkerRegistration,
        },
        platform::PushPlatform,
        svc::RegistrarSettings,
    },
};
use async_trait::async_trait;
use tokio::sync::Notify;

pub const VAPID_KEY: &str =
    "BGa9HxdkPyrkdDaQIPhWPxPwIhMYftcGRpVCNbh6AQC8zIl8oqAeFKa2eBwvGU4SpWKS7v2BtPhWu-Pq4RAXWm8";

pub fn settings() -> RegistrarSettings {
    RegistrarSettings {
        worker_script: "/service-worker.js".to_string(),
        worker_scope: "/".to_string(),
        application_server_key: aria_push::subscription::model::ApplicationServerKey::new(VAPID_KEY),
        token_storage_key: "token".to_string(),
    }
}

/// Records every upload and answers with a fixed status.
pub struct SpyBackend {
    pub calls: Mutex<Vec<(SubscriptionPayload, String)>>,
    status: u16,
}

impl SpyBackend {
    pub fn accepting() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            status: 200,
        }
    }

    pub fn rejecting(status: u16) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            status,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SubscriptionBackend for SpyBackend {
    async fn send_subscription(
        &self,
        payload: &SubscriptionPayload,
        token: &str,
    ) -> Result<BackendReply, TransmissionError> {
        self.calls
            .lock()
            .unwrap()
            .push((payload.clone(), token.to_string()));
        if (200..300).contains(&self.status) {
            Ok(BackendReply {
                status: self.status,
                body: serde_json::json!({ "message": "Subscription saved successfully" }),
            })
        } else {
            Err(TransmissionError::Rejected {
                status: self.status,
                body: r#"{"error":"Missing required fields"}"#.to_string(),
            })
        }
    }
}

/// Platform whose every answer is fixed up front.
pub struct ScriptedPlatform {
    pub supported: bool,
    pub registration: Result<(), PlatformError>,
    pub permission: Permission,
    pub existing: Option<PushSubscription>,
    pub created: Result<PushSubscription, PlatformError>,
    pub subscribe_calls: AtomicUsize,
    pub last_options: Mutex<Option<SubscribeOptions>>,
}

impl ScriptedPlatform {
    pub fn granting(created: PushSubscription) -> Self {
        Self {
            supported: true,
            registration: Ok(()),
            permission: Permission::Granted,
            existing: None,
            created: Ok(created),
            subscribe_calls: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        }
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushPlatform for ScriptedPlatform {
    fn supports_service_workers(&self) -> bool {
        self.supported
    }

    async fn register_worker(
        &self,
        script_url: &str,
        scope: &str,
    ) -> Result<WorkerRegistration, PlatformError> {
        self.registration.clone()?;
        Ok(WorkerRegistration {
            script_url: script_url.to_string(),
            scope: scope.to_string(),
        })
    }

    async fn request_permission(&self) -> Permission {
        self.permission
    }

    async fn get_subscription(
        &self,
        _registration: &WorkerRegistration,
    ) -> Result<Option<PushSubscription>, PlatformError> {
        Ok(self.existing.clone())
    }

    async fn subscribe(
        &self,
        _registration: &WorkerRegistration,
        options: SubscribeOptions,
    ) -> Result<PushSubscription, PlatformError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options);
        self.created.clone()
    }
}

pub fn subscription(p256dh: Option<&[u8]>, auth: Option<&[u8]>) -> PushSubscription {
    PushSubscription {
        endpoint: "https://fcm.googleapis.com/fcm/send/test-endpoint".to_string(),
        p256dh: p256dh.map(<[u8]>::to_vec),
        auth: auth.map(<[u8]>::to_vec),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shown {
    pub title: String,
    pub body: String,
    pub icon: String,
}

/// Worker host that records every call.
pub struct RecordingHost {
    pub clients: Vec<WindowClient>,
    pub can_open: bool,
    pub fail_show: bool,
    pub fail_clients: bool,
    pub show_delay: Option<Duration>,
    pub show_started: Notify,
    pub shown: Mutex<Vec<Shown>>,
    pub closed: Mutex<Vec<String>>,
    pub focused: Mutex<Vec<String>>,
    pub opened: Mutex<Vec<String>>,
    pub messages: Mutex<Vec<(String, ClientMessage)>>,
}

impl RecordingHost {
    pub fn new(clients: Vec<WindowClient>) -> Self {
        Self {
            clients,
            can_open: true,
            fail_show: false,
            fail_clients: false,
            show_delay: None,
            show_started: Notify::new(),
            shown: Mutex::new(Vec::new()),
            closed: Mutex::new(Vec::new()),
            focused: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn shown(&self) -> Vec<Shown> {
        self.shown.lock().unwrap().clone()
    }

    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }

    pub fn focused(&self) -> Vec<String> {
        self.focused.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<(String, ClientMessage)> {
        self.messages.lock().unwrap().clone()
    }
}

pub fn window(id: &str, url: &str) -> WindowClient {
    WindowClient {
        id: id.to_string(),
        url: url.to_string(),
        focusable: true,
    }
}

#[async_trait]
impl WorkerHost for RecordingHost {
    async fn show_notification(
        &self,
        title: &str,
        options: NotificationOptions,
    ) -> Result<NotificationHandle, WorkerError> {
        self.show_started.notify_one();
        if let Some(delay) = self.show_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_show {
            return Err(WorkerError::Show("permission revoked".to_string()));
        }
        let mut shown = self.shown.lock().unwrap();
        shown.push(Shown {
            title: title.to_string(),
            body: options.body,
            icon: options.icon,
        });
        Ok(NotificationHandle {
            id: format!("n{}", shown.len()),
            title: title.to_string(),
        })
    }

    async fn close_notification(&self, notification: &NotificationHandle) {
        self.closed.lock().unwrap().push(notification.id.clone());
    }

    async fn match_all_windows(&self) -> Result<Vec<WindowClient>, WorkerError> {
        if self.fail_clients {
            return Err(WorkerError::Clients("worker is shutting down".to_string()));
        }
        Ok(self.clients.clone())
    }

    async fn focus(&self, client: &WindowClient) -> Result<(), WorkerError> {
        self.focused.lock().unwrap().push(client.id.clone());
        Ok(())
    }

    fn can_open_window(&self) -> bool {
        self.can_open
    }

    async fn open_window(&self, url: &str) -> Result<(), WorkerError> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn post_message(
        &self,
        client: &WindowClient,
        message: &ClientMessage,
    ) -> Result<(), WorkerError> {
        self.messages
            .lock()
            .unwrap()
            .push((client.id.clone(), message.clone()));
        Ok(())
    }
}
