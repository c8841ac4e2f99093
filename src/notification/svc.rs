use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::model::{
    ClickOutcome, ClientMessage, DecodedPayload, NotificationClickEvent, NotificationHandle,
    NotificationOptions, PushEvent, PushNotificationPayload, WindowClient,
};
use crate::{cfg::Config, error::WorkerError};

pub const FALLBACK_TITLE: &str = "Notification";
pub const NO_DATA_BODY: &str = "No data received";

/// Service worker global scope: notifications and window clients.
#[async_trait]
pub trait WorkerHost: Send + Sync {
    async fn show_notification(
        &self,
        title: &str,
        options: NotificationOptions,
    ) -> Result<NotificationHandle, WorkerError>;

    async fn close_notification(&self, notification: &NotificationHandle);

    async fn match_all_windows(&self) -> Result<Vec<WindowClient>, WorkerError>;

    async fn focus(&self, client: &WindowClient) -> Result<(), WorkerError>;

    /// `false` when the host has no `clients.openWindow`.
    fn can_open_window(&self) -> bool;

    async fn open_window(&self, url: &str) -> Result<(), WorkerError>;

    async fn post_message(
        &self,
        client: &WindowClient,
        message: &ClientMessage,
    ) -> Result<(), WorkerError>;
}

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub icon: String,
    pub fallback_title: String,
    pub app_root: String,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            icon: "/Images/Aria.jpg".to_string(),
            fallback_title: FALLBACK_TITLE.to_string(),
            app_root: "/".to_string(),
        }
    }
}

impl From<&Config> for WorkerSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            icon: cfg.notification_icon.clone(),
            fallback_title: cfg.fallback_title.clone(),
            app_root: cfg.app_root.clone(),
        }
    }
}

/// Decodes a push payload. Invalid UTF-8 is replaced the way
/// `PushMessageData.text()` does it.
pub fn decode(data: Option<&[u8]>) -> DecodedPayload {
    let Some(bytes) = data else {
        warn!("push event carried no data");
        return DecodedPayload::Fallback {
            raw_text: NO_DATA_BODY.to_string(),
        };
    };

    match serde_json::from_slice::<PushNotificationPayload>(bytes) {
        Ok(payload) => DecodedPayload::Structured {
            title: payload.title,
            body: payload.body,
        },
        Err(e) => {
            warn!("Error parsing push notification data as JSON: {}", e);
            DecodedPayload::Fallback {
                raw_text: String::from_utf8_lossy(bytes).into_owned(),
            }
        }
    }
}

pub struct PushWorker {
    host: Arc<dyn WorkerHost>,
    settings: WorkerSettings,
}

impl PushWorker {
    pub fn new(host: Arc<dyn WorkerHost>, settings: WorkerSettings) -> Self {
        Self { host, settings }
    }

    /// Shows exactly one notification for the event whatever its payload,
    /// then tells open pages about it.
    pub async fn handle_push(&self, event: PushEvent) -> Result<NotificationHandle, WorkerError> {
        let (title, body) = match decode(event.data.as_deref()) {
            DecodedPayload::Structured { title, body } => (title, body),
            DecodedPayload::Fallback { raw_text } => (self.settings.fallback_title.clone(), raw_text),
        };
        debug!(%title, "showing notification");

        let handle = self
            .host
            .show_notification(
                &title,
                NotificationOptions {
                    body: body.clone(),
                    icon: self.settings.icon.clone(),
                },
            )
            .await?;

        self.broadcast(ClientMessage::UpdateCount { title, body }).await;
        Ok(handle)
    }

    async fn broadcast(&self, message: ClientMessage) {
        let clients = match self.host.match_all_windows().await {
            Ok(clients) => clients,
            Err(e) => {
                warn!("could not list clients for broadcast: {}", e);
                return;
            }
        };
        for client in &clients {
            if let Err(e) = self.host.post_message(client, &message).await {
                warn!(client = %client.id, "postMessage failed: {}", e);
            }
        }
    }

    /// Closes the notification, then focuses a window already at the
    /// application root or opens a new one there.
    pub async fn handle_notification_click(
        &self,
        event: NotificationClickEvent,
    ) -> Result<ClickOutcome, WorkerError> {
        self.host.close_notification(&event.notification).await;

        let clients = self.host.match_all_windows().await?;
        let root = self.settings.app_root.as_str();
        if let Some(client) = clients.iter().find(|c| c.url == root && c.focusable) {
            self.host.focus(client).await?;
            info!(client = %client.id, "focused existing window");
            return Ok(ClickOutcome::Focused {
                client_id: client.id.clone(),
            });
        }

        if self.host.can_open_window() {
            self.host.open_window(root).await?;
            info!(url = %root, "opened new window");
            return Ok(ClickOutcome::Opened {
                url: root.to_string(),
            });
        }

        debug!("no focusable window and openWindow unavailable");
        Ok(ClickOutcome::NoAction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_payload() {
        let decoded = decode(Some(br#"{"title":"Reminder","body":"Check in now"}"#.as_slice()));
        assert_eq!(
            decoded,
            DecodedPayload::Structured {
                title: "Reminder".to_string(),
                body: "Check in now".to_string()
            }
        );
    }

    #[test]
    fn extra_fields_are_ignored() {
        let decoded = decode(Some(br#"{"title":"t","body":"b","icon":"/x.png"}"#.as_slice()));
        assert!(matches!(decoded, DecodedPayload::Structured { .. }));
    }

    #[test]
    fn non_json_falls_back_to_raw_text() {
        assert_eq!(
            decode(Some(b"not json".as_slice())),
            DecodedPayload::Fallback {
                raw_text: "not json".to_string()
            }
        );
    }

    #[test]
    fn wrong_shape_falls_back() {
        let cases: [&[u8]; 4] = [
            br#"{"title":"only title"}"#,
            br#""just a string""#,
            br#"{"title":1,"body":2}"#,
            b"",
        ];
        for raw in cases {
            match decode(Some(raw)) {
                DecodedPayload::Fallback { raw_text } => {
                    assert_eq!(raw_text.as_bytes(), raw)
                }
                other => panic!("expected fallback, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_data_uses_placeholder() {
        assert_eq!(
            decode(None),
            DecodedPayload::Fallback {
                raw_text: NO_DATA_BODY.to_string()
            }
        );
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        match decode(Some([0x66, 0xff, 0x6f].as_slice())) {
            DecodedPayload::Fallback { raw_text } => assert_eq!(raw_text, "f\u{fffd}o"),
            other => panic!("expected fallback, got {other:?}"),
        }
    }
}
