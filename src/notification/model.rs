use serde::{Deserialize, Serialize};

/// Expected JSON shape of a push message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushNotificationPayload {
    pub title: String,
    pub body: String,
}

/// What a push payload decoded into. Decoding never fails; anything that
/// is not a well-formed `{title, body}` object becomes `Fallback`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedPayload {
    Structured { title: String, body: String },
    Fallback { raw_text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub data: Option<Vec<u8>>,
}

impl PushEvent {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Some(data.into()),
        }
    }

    pub fn empty() -> Self {
        Self { data: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
}

/// A notification the host is currently showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationHandle {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationClickEvent {
    pub notification: NotificationHandle,
}

/// An open window of the application, as listed by `clients.matchAll`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
    pub focusable: bool,
}

/// Message posted to open pages after a push arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "camelCase")]
pub enum ClientMessage {
    UpdateCount { title: String, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Focused { client_id: String },
    Opened { url: String },
    NoAction,
}
