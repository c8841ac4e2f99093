use thiserror::Error;

use crate::subscription::model::Permission;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64url input of length {input_len}: {source}")]
    Base64 {
        input_len: usize,
        source: base64::DecodeError,
    },
}

/// Failures reported by the browser-side capabilities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("worker script rejected: {0}")]
    ScriptRejected(String),
    #[error("push service rejected subscribe: {0}")]
    PushServiceRejected(String),
    #[error("no registration for scope {0}")]
    UnknownRegistration(String),
    #[error("application server key is invalid: {0}")]
    InvalidServerKey(String),
    #[error("host error: {0}")]
    Host(String),
}

/// Terminal errors of a single registration attempt.
#[derive(Error, Debug)]
pub enum RegistrarError {
    #[error("service workers are not supported in this context")]
    Unsupported,

    #[error("service worker registration failed: {0}")]
    Registration(#[source] PlatformError),

    #[error("{}", permission_message(.0))]
    Permission(Permission),

    #[error("push subscription failed: {0}")]
    Subscription(#[source] PlatformError),

    #[error("subscription keys are missing: {missing}")]
    MissingKeys { missing: &'static str },

    #[error("no token found")]
    MissingToken,
}

fn permission_message(outcome: &Permission) -> String {
    match outcome {
        Permission::Denied => "notification permission denied".to_string(),
        Permission::Default => "notification permission prompt dismissed".to_string(),
        Permission::Granted => "notification permission granted".to_string(),
    }
}

/// Failures of the fire-and-forget subscription upload. Logged, never
/// propagated into the registrar flow.
#[derive(Error, Debug)]
pub enum TransmissionError {
    #[error("could not encode subscription: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("network failure: {0:#}")]
    Network(anyhow::Error),

    #[error("backend rejected subscription with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("backend reply is not valid JSON: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    #[error("transmission task aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}

/// Host failures inside the push worker. Payload problems are not errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    #[error("showNotification failed: {0}")]
    Show(String),
    #[error("clients.matchAll failed: {0}")]
    Clients(String),
    #[error("client {id} could not be focused: {reason}")]
    Focus { id: String, reason: String },
    #[error("clients.openWindow({url}) failed: {reason}")]
    Open { url: String, reason: String },
}

pub type Result<T, E = RegistrarError> = std::result::Result<T, E>;
