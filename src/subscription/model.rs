use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

use crate::{
    encoding::{bytes_to_base64, url_base64_to_bytes},
    error::{DecodeError, RegistrarError},
};

/// The VAPID public key identifying this application to the push service,
/// kept in its base64url text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationServerKey(String);

impl ApplicationServerKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw key bytes as the subscribe call expects them.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        url_base64_to_bytes(&self.0)
    }
}

/// Result of `Notification.requestPermission()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub user_visible_only: bool,
    pub application_server_key: Vec<u8>,
}

/// Handle to a registered worker, as returned by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRegistration {
    pub script_url: String,
    pub scope: String,
}

/// Browser push subscription with its raw key buffers. Either key may be
/// absent when the platform returns an incomplete object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSubscription {
    pub endpoint: String,
    pub p256dh: Option<Vec<u8>>,
    pub auth: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Body of `POST /subscribe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPayload {
    pub endpoint: String,
    pub keys: PushSubscriptionKeys,
}

impl SubscriptionPayload {
    /// Encodes both key buffers as standard base64. Fails if either key is
    /// absent or empty, so a partial payload can never be built.
    pub fn from_subscription(subscription: &PushSubscription) -> Result<Self, RegistrarError> {
        let p256dh = non_empty(subscription.p256dh.as_deref());
        let auth = non_empty(subscription.auth.as_deref());

        let (p256dh, auth) = match (p256dh, auth) {
            (Some(p256dh), Some(auth)) => (p256dh, auth),
            (None, Some(_)) => return Err(RegistrarError::MissingKeys { missing: "p256dh" }),
            (Some(_), None) => return Err(RegistrarError::MissingKeys { missing: "auth" }),
            (None, None) => {
                return Err(RegistrarError::MissingKeys {
                    missing: "p256dh, auth",
                });
            }
        };

        Ok(Self {
            endpoint: subscription.endpoint.clone(),
            keys: PushSubscriptionKeys {
                p256dh: bytes_to_base64(p256dh),
                auth: bytes_to_base64(auth),
            },
        })
    }

    /// Subscription record in the form a web-push sender consumes. The
    /// sender expects URL-safe keys, so the standard base64 is re-encoded.
    pub fn as_subscription_info(&self) -> Result<web_push::SubscriptionInfo, DecodeError> {
        Ok(web_push::SubscriptionInfo {
            endpoint: self.endpoint.clone(),
            keys: web_push::SubscriptionKeys {
                p256dh: URL_SAFE_NO_PAD.encode(url_base64_to_bytes(&self.keys.p256dh)?),
                auth: URL_SAFE_NO_PAD.encode(url_base64_to_bytes(&self.keys.auth)?),
            },
        })
    }
}

fn non_empty(key: Option<&[u8]>) -> Option<&[u8]> {
    key.filter(|bytes| !bytes.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(p256dh: Option<Vec<u8>>, auth: Option<Vec<u8>>) -> PushSubscription {
        PushSubscription {
            endpoint: "https://push.example.com/send/abc".to_string(),
            p256dh,
            auth,
        }
    }

    #[test]
    fn payload_serializes_to_wire_shape() {
        let sub = subscription(Some(vec![4, 1, 2]), Some(vec![0xfb, 0xff]));
        let payload = SubscriptionPayload::from_subscription(&sub).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "endpoint": "https://push.example.com/send/abc",
                "keys": { "p256dh": "BAEC", "auth": "+/8=" }
            })
        );
    }

    #[test]
    fn missing_or_empty_keys_are_rejected() {
        let cases = [
            (None, Some(vec![1]), "p256dh"),
            (Some(vec![1]), None, "auth"),
            (Some(vec![]), Some(vec![1]), "p256dh"),
            (Some(vec![1]), Some(vec![]), "auth"),
            (None, None, "p256dh, auth"),
        ];
        for (p256dh, auth, expected) in cases {
            match SubscriptionPayload::from_subscription(&subscription(p256dh, auth)) {
                Err(RegistrarError::MissingKeys { missing }) => assert_eq!(missing, expected),
                other => panic!("expected MissingKeys, got {other:?}"),
            }
        }
    }

    #[test]
    fn subscription_info_uses_url_safe_keys() {
        let sub = subscription(Some(vec![0xfb, 0xff, 0x01]), Some(vec![0xfb, 0xff]));
        let payload = SubscriptionPayload::from_subscription(&sub).unwrap();
        let info = payload.as_subscription_info().unwrap();
        assert_eq!(info.endpoint, payload.endpoint);
        assert_eq!(info.keys.p256dh, "-_8B");
        assert_eq!(info.keys.auth, "-_8");
    }
}
