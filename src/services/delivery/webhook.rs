use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::NotificationDelivery;
use crate::models::NotificationEvent;

pub const SIGNATURE_HEADER: &str = "X-Agribook-Signature";

/// Forwards each event as JSON to an external notification service.
pub struct WebhookDelivery {
    url: String,
    secret: Option<String>,
    client: reqwest::Client,
}

impl WebhookDelivery {
    pub fn new(url: String, secret: Option<String>) -> Self {
        Self {
            url,
            secret: secret.filter(|s| !s.is_empty()),
            client: reqwest::Client::new(),
        }
    }
}

/// Base64 HMAC-SHA1 of the request body.
pub fn sign_payload(secret: &str, body: &[u8]) -> anyhow::Result<String> {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid webhook secret: {e}"))?;
    mac.update(body);
    let digest = mac.finalize().into_bytes();
    Ok(base64::engine::general_purpose::STANDARD.encode(digest))
}

#[async_trait]
impl NotificationDelivery for WebhookDelivery {
    async fn enqueue(&self, event: &NotificationEvent) -> anyhow::Result<()> {
        let body = serde_json::to_vec(event).context("failed to encode notification")?;

        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(secret) = &self.secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(secret, &body)?);
        }

        request
            .body(body)
            .send()
            .await
            .context("failed to reach notification webhook")?
            .error_for_status()
            .context("notification webhook returned error")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_payload_is_deterministic() {
        let a = sign_payload("secret", b"{\"a\":1}").unwrap();
        let b = sign_payload("secret", b"{\"a\":1}").unwrap();
        let c = sign_payload("other", b"{\"a\":1}").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        // 20-byte SHA1 digest encodes to 28 base64 chars
        assert_eq!(a.len(), 28);
    }

    #[test]
    fn test_empty_secret_disables_signing() {
        let delivery = WebhookDelivery::new("http://localhost/hook".to_string(), Some(String::new()));
        assert!(delivery.secret.is_none());
    }
}
