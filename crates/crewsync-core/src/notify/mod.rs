//! Supervisor notifications: push via Expo, SMS via Twilio.

mod expo;
mod twilio;

#[cfg(test)]
pub(crate) mod testing;

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::config::{Credentials, NotificationSettings};
use crate::util::compact_text;

pub use expo::ExpoPushClient;
pub use twilio::TwilioSmsClient;

const NOTIFY_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{0} notifications are not configured")]
    NotConfigured(&'static str),
    #[error("Notification HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Notification API error: {0}")]
    Api(String),
}

pub type NotifyResult<T> = Result<T, NotifyError>;

/// Fan-out to supervisors
pub trait Notifier: Send + Sync {
    fn send_push(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
    ) -> impl Future<Output = NotifyResult<()>> + Send;

    fn send_sms(&self, phones: &[String], body: &str)
        -> impl Future<Output = NotifyResult<()>> + Send;
}

/// Push and SMS gateways built from configuration; either may be absent.
#[derive(Debug, Clone, Default)]
pub struct GatewayNotifier {
    push: Option<ExpoPushClient>,
    sms: Option<TwilioSmsClient>,
}

impl GatewayNotifier {
    pub const fn new(push: Option<ExpoPushClient>, sms: Option<TwilioSmsClient>) -> Self {
        Self { push, sms }
    }

    pub fn from_settings(
        settings: &NotificationSettings,
        credentials: &Credentials,
    ) -> NotifyResult<Self> {
        let push = ExpoPushClient::new(
            &settings.expo_push_url,
            credentials.expo_access_token.clone(),
        )?;

        let sms = match (
            settings.twilio_account_sid.as_deref(),
            settings.twilio_from_number.as_deref(),
            credentials.twilio_auth_token.as_deref(),
        ) {
            (Some(account_sid), Some(from_number), Some(auth_token)) => Some(TwilioSmsClient::new(
                &settings.twilio_base_url,
                account_sid,
                auth_token,
                from_number,
            )?),
            _ => {
                tracing::info!("Twilio is not fully configured; SMS escalation disabled");
                None
            }
        };

        Ok(Self::new(Some(push), sms))
    }

    pub const fn sms_enabled(&self) -> bool {
        self.sms.is_some()
    }
}

impl Notifier for GatewayNotifier {
    async fn send_push(&self, tokens: &[String], title: &str, body: &str) -> NotifyResult<()> {
        let client = self.push.as_ref().ok_or(NotifyError::NotConfigured("Push"))?;
        client.send(tokens, title, body).await
    }

    async fn send_sms(&self, phones: &[String], body: &str) -> NotifyResult<()> {
        let client = self.sms.as_ref().ok_or(NotifyError::NotConfigured("SMS"))?;
        client.send(phones, body).await
    }
}

fn build_http_client() -> NotifyResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(NOTIFY_HTTP_TIMEOUT_SECS))
        .build()?)
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<Value>(body) {
        let message = payload
            .get("message")
            .or_else(|| payload.pointer("/errors/0/message"))
            .or_else(|| payload.get("error"))
            .and_then(Value::as_str);
        if let Some(message) = message {
            return format!("{} ({})", compact_text(message), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact_text(trimmed), status.as_u16())
    }
}
