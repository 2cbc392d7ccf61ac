use serde::{Deserialize, Serialize};

use super::{build_http_client, parse_api_error, NotifyError, NotifyResult};
use crate::util::is_http_url;

/// Expo accepts at most 100 messages per request.
const EXPO_BATCH_SIZE: usize = 100;

/// Expo push API client
#[derive(Clone)]
pub struct ExpoPushClient {
    client: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
}

impl std::fmt::Debug for ExpoPushClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ExpoPushClient")
            .field("endpoint", &self.endpoint)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ExpoMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
    sound: &'static str,
    priority: &'static str,
}

#[derive(Debug, Deserialize)]
struct ExpoResponse {
    #[serde(default)]
    data: Vec<ExpoTicket>,
}

#[derive(Debug, Deserialize)]
struct ExpoTicket {
    status: Option<String>,
    message: Option<String>,
}

impl ExpoPushClient {
    pub fn new(endpoint: &str, access_token: Option<String>) -> NotifyResult<Self> {
        let endpoint = endpoint.trim();
        if !is_http_url(endpoint) {
            return Err(NotifyError::Api(
                "Expo push endpoint must include http:// or https://".to_string(),
            ));
        }
        Ok(Self {
            client: build_http_client()?,
            endpoint: endpoint.to_string(),
            access_token,
        })
    }

    /// Send one notification to every token.
    ///
    /// Tickets reporting an error are collected into a single `Api` error after
    /// all batches were sent.
    pub async fn send(&self, tokens: &[String], title: &str, body: &str) -> NotifyResult<()> {
        if tokens.is_empty() {
            tracing::debug!("No push tokens, skipping push notification");
            return Ok(());
        }

        let mut rejected = Vec::new();
        for batch in tokens.chunks(EXPO_BATCH_SIZE) {
            let messages = batch
                .iter()
                .map(|token| ExpoMessage {
                    to: token,
                    title,
                    body,
                    sound: "default",
                    priority: "high",
                })
                .collect::<Vec<_>>();

            let mut request = self
                .client
                .post(&self.endpoint)
                .header("Accept", "application/json")
                .json(&messages);
            if let Some(token) = &self.access_token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(NotifyError::Api(parse_api_error(status, &body)));
            }

            let payload = response.json::<ExpoResponse>().await?;
            rejected.extend(payload.data.into_iter().filter_map(|ticket| {
                (ticket.status.as_deref() == Some("error"))
                    .then(|| ticket.message.unwrap_or_else(|| "unknown error".to_string()))
            }));
        }

        if rejected.is_empty() {
            tracing::debug!("Sent push notification to {} device(s)", tokens.len());
            Ok(())
        } else {
            Err(NotifyError::Api(format!(
                "{} of {} push message(s) rejected: {}",
                rejected.len(),
                tokens.len(),
                rejected.join("; ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    async fn spawn_one_shot_server(status_line: &str, body: &str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let address = listener.local_addr().expect("local address");
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request_buffer = [0_u8; 4096];
                let _ = socket.read(&mut request_buffer).await;
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        format!("http://{address}/--/api/v2/push/send")
    }

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_string()).collect()
    }

    #[tokio::test]
    async fn empty_token_list_sends_nothing() {
        let client = ExpoPushClient::new("https://exp.host/--/api/v2/push/send", None).unwrap();
        client.send(&[], "title", "body").await.unwrap();
    }

    #[tokio::test]
    async fn ok_tickets_succeed() {
        let url = spawn_one_shot_server(
            "200 OK",
            r#"{"data":[{"status":"ok","id":"a"},{"status":"ok","id":"b"}]}"#,
        )
        .await;
        let client = ExpoPushClient::new(&url, Some("expo-token".to_string())).unwrap();
        client
            .send(&tokens(&["ExponentPushToken[a]", "ExponentPushToken[b]"]), "t", "b")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn error_tickets_are_reported() {
        let url = spawn_one_shot_server(
            "200 OK",
            r#"{"data":[{"status":"ok"},{"status":"error","message":"DeviceNotRegistered"}]}"#,
        )
        .await;
        let client = ExpoPushClient::new(&url, None).unwrap();
        let error = client
            .send(&tokens(&["ExponentPushToken[a]", "ExponentPushToken[b]"]), "t", "b")
            .await
            .unwrap_err();
        assert!(error.to_string().contains("1 of 2"));
        assert!(error.to_string().contains("DeviceNotRegistered"));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "Requires CREWSYNC_LIVE_PUSH_TOKEN plus network access"]
    async fn live_push_reaches_device() {
        let _ = dotenvy::dotenv();

        let token = std::env::var("CREWSYNC_LIVE_PUSH_TOKEN")
            .expect("CREWSYNC_LIVE_PUSH_TOKEN should be set");
        let credentials = crate::config::Credentials::from_env();
        let client = ExpoPushClient::new(
            "https://exp.host/--/api/v2/push/send",
            credentials.expo_access_token,
        )
        .expect("client should build");

        client
            .send(&[token], "crewsync test", "Live push check")
            .await
            .unwrap_or_else(|error| panic!("Expo push failed: {error}"));
    }

    #[test]
    fn debug_redacts_access_token() {
        let client =
            ExpoPushClient::new("https://exp.host/--/api/v2/push/send", Some("secret".to_string()))
                .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
