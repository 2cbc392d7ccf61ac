use super::{build_http_client, parse_api_error, NotifyError, NotifyResult};
use crate::util::is_http_url;

/// Twilio Messages API client
#[derive(Clone)]
pub struct TwilioSmsClient {
    client: reqwest::Client,
    messages_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl std::fmt::Debug for TwilioSmsClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TwilioSmsClient")
            .field("messages_url", &self.messages_url)
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .finish()
    }
}

impl TwilioSmsClient {
    pub fn new(
        base_url: &str,
        account_sid: &str,
        auth_token: &str,
        from_number: &str,
    ) -> NotifyResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !is_http_url(base_url) {
            return Err(NotifyError::Api(
                "Twilio base URL must include http:// or https://".to_string(),
            ));
        }
        let account_sid = account_sid.trim();

        Ok(Self {
            client: build_http_client()?,
            messages_url: format!("{base_url}/2010-04-01/Accounts/{account_sid}/Messages.json"),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.trim().to_string(),
            from_number: from_number.trim().to_string(),
        })
    }

    /// Send `body` to every phone number, one message each.
    ///
    /// Every number is attempted; failures are reported together afterwards.
    pub async fn send(&self, phones: &[String], body: &str) -> NotifyResult<()> {
        if phones.is_empty() {
            tracing::debug!("No supervisor phone numbers, skipping SMS");
            return Ok(());
        }

        let mut failures = Vec::new();
        for phone in phones {
            if let Err(error) = self.send_one(phone, body).await {
                tracing::debug!("SMS to {phone} failed: {error}");
                failures.push(format!("{phone}: {error}"));
            }
        }

        if failures.is_empty() {
            tracing::debug!("Sent SMS to {} recipient(s)", phones.len());
            Ok(())
        } else {
            Err(NotifyError::Api(format!(
                "{} of {} SMS message(s) failed: {}",
                failures.len(),
                phones.len(),
                failures.join("; ")
            )))
        }
    }

    async fn send_one(&self, phone: &str, body: &str) -> NotifyResult<()> {
        let response = self
            .client
            .post(&self.messages_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", phone), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Api(parse_api_error(status, &body)))
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[test]
    fn messages_url_includes_account() {
        let client =
            TwilioSmsClient::new("https://api.twilio.com/", "AC123", "tw-secret", "+15550100000")
                .unwrap();
        assert_eq!(
            client.messages_url,
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
        assert!(!format!("{client:?}").contains("tw-secret"));
    }

    #[tokio::test]
    async fn failed_recipients_are_reported() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let body = r#"{"code":21211,"message":"Invalid 'To' Phone Number"}"#;
        let response = format!(
            "HTTP/1.1 400 Bad Request\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request_buffer = [0_u8; 4096];
                let _ = socket.read(&mut request_buffer).await;
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        let client =
            TwilioSmsClient::new(&format!("http://{address}"), "AC123", "token", "+15550100000")
                .unwrap();
        let error = client
            .send(&["+1555".to_string()], "Worker inactive")
            .await
            .unwrap_err();
        assert!(error.to_string().contains("1 of 1"));
        assert!(error.to_string().contains("Invalid 'To' Phone Number (400)"));
    }
}
