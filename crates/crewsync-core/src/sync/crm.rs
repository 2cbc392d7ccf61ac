//! Remote CRM clients.
//!
//! Responses from both providers are loosely shaped JSON; everything is folded
//! into a [`DeliveryOutcome`] at this boundary so the queue processor never sees
//! provider specifics.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::{CrmSettings, Credentials, MappedRecord};
use crate::models::RecordType;
use crate::util::{compact_text, is_http_url, normalize_text_option};

const CRM_HTTP_TIMEOUT_SECS: u64 = 30;
const SALESFORCE_DUPLICATE_CODE: &str = "DUPLICATES_DETECTED";

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Created remotely
    Delivered { remote_id: Option<String> },
    /// A record with the same natural key already exists remotely
    Duplicate { existing_id: Option<String> },
    /// Transport or API failure; retried on a later pass
    Failed {
        message: String,
        status: Option<u16>,
    },
}

impl DeliveryOutcome {
    fn transport(error: &reqwest::Error) -> Self {
        Self::Failed {
            message: format!("request failed: {error}"),
            status: error.status().map(|status| status.as_u16()),
        }
    }
}

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("Invalid CRM configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Missing CRM credential: {0}")]
    MissingCredential(&'static str),
    #[error("CRM HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type CrmResult<T> = Result<T, CrmError>;

/// Creates records in the remote CRM
pub trait CrmClient: Send + Sync {
    fn create_record(&self, record: &MappedRecord)
        -> impl Future<Output = DeliveryOutcome> + Send;
}

// ---------------------------------------------------------------------------
// Salesforce
// ---------------------------------------------------------------------------

/// Salesforce REST `sobjects` client
#[derive(Clone)]
pub struct SalesforceClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    survey_object: String,
    appointment_object: String,
}

impl std::fmt::Debug for SalesforceClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SalesforceClient")
            .field("base_url", &self.base_url)
            .field("access_token", &"[REDACTED]")
            .field("survey_object", &self.survey_object)
            .field("appointment_object", &self.appointment_object)
            .finish()
    }
}

impl SalesforceClient {
    pub fn new(
        instance_url: &str,
        api_version: &str,
        access_token: &str,
        survey_object: &str,
        appointment_object: &str,
    ) -> CrmResult<Self> {
        let instance_url = normalize_base_url(instance_url, "instance_url")?;
        let access_token = normalize_text_option(Some(access_token.to_string()))
            .ok_or(CrmError::MissingCredential("Salesforce access token"))?;
        let api_version = api_version.trim().trim_start_matches('v');

        Ok(Self {
            client: build_http_client()?,
            base_url: format!("{instance_url}/services/data/v{api_version}/sobjects"),
            access_token,
            survey_object: survey_object.trim().to_string(),
            appointment_object: appointment_object.trim().to_string(),
        })
    }

    fn object_for(&self, record_type: RecordType) -> &str {
        match record_type {
            RecordType::Survey => &self.survey_object,
            RecordType::Appointment => &self.appointment_object,
        }
    }

    fn endpoint_for(&self, record_type: RecordType) -> String {
        format!("{}/{}/", self.base_url, self.object_for(record_type))
    }
}

impl CrmClient for SalesforceClient {
    async fn create_record(&self, record: &MappedRecord) -> DeliveryOutcome {
        let response = match self
            .client
            .post(self.endpoint_for(record.record_type))
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
            .json(&record.fields)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => return DeliveryOutcome::transport(&error),
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        parse_salesforce_response(status, &body)
    }
}

/// Interpret a Salesforce `sobjects` create response.
pub fn parse_salesforce_response(status: StatusCode, body: &str) -> DeliveryOutcome {
    let payload = serde_json::from_str::<Value>(body).unwrap_or(Value::Null);

    if status.is_success() {
        return DeliveryOutcome::Delivered {
            remote_id: string_field(&payload, "id"),
        };
    }

    // Errors arrive as an array of {message, errorCode, duplicateResult?}
    let errors = match &payload {
        Value::Array(entries) => entries.iter().collect::<Vec<_>>(),
        Value::Object(_) => vec![&payload],
        _ => Vec::new(),
    };
    if let Some(duplicate) = errors.iter().find(|entry| {
        entry
            .get("errorCode")
            .and_then(Value::as_str)
            .is_some_and(|code| code == SALESFORCE_DUPLICATE_CODE)
    }) {
        let existing_id = duplicate
            .pointer("/duplicateResult/matchResults/0/matchRecords/0/record/Id")
            .and_then(Value::as_str)
            .map(str::to_string);
        return DeliveryOutcome::Duplicate { existing_id };
    }

    DeliveryOutcome::Failed {
        message: parse_api_error(status, body),
        status: Some(status.as_u16()),
    }
}

// ---------------------------------------------------------------------------
// Zapier
// ---------------------------------------------------------------------------

/// Zapier catch-hook client
#[derive(Debug, Clone)]
pub struct ZapierClient {
    client: reqwest::Client,
    webhook_url: String,
}

impl ZapierClient {
    pub fn new(webhook_url: &str) -> CrmResult<Self> {
        let webhook_url = normalize_base_url(webhook_url, "webhook_url")?;
        Ok(Self {
            client: build_http_client()?,
            webhook_url,
        })
    }
}

impl CrmClient for ZapierClient {
    async fn create_record(&self, record: &MappedRecord) -> DeliveryOutcome {
        let body = json!({
            "record_type": record.record_type.as_str(),
            "record_id": record.record_id.as_str(),
            "natural_key": record.natural_key,
            "fields": record.fields,
        });

        let response = match self
            .client
            .post(&self.webhook_url)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => return DeliveryOutcome::transport(&error),
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        parse_zapier_response(status, &body)
    }
}

/// Interpret a catch-hook response.
pub fn parse_zapier_response(status: StatusCode, body: &str) -> DeliveryOutcome {
    let payload = serde_json::from_str::<Value>(body).unwrap_or(Value::Null);
    let remote_id = string_field(&payload, "id").or_else(|| string_field(&payload, "request_id"));

    if status == StatusCode::CONFLICT {
        return DeliveryOutcome::Duplicate {
            existing_id: remote_id,
        };
    }

    if status.is_success() {
        let is_duplicate = payload
            .get("status")
            .and_then(Value::as_str)
            .is_some_and(|value| value.eq_ignore_ascii_case("duplicate"));
        return if is_duplicate {
            DeliveryOutcome::Duplicate {
                existing_id: remote_id,
            }
        } else {
            DeliveryOutcome::Delivered { remote_id }
        };
    }

    DeliveryOutcome::Failed {
        message: parse_api_error(status, body),
        status: Some(status.as_u16()),
    }
}

// ---------------------------------------------------------------------------
// Configured provider
// ---------------------------------------------------------------------------

/// The CRM client selected by configuration
#[derive(Debug, Clone)]
pub enum ConfiguredCrm {
    Salesforce(SalesforceClient),
    Zapier(ZapierClient),
}

impl ConfiguredCrm {
    pub fn from_settings(settings: &CrmSettings, credentials: &Credentials) -> CrmResult<Self> {
        match settings {
            CrmSettings::Salesforce {
                instance_url,
                api_version,
                survey_object,
                appointment_object,
            } => {
                let token = credentials
                    .salesforce_token
                    .as_deref()
                    .ok_or(CrmError::MissingCredential("CREWSYNC_SALESFORCE_TOKEN"))?;
                Ok(Self::Salesforce(SalesforceClient::new(
                    instance_url,
                    api_version,
                    token,
                    survey_object,
                    appointment_object,
                )?))
            }
            CrmSettings::Zapier { webhook_url } => {
                Ok(Self::Zapier(ZapierClient::new(webhook_url)?))
            }
        }
    }
}

impl CrmClient for ConfiguredCrm {
    async fn create_record(&self, record: &MappedRecord) -> DeliveryOutcome {
        match self {
            Self::Salesforce(client) => client.create_record(record).await,
            Self::Zapier(client) => client.create_record(record).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Private
// ---------------------------------------------------------------------------

fn build_http_client() -> CrmResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(CRM_HTTP_TIMEOUT_SECS))
        .build()?)
}

fn normalize_base_url(raw: &str, field: &str) -> CrmResult<String> {
    let value = normalize_text_option(Some(raw.to_string()))
        .ok_or_else(|| CrmError::InvalidConfiguration(format!("{field} must not be empty")))?;
    if is_http_url(&value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(CrmError::InvalidConfiguration(format!(
            "{field} must include http:// or https://"
        )))
    }
}

fn string_field(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(value) => normalize_text_option(Some(value.clone())),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<Value>(body) {
        let first = match &payload {
            Value::Array(entries) => entries.first(),
            other => Some(other),
        };
        let message = first.and_then(|entry| {
            string_field(entry, "message").or_else(|| string_field(entry, "error"))
        });
        if let Some(message) = message {
            return format!("{} ({})", compact_text(&message), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact_text(trimmed), status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::Map;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::oneshot;

    use super::*;
    use crate::models::RecordId;

    /// Serve one canned response; the received request head is sent back.
    async fn spawn_one_shot_server(
        status_line: &str,
        body: &str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let address = listener.local_addr().expect("local address");
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let (sender, receiver) = oneshot::channel();

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request_buffer = [0_u8; 4096];
                let read = socket.read(&mut request_buffer).await.unwrap_or(0);
                let _ = sender.send(String::from_utf8_lossy(&request_buffer[..read]).into_owned());
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        (format!("http://{address}"), receiver)
    }

    fn sample_record(record_type: RecordType) -> MappedRecord {
        let mut fields = Map::new();
        fields.insert("LastName".to_string(), json!("Park"));
        MappedRecord {
            record_type,
            record_id: RecordId::new(),
            natural_key: Some("5550102030".to_string()),
            fields,
        }
    }

    #[test]
    fn salesforce_created_response_is_delivered() {
        let outcome = parse_salesforce_response(
            StatusCode::CREATED,
            r#"{"id":"00Q5e000001","success":true,"errors":[]}"#,
        );
        assert_eq!(
            outcome,
            DeliveryOutcome::Delivered {
                remote_id: Some("00Q5e000001".to_string())
            }
        );
    }

    #[test]
    fn salesforce_duplicate_error_is_duplicate() {
        let body = r#"[{
            "message": "Use one of these records?",
            "errorCode": "DUPLICATES_DETECTED",
            "duplicateResult": {
                "matchResults": [{"matchRecords": [{"record": {"Id": "00Q5e000042"}}]}]
            }
        }]"#;
        assert_eq!(
            parse_salesforce_response(StatusCode::BAD_REQUEST, body),
            DeliveryOutcome::Duplicate {
                existing_id: Some("00Q5e000042".to_string())
            }
        );
    }

    #[test]
    fn salesforce_other_errors_fail_with_message() {
        let outcome = parse_salesforce_response(
            StatusCode::BAD_REQUEST,
            r#"[{"message":"Required fields are missing: [LastName]","errorCode":"REQUIRED_FIELD_MISSING"}]"#,
        );
        assert_eq!(
            outcome,
            DeliveryOutcome::Failed {
                message: "Required fields are missing: [LastName] (400)".to_string(),
                status: Some(400),
            }
        );
    }

    #[test]
    fn zapier_response_variants() {
        assert_eq!(
            parse_zapier_response(StatusCode::OK, r#"{"status":"success","request_id":"abc"}"#),
            DeliveryOutcome::Delivered {
                remote_id: Some("abc".to_string())
            }
        );
        assert_eq!(
            parse_zapier_response(StatusCode::OK, r#"{"status":"duplicate","id":7}"#),
            DeliveryOutcome::Duplicate {
                existing_id: Some("7".to_string())
            }
        );
        assert_eq!(
            parse_zapier_response(StatusCode::CONFLICT, ""),
            DeliveryOutcome::Duplicate { existing_id: None }
        );
        assert_eq!(
            parse_zapier_response(StatusCode::OK, "not json"),
            DeliveryOutcome::Delivered { remote_id: None }
        );
        assert_eq!(
            parse_zapier_response(StatusCode::BAD_GATEWAY, ""),
            DeliveryOutcome::Failed {
                message: "HTTP 502".to_string(),
                status: Some(502),
            }
        );
    }

    #[test]
    fn configured_crm_requires_salesforce_token() {
        let error = ConfiguredCrm::from_settings(&CrmSettings::default(), &Credentials::default())
            .unwrap_err();
        assert!(error.to_string().contains("CREWSYNC_SALESFORCE_TOKEN"));
    }

    #[test]
    fn salesforce_debug_redacts_token() {
        let client = SalesforceClient::new(
            "https://example.my.salesforce.com/",
            "v59.0",
            "secret-token",
            "Lead",
            "Event",
        )
        .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("https://example.my.salesforce.com/services/data/v59.0/sobjects"));
    }

    #[tokio::test]
    async fn salesforce_client_posts_to_object_endpoint() {
        let (base_url, request) =
            spawn_one_shot_server("201 Created", r#"{"id":"00U1","success":true}"#).await;
        let client =
            SalesforceClient::new(&base_url, "59.0", "sf-token", "Lead", "Event").unwrap();

        let outcome = client
            .create_record(&sample_record(RecordType::Appointment))
            .await;
        assert_eq!(
            outcome,
            DeliveryOutcome::Delivered {
                remote_id: Some("00U1".to_string())
            }
        );

        let request = request.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("post /services/data/v59.0/sobjects/event/ http/1.1"));
        assert!(request.contains("authorization: bearer sf-token"));
    }

    #[tokio::test]
    async fn zapier_client_surfaces_server_errors() {
        let (base_url, _request) =
            spawn_one_shot_server("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let client = ZapierClient::new(&format!("{base_url}/hooks/catch/1/abc")).unwrap();

        let outcome = client.create_record(&sample_record(RecordType::Survey)).await;
        assert_eq!(
            outcome,
            DeliveryOutcome::Failed {
                message: "boom (500)".to_string(),
                status: Some(500),
            }
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "Requires CREWSYNC_LIVE_ZAPIER_WEBHOOK in process environment or .env"]
    async fn live_zapier_webhook_accepts_survey() {
        let _ = dotenvy::dotenv();

        let webhook_url = std::env::var("CREWSYNC_LIVE_ZAPIER_WEBHOOK")
            .expect("CREWSYNC_LIVE_ZAPIER_WEBHOOK should be set");
        let client = ZapierClient::new(&webhook_url).expect("webhook URL should be valid");

        let outcome = client.create_record(&sample_record(RecordType::Survey)).await;
        assert!(
            !matches!(outcome, DeliveryOutcome::Failed { .. }),
            "live webhook rejected the record: {outcome:?}"
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let client = ZapierClient::new(&format!("http://{address}/hook")).unwrap();
        let outcome = client.create_record(&sample_record(RecordType::Survey)).await;
        assert!(matches!(
            outcome,
            DeliveryOutcome::Failed { status: None, .. }
        ));
    }
}
