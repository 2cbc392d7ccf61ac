//! Network reachability check run before each queue pass.

use std::future::Future;
use std::time::Duration;

const PROBE_TIMEOUT_SECS: u64 = 5;

/// Reports whether the remote side is currently reachable
pub trait ReachabilityProbe: Send + Sync {
    fn is_reachable(&self) -> impl Future<Output = bool> + Send;
}

/// `HEAD` request against a configured URL.
///
/// Any HTTP response, including error statuses, counts as reachable; only
/// transport failures mean offline. Without a URL the probe always reports
/// online.
#[derive(Debug, Clone)]
pub struct HttpReachabilityProbe {
    client: reqwest::Client,
    url: Option<String>,
}

impl HttpReachabilityProbe {
    pub fn new(url: Option<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            url: crate::util::normalize_text_option(url),
        })
    }
}

impl ReachabilityProbe for HttpReachabilityProbe {
    async fn is_reachable(&self) -> bool {
        let Some(url) = &self.url else {
            return true;
        };

        match self.client.head(url).send().await {
            Ok(response) => {
                tracing::debug!("Reachability probe {url} answered {}", response.status());
                true
            }
            Err(error) => {
                tracing::debug!("Reachability probe {url} failed: {error}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn probe_without_url_is_online() {
        let probe = HttpReachabilityProbe::new(None).unwrap();
        assert!(probe.is_reachable().await);
    }

    #[tokio::test]
    async fn any_http_response_counts_as_reachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request_buffer = [0_u8; 1024];
                let _ = socket.read(&mut request_buffer).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    )
                    .await;
            }
        });

        let probe = HttpReachabilityProbe::new(Some(format!("http://{address}/health"))).unwrap();
        assert!(probe.is_reachable().await);
    }

    #[tokio::test]
    async fn refused_connection_is_offline() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let probe = HttpReachabilityProbe::new(Some(format!("http://{address}/health"))).unwrap();
        assert!(!probe.is_reachable().await);
    }
}
