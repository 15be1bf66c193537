use crate::domain::ports::{FetchRequest, RawPayload, Transport};
use crate::utils::error::{IngestError, Result};
use async_trait::async_trait;
use reqwest::Client;

#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &FetchRequest) -> Result<RawPayload> {
        let mut builder = self.client.get(&request.endpoint);

        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        tracing::debug!("📡 GET {}", request.endpoint);
        let response = builder
            .send()
            .await
            .map_err(|e| IngestError::transport(&request.endpoint, e))?;

        let status = response.status();
        tracing::debug!("📡 {} responded with {}", request.endpoint, status);

        if !status.is_success() {
            return Err(IngestError::transport(
                &request.endpoint,
                format!("request failed with status: {}", status),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| IngestError::transport(&request.endpoint, e))?;

        Ok(RawPayload::new(bytes.to_vec()))
    }
}
