//! HTTP implementation of the chat transport.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Client;

use crate::error::ChatError;

use super::orchestrator::ChatTransport;
use super::protocol::ChatRequest;

pub struct HttpChatTransport {
    client: Client,
    endpoint: String,
}

impl HttpChatTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn open(
        &self,
        request: ChatRequest,
    ) -> Result<BoxStream<'static, Result<Vec<u8>, ChatError>>, ChatError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Http {
                status: status.as_u16(),
            });
        }

        let stream = futures::stream::unfold(response, |mut response| async move {
            match response.chunk().await {
                Ok(Some(bytes)) => Some((Ok(bytes.to_vec()), response)),
                Ok(None) => None,
                Err(e) => Some((Err(ChatError::Transport(e.to_string())), response)),
            }
        });
        Ok(stream.boxed())
    }
}
