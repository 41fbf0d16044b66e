//! HTTP client for the workflow backends.
//!
//! One `reqwest::Client` serves both backends. Every request carries the
//! tunnel warning-suppression header as a default header.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use tracing::debug;

use super::wire::{BackendResponse, ExtractAck, ExtractRequest, ProcessRequest, SubmitRequest};
use super::IntakeBackend;
use crate::completion::{StatusPayload, StatusSource, StatusStream, sse};
use crate::config::{IntakeConfig, TUNNEL_SKIP_HEADER};
use crate::error::{ChannelError, TransportError};
use crate::intake::WorkflowKind;

/// Backend client over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: Arc<IntakeConfig>,
}

impl HttpBackend {
    pub fn new(config: IntakeConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(TUNNEL_SKIP_HEADER.0, HeaderValue::from_static(TUNNEL_SKIP_HEADER.1));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::Request {
                endpoint: "client".into(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    async fn post_json<T: serde::Serialize + Sync>(
        &self,
        endpoint: String,
        body: &T,
    ) -> Result<BackendResponse, TransportError> {
        debug!(endpoint = %endpoint, "POST");
        let response = self
            .client
            .post(&endpoint)
            .timeout(self.config.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        read_response(endpoint, response).await
    }
}

async fn read_response(
    endpoint: String,
    response: reqwest::Response,
) -> Result<BackendResponse, TransportError> {
    let status = response.status().as_u16();
    let raw = response.text().await.map_err(|e| TransportError::Request {
        endpoint: endpoint.clone(),
        reason: format!("Failed to read response body: {e}"),
    })?;
    debug!(endpoint = %endpoint, status, "Backend responded");
    Ok(BackendResponse::new(endpoint, status, raw))
}

#[async_trait]
impl IntakeBackend for HttpBackend {
    async fn extract(
        &self,
        workflow: WorkflowKind,
        request: &ExtractRequest,
    ) -> Result<ExtractAck, TransportError> {
        let endpoint = self.config.endpoint(workflow, "extract");

        let file = Part::bytes(request.content.clone())
            .file_name(request.filename.clone())
            .mime_str("application/pdf")
            .map_err(|e| TransportError::Request {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        let mut form = Form::new().part("file", file);
        for (name, bytes) in &request.extras {
            form = form.part(
                "extra_attachments",
                Part::bytes(bytes.clone()).file_name(name.clone()),
            );
        }
        let metadata =
            serde_json::to_string(&request.metadata).map_err(|e| TransportError::Request {
                endpoint: endpoint.clone(),
                reason: format!("Failed to encode email_metadata: {e}"),
            })?;
        form = form.text("email_metadata", metadata);

        debug!(endpoint = %endpoint, extras = request.extras.len(), "POST multipart");
        let response = self
            .client
            .post(&endpoint)
            .timeout(self.config.request_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Request {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        let response = read_response(endpoint, response).await?;
        if !(200..300).contains(&response.status) {
            return Err(TransportError::Status {
                endpoint: response.endpoint,
                status: response.status,
                body: response.raw,
            });
        }
        serde_json::from_str(&response.raw).map_err(|e| TransportError::MalformedBody {
            endpoint: response.endpoint,
            reason: e.to_string(),
        })
    }

    async fn process(
        &self,
        workflow: WorkflowKind,
        request: &ProcessRequest,
    ) -> Result<BackendResponse, TransportError> {
        self.post_json(self.config.endpoint(workflow, "process"), request)
            .await
    }

    async fn submit(
        &self,
        workflow: WorkflowKind,
        request: &SubmitRequest,
    ) -> Result<BackendResponse, TransportError> {
        self.post_json(self.config.endpoint(workflow, "submit"), request)
            .await
    }
}

#[async_trait]
impl StatusSource for HttpBackend {
    async fn subscribe(&self, session_id: &str) -> Result<StatusStream, ChannelError> {
        let url = self.config.stream_url(session_id);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| ChannelError::Connect {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ChannelError::Status {
                url,
                status: response.status().as_u16(),
            });
        }
        debug!(url = %url, "Subscribed to completion stream");

        let stream_url = url.clone();
        let chunks = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| ChannelError::Stream {
                url: stream_url.clone(),
                reason: e.to_string(),
            })
        });
        let events = sse::data_events(chunks)
            .map(|event| event.and_then(|data| StatusPayload::parse(&data)));
        Ok(Box::pin(events))
    }

    async fn poll(&self, session_id: &str) -> Result<StatusPayload, ChannelError> {
        let url = self.config.status_url(session_id);
        let response = self
            .client
            .get(&url)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| ChannelError::Connect {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let raw = response.text().await.map_err(|e| ChannelError::Stream {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        StatusPayload::parse(&raw)
    }
}
