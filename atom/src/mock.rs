//! Transports for testing code that talks to GData servers.
//!
//! - [`MockHttpClient`] replays stored responses, or records them through a real client.
//! - [`EchoHttpClient`] sends back what it was given, so tests can inspect the request.
//! - [`SettableHttpClient`] answers every request with the same response.

use crate::http::{HttpClient, HttpRequest, HttpResponse, ReqwestClient};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;

/// A stored request together with the response it got.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub request: HttpRequest,
    pub response: HttpResponse,
}

/// Record/replay transport.
///
/// Without a real client the mock is in replay mode: each request is answered with the first
/// stored response whose request matches. With a real client every request is forwarded,
/// and the (scrubbed) exchange is appended to the recordings.
#[derive(Debug, Default)]
pub struct MockHttpClient<C = ReqwestClient> {
    recordings: Mutex<Vec<Recording>>,
    real_client: Option<C>,
}

impl<C> MockHttpClient<C> {
    /// A mock in replay mode with no recordings yet.
    pub fn new() -> Self {
        Self {
            recordings: Mutex::new(Vec::new()),
            real_client: None,
        }
    }

    /// A mock in replay mode with the given recordings.
    pub fn with_recordings(recordings: Vec<Recording>) -> Self {
        Self {
            recordings: Mutex::new(recordings),
            real_client: None,
        }
    }

    /// A mock in record mode.
    pub fn recording_through(real_client: C) -> Self {
        Self {
            recordings: Mutex::new(Vec::new()),
            real_client: Some(real_client),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.real_client.is_some()
    }

    /// Stores `response` as the answer to requests that match `request`.
    pub async fn add_response(&self, request: &HttpRequest, response: HttpResponse) {
        let mut request = request.clone();
        scrub_request(&mut request);
        self.recordings
            .lock()
            .await
            .push(Recording { request, response });
    }

    pub async fn recordings(&self) -> Vec<Recording> {
        self.recordings.lock().await.clone()
    }

    /// Writes the recordings to `name` in the temporary directory.
    pub async fn save_recordings(&self, name: &str) -> Result<()> {
        let path = recording_path(name);
        let recordings = self.recordings.lock().await;
        let json = serde_json::to_vec_pretty(&*recordings).context("serialize recordings")?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("write recordings to {}", path.display()))?;
        tracing::debug!(path = %path.display(), count = recordings.len(), "saved recordings");
        Ok(())
    }

    /// Replaces the recordings with those stored in `name` in the temporary directory.
    pub async fn load_recordings(&self, name: &str) -> Result<()> {
        let path = recording_path(name);
        let json = tokio::fs::read(&path)
            .await
            .with_context(|| format!("read recordings from {}", path.display()))?;
        let loaded: Vec<Recording> = serde_json::from_slice(&json)
            .with_context(|| format!("parse recordings in {}", path.display()))?;
        tracing::debug!(path = %path.display(), count = loaded.len(), "loaded recordings");
        *self.recordings.lock().await = loaded;
        Ok(())
    }

    pub async fn delete_recordings(&self, name: &str) -> Result<()> {
        let path = recording_path(name);
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("delete recordings at {}", path.display()))
    }

    /// Replays `name` if it has been saved before, and records through `client` otherwise.
    pub async fn load_or_use_client(&mut self, name: &str, client: C) -> Result<()> {
        let path = recording_path(name);
        let exists = tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("check for recordings at {}", path.display()))?;
        if exists {
            self.load_recordings(name).await
        } else {
            self.real_client = Some(client);
            Ok(())
        }
    }
}

impl<C> HttpClient for MockHttpClient<C>
where
    C: HttpClient + Send + Sync,
{
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut scrubbed = request.clone();
        scrub_request(&mut scrubbed);

        let Some(real_client) = &self.real_client else {
            let recordings = self.recordings.lock().await;
            return recordings
                .iter()
                .find(|recording| match_request(&recording.request, &scrubbed))
                .map(|recording| recording.response.clone())
                .ok_or_else(|| {
                    eyre::eyre!(
                        "no recorded response for {} {}",
                        scrubbed.method,
                        scrubbed.uri
                    )
                });
        };

        let mut response = real_client.request(request).await?;
        scrub_response(&mut response);
        tracing::trace!(method = %scrubbed.method, uri = %scrubbed.uri, status = response.status, "recorded response");
        self.recordings.lock().await.push(Recording {
            request: scrubbed,
            response: response.clone(),
        });
        Ok(response)
    }
}

fn recording_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(name)
}

/// Whether `request` is close enough to `stored` to be answered with the stored response.
///
/// Query parameters other than `gsessionid`, the body, the port and the headers are all
/// ignored.
pub fn match_request(stored: &HttpRequest, request: &HttpRequest) -> bool {
    if stored.uri.host.is_some() && stored.uri.host != request.uri.host {
        return false;
    }
    if stored.uri.path != request.uri.path || stored.method != request.method {
        return false;
    }
    match (
        stored.uri.query.get("gsessionid"),
        request.uri.query.get("gsessionid"),
    ) {
        (None, None) => true,
        (Some(stored), Some(requested)) => stored == requested,
        _ => false,
    }
}

/// Removes credentials from a request before it is stored.
pub fn scrub_request(request: &mut HttpRequest) {
    request
        .headers
        .retain(|name, _| !name.eq_ignore_ascii_case("authorization"));
}

/// Removes session cookies from a response before it is stored.
pub fn scrub_response(response: &mut HttpResponse) {
    response
        .headers
        .retain(|name, _| !name.eq_ignore_ascii_case("set-cookie"));
}

/// Responds `200 OK` with the request's body, echoing its headers and adding `Echo-*`
/// headers that describe where the request was going.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHttpClient;

impl HttpClient for EchoHttpClient {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut response = HttpResponse::new(200, "OK").with_body(request.body());
        for (name, value) in &request.headers {
            response = response.with_header(name, value);
        }
        if let Some(content_type) = request.content_type() {
            response = response.with_header("Content-Type", content_type);
        }
        let host = request.uri.host.as_deref().unwrap_or("None");
        let port = request
            .uri
            .port
            .map_or_else(|| "None".to_string(), |port| port.to_string());
        Ok(response
            .with_header("Echo-Host", format!("{host}:{port}"))
            .with_header("Echo-Uri", request.uri.relative_path())
            .with_header(
                "Echo-Scheme",
                request.uri.scheme.as_deref().unwrap_or("None"),
            )
            .with_header("Echo-Method", request.method.as_str()))
    }
}

/// Answers every request with one fixed response.
#[derive(Debug)]
pub struct SettableHttpClient {
    response: Mutex<HttpResponse>,
}

impl SettableHttpClient {
    pub fn new(response: HttpResponse) -> Self {
        Self {
            response: Mutex::new(response),
        }
    }

    pub async fn set_response(&self, response: HttpResponse) {
        *self.response.lock().await = response;
    }
}

impl HttpClient for SettableHttpClient {
    async fn request(&self, _request: HttpRequest) -> Result<HttpResponse> {
        Ok(self.response.lock().await.clone())
    }
}
