//! HTTP requests, responses, and the transports that carry them.
//!
//! Requests and responses are plain records so that they can be stored and replayed by
//! [`crate::mock::MockHttpClient`]. The only transport that talks to the network is
//! [`ReqwestClient`].

use bytes::{Bytes, BytesMut};
use eyre::Context;
use http::Method;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tracing::instrument;

/// Boundary between the parts of a multipart request body.
pub const MIME_BOUNDARY: &str = "END_OF_PART";

/// A parsed URI, absolute or relative to a server.
///
/// Query parameters are kept decoded and in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Uri {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub query: IndexMap<String, String>,
}

impl Uri {
    /// Parses an absolute URI (`http://host/path?q`) or an origin-form one (`/path?q`).
    pub fn parse(uri: &str) -> eyre::Result<Self> {
        let parsed: http::Uri = uri.parse().with_context(|| format!("parse URI '{uri}'"))?;
        let query = parsed
            .query()
            .map(|query| {
                form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect::<IndexMap<_, _>>()
            })
            .unwrap_or_default();
        let path = Some(parsed.path()).filter(|path| !path.is_empty());
        Ok(Self {
            scheme: parsed.scheme_str().map(str::to_string),
            host: parsed.host().map(str::to_string),
            port: parsed.port_u16(),
            path: path.map(str::to_string),
            query,
        })
    }

    /// Adds or replaces a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// The path and encoded query, e.g. `/feeds/api/videos?vq=google+news`.
    pub fn relative_path(&self) -> String {
        let mut relative = self.path.clone().unwrap_or_else(|| "/".to_string());
        if !self.query.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.query)
                .finish();
            relative.push('?');
            relative.push_str(&query);
        }
        relative
    }

    /// Fills in the scheme and host if this URI is relative.
    pub fn resolve_against(mut self, scheme: &str, host: &str) -> Self {
        if self.host.is_none() {
            self.host = Some(host.to_string());
            self.port = None;
        }
        if self.scheme.is_none() {
            self.scheme = Some(scheme.to_string());
        }
        self
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            write!(f, "{}://{}", self.scheme.as_deref().unwrap_or("http"), host)?;
            if let Some(port) = self.port {
                write!(f, ":{port}")?;
            }
        }
        f.write_str(&self.relative_path())
    }
}

/// Appends `url_params` to `uri`, in order.
///
/// Parameters are joined with `&` if `uri` already carries a query, and introduced with `?`
/// otherwise. With `escape_params`, keys and values are form-encoded (spaces become `+`);
/// without it they are copied verbatim.
pub fn build_uri(uri: &str, url_params: &[(&str, &str)], escape_params: bool) -> String {
    let mut built = uri.to_string();
    let mut separator = if uri.contains('?') { '&' } else { '?' };
    for (key, value) in url_params {
        built.push(separator);
        separator = '&';
        if escape_params {
            built.extend(form_urlencoded::byte_serialize(key.as_bytes()));
            built.push('=');
            built.extend(form_urlencoded::byte_serialize(value.as_bytes()));
        } else {
            built.push_str(key);
            built.push('=');
            built.push_str(value);
        }
    }
    built
}

mod method_serde {
    use http::Method;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub(super) fn serialize<S: Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(method.as_str())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Method, D::Error> {
        let method = String::deserialize(deserializer)?;
        Method::from_bytes(method.as_bytes()).map_err(D::Error::custom)
    }
}

/// One part of a request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyPart {
    pub content_type: String,
    pub data: Bytes,
}

/// An HTTP request as handed to an [`HttpClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub uri: Uri,
    #[serde(with = "method_serde")]
    pub method: Method,
    pub headers: IndexMap<String, String>,
    pub body_parts: Vec<BodyPart>,
}

impl HttpRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            uri,
            method,
            headers: IndexMap::new(),
            body_parts: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a part to the body.
    ///
    /// A single part is sent as-is. Once a second part is added the body becomes a
    /// `multipart/related` payload with every part carrying its own content type.
    pub fn add_body_part(&mut self, data: impl Into<Bytes>, content_type: impl Into<String>) {
        self.body_parts.push(BodyPart {
            content_type: content_type.into(),
            data: data.into(),
        });
    }

    /// Value of the request's `Content-Type` header, derived from its body parts.
    pub fn content_type(&self) -> Option<String> {
        match self.body_parts.as_slice() {
            [] => None,
            [single] => Some(single.content_type.clone()),
            _ => Some(format!("multipart/related; boundary=\"{MIME_BOUNDARY}\"")),
        }
    }

    /// The assembled request body.
    pub fn body(&self) -> Bytes {
        match self.body_parts.as_slice() {
            [] => Bytes::new(),
            [single] => single.data.clone(),
            parts => {
                let mut body = BytesMut::from(&b"Media multipart posting"[..]);
                for part in parts {
                    body.extend_from_slice(format!("\r\n--{MIME_BOUNDARY}\r\n").as_bytes());
                    body.extend_from_slice(
                        format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes(),
                    );
                    body.extend_from_slice(&part.data);
                }
                body.extend_from_slice(format!("\r\n--{MIME_BOUNDARY}--").as_bytes());
                body.freeze()
            }
        }
    }
}

/// An HTTP response as returned by an [`HttpClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub headers: IndexMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            headers: IndexMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Looks up a header, ignoring the case of its name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body as UTF-8 text.
    pub fn text(&self) -> eyre::Result<&str> {
        std::str::from_utf8(&self.body).context("response body is not UTF-8")
    }
}

/// A transport that can carry an [`HttpRequest`].
pub trait HttpClient {
    fn request(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = eyre::Result<HttpResponse>> + Send;
}

/// Transport over a real network connection.
///
/// Redirects are not followed here; callers see the 3xx response and decide for themselves.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        let client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("building reqwest client should not fail");
        Self { client }
    }

    /// Wraps an existing client. Its redirect policy is left untouched.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestClient {
    #[instrument(skip_all, fields(method = %request.method, uri = %request.uri))]
    async fn request(&self, request: HttpRequest) -> eyre::Result<HttpResponse> {
        if request.uri.host.is_none() {
            eyre::bail!("cannot send a request to '{}' without a host", request.uri);
        }
        let url = request.uri.to_string();

        let mut builder = self.client.request(request.method.clone(), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(content_type) = request.content_type() {
            if request.body_parts.len() > 1 {
                builder = builder.header("MIME-version", "1.0");
            }
            builder = builder
                .header(http::header::CONTENT_TYPE, content_type)
                .body(request.body());
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("send {} request to {}", request.method, url))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .with_context(|| format!("read response body from {url}"))?;

        tracing::trace!(status = status.as_u16(), bytes = body.len(), "received response");

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}
