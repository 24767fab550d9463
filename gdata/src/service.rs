//! A client for any GData service, and the queries used to build feed URIs.

use crate::data::AtomFeed;
use crate::paging::PagedStream;
use atom::AtomElement;
use atom::http::{BodyPart, HttpClient, HttpRequest, HttpResponse, ReqwestClient, Uri, build_uri};
use bytes::Bytes;
use eyre::Context;
use http::Method;
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::path::Path;
use tokio_stream::Stream;
use tracing::instrument;

pub const ATOM_CONTENT_TYPE: &str = "application/atom+xml";

/// How many redirects a single request follows before giving up.
pub const MAX_REDIRECTS: usize = 4;

/// A request the server answered with a non-success status.
///
/// Returned inside an [`eyre::Report`]; use `downcast_ref::<RequestError>()` to inspect it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("server responded {status} {reason}: {body}")]
pub struct RequestError {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl RequestError {
    fn from_response(response: &HttpResponse) -> Self {
        Self {
            status: response.status,
            reason: response.reason.clone(),
            body: String::from_utf8_lossy(&response.body).into_owned(),
        }
    }
}

/// A media file to upload alongside (or instead of) an Atom entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    pub data: Bytes,
    pub content_type: String,
    /// Sent to the server as the `Slug` header.
    pub file_name: Option<String>,
}

impl MediaSource {
    pub fn new(data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Reads a file from disk, naming the upload after the file.
    pub async fn from_file(path: impl AsRef<Path>, content_type: impl Into<String>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("read media file {}", path.display()))?;
        let mut source = Self::new(data, content_type);
        source.file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(source)
    }
}

/// Talks Atom to one GData server.
///
/// Relative URIs are resolved against the service's server. Every request carries the
/// service's additional headers and, if set, its `Authorization` header.
#[derive(Debug)]
pub struct GDataService<C = ReqwestClient> {
    client: C,
    server: String,
    scheme: String,
    additional_headers: IndexMap<String, String>,
    auth_header: Option<String>,
}

impl GDataService<ReqwestClient> {
    /// A service for `server` over the network.
    pub fn for_server(server: impl Into<String>) -> Self {
        Self::new(ReqwestClient::new(), server)
    }
}

impl<C> GDataService<C> {
    pub fn new(client: C, server: impl Into<String>) -> Self {
        Self {
            client,
            server: server.into(),
            scheme: "http".to_string(),
            additional_headers: IndexMap::new(),
            auth_header: None,
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Sets the `Authorization` header value sent with every request.
    ///
    /// How that value is obtained is up to the caller.
    pub fn with_auth_header(mut self, value: impl Into<String>) -> Self {
        self.auth_header = Some(value.into());
        self
    }

    pub fn set_auth_header(&mut self, value: Option<String>) {
        self.auth_header = value;
    }

    pub fn auth_header(&self) -> Option<&str> {
        self.auth_header.as_deref()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.additional_headers.insert(name.into(), value.into());
    }

    pub fn additional_headers(&self) -> &IndexMap<String, String> {
        &self.additional_headers
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Builds a request to `uri` carrying this service's headers.
    pub fn build_request(&self, method: Method, uri: &str) -> eyre::Result<HttpRequest> {
        let uri = Uri::parse(uri)?.resolve_against(&self.scheme, &self.server);
        let mut request = HttpRequest::new(method, uri);
        for (name, value) in &self.additional_headers {
            request.headers.insert(name.clone(), value.clone());
        }
        if let Some(auth) = &self.auth_header {
            request.headers.insert("Authorization".to_string(), auth.clone());
        }
        Ok(request)
    }
}

impl<C> GDataService<C>
where
    C: HttpClient + Sync,
{
    /// Sends `request`, following redirects.
    ///
    /// Calendar answers the first request of a session with a redirect to the same URI plus a
    /// `gsessionid` parameter, so up to [`MAX_REDIRECTS`] redirects are followed. Statuses
    /// outside 2xx become a [`RequestError`].
    #[instrument(skip_all, fields(method = %request.method, uri = %request.uri))]
    pub async fn send(&self, mut request: HttpRequest) -> eyre::Result<HttpResponse> {
        let mut redirects = 0;
        loop {
            let response = self
                .client
                .request(request.clone())
                .await
                .with_context(|| format!("{} {}", request.method, request.uri))?;

            if matches!(response.status, 301 | 302 | 303 | 307) {
                if redirects == MAX_REDIRECTS {
                    tracing::warn!(redirects, "giving up on redirects");
                    return Err(RequestError {
                        status: response.status,
                        reason: response.reason.clone(),
                        body: format!("redirect received after following {redirects} redirects"),
                    }
                    .into());
                }
                let location = response.header("Location").ok_or_else(|| {
                    eyre::eyre!("{} redirect without a Location header", response.status)
                })?;
                let scheme = request.uri.scheme.clone().unwrap_or_else(|| self.scheme.clone());
                let host = request.uri.host.clone().unwrap_or_else(|| self.server.clone());
                request.uri = Uri::parse(location)
                    .context("parse redirect location")?
                    .resolve_against(&scheme, &host);
                redirects += 1;
                tracing::debug!(uri = %request.uri, redirects, "following redirect");
                continue;
            }

            if !response.is_success() {
                tracing::debug!(status = response.status, "request failed");
                return Err(RequestError::from_response(&response).into());
            }
            return Ok(response);
        }
    }

    /// Sends a bodiless request to `uri`.
    pub async fn request(&self, method: Method, uri: &str) -> eyre::Result<HttpResponse> {
        let request = self.build_request(method, uri)?;
        self.send(request).await
    }

    /// Fetches `uri` and binds the response as `T`.
    #[instrument(skip(self))]
    pub async fn get<T: AtomElement>(&self, uri: &str) -> eyre::Result<T> {
        let response = self.request(Method::GET, uri).await?;
        parse_response(&response).with_context(|| format!("parse response from {uri}"))
    }

    /// Posts `entry` to `uri`, returning what the server made of it.
    #[instrument(skip(self, entry))]
    pub async fn post<T, R>(&self, entry: &T, uri: &str) -> eyre::Result<R>
    where
        T: AtomElement,
        R: AtomElement,
    {
        self.send_entry(Method::POST, entry, uri).await
    }

    /// Replaces the entry at `uri` (usually its edit link) with `entry`.
    #[instrument(skip(self, entry))]
    pub async fn put<T, R>(&self, entry: &T, uri: &str) -> eyre::Result<R>
    where
        T: AtomElement,
        R: AtomElement,
    {
        self.send_entry(Method::PUT, entry, uri).await
    }

    async fn send_entry<T, R>(&self, method: Method, entry: &T, uri: &str) -> eyre::Result<R>
    where
        T: AtomElement,
        R: AtomElement,
    {
        let mut request = self.build_request(method, uri)?;
        request.add_body_part(entry.to_xml()?, ATOM_CONTENT_TYPE);
        let response = self.send(request).await?;
        parse_response(&response).with_context(|| format!("parse response from {uri}"))
    }

    /// Posts a media file to `uri`, with `entry` as its metadata if given.
    ///
    /// With an entry the body is `multipart/related`, the entry first.
    #[instrument(skip(self, entry, media), fields(bytes = media.data.len()))]
    pub async fn post_media<T, R>(
        &self,
        entry: Option<&T>,
        media: &MediaSource,
        uri: &str,
    ) -> eyre::Result<R>
    where
        T: AtomElement,
        R: AtomElement,
    {
        let mut request = self.build_request(Method::POST, uri)?;
        if let Some(entry) = entry {
            request.add_body_part(entry.to_xml()?, ATOM_CONTENT_TYPE);
        }
        request.body_parts.push(BodyPart {
            content_type: media.content_type.clone(),
            data: media.data.clone(),
        });
        if let Some(file_name) = &media.file_name {
            request.headers.insert("Slug".to_string(), file_name.clone());
        }
        let response = self.send(request).await?;
        parse_response(&response).with_context(|| format!("parse response from {uri}"))
    }

    /// Deletes the resource at `uri`.
    #[instrument(skip(self))]
    pub async fn delete(&self, uri: &str) -> eyre::Result<bool> {
        let response = self.request(Method::DELETE, uri).await?;
        tracing::debug!(status = response.status, "deleted");
        Ok(true)
    }

    /// Streams every entry of the feed at `uri`, following `next` links across pages.
    pub fn feed_entries<F>(&self, uri: &str) -> impl Stream<Item = eyre::Result<F::Entry>> + use<'_, C, F>
    where
        F: AtomFeed,
    {
        let first = uri.to_string();
        PagedStream::new(move |next_href: Option<String>| {
            let uri = next_href.unwrap_or_else(|| first.clone());
            async move {
                let feed: F = self.get(&uri).await?;
                let next_href = feed.next_href().map(str::to_string);
                Ok((VecDeque::from(feed.into_entries()), next_href))
            }
        })
    }
}

fn parse_response<T: AtomElement>(response: &HttpResponse) -> eyre::Result<T> {
    T::from_xml(response.text()?)
}

/// Parameters of a feed request, turned into a URI with [`Query::to_uri`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// The feed's path or URI.
    pub feed: String,
    /// Category filters, rendered as `/-/a/b` after the feed.
    pub categories: Vec<String>,
    pub text_query: Option<String>,
    pub author: Option<String>,
    pub alt: Option<String>,
    pub updated_min: Option<String>,
    pub updated_max: Option<String>,
    pub published_min: Option<String>,
    pub published_max: Option<String>,
    pub start_index: Option<u32>,
    pub max_results: Option<u32>,
    pub orderby: Option<String>,
    /// Any other parameters, sent after the ones above.
    pub params: IndexMap<String, String>,
}

impl Query {
    pub fn new(feed: impl Into<String>) -> Self {
        Self {
            feed: feed.into(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn to_uri(&self) -> String {
        let mut feed = self.feed.clone();
        if !self.categories.is_empty() {
            feed.push_str("/-");
            for category in &self.categories {
                feed.push('/');
                feed.extend(form_urlencoded::byte_serialize(category.as_bytes()));
            }
        }

        let start_index = self.start_index.map(|n| n.to_string());
        let max_results = self.max_results.map(|n| n.to_string());
        let named = [
            ("q", self.text_query.as_deref()),
            ("author", self.author.as_deref()),
            ("alt", self.alt.as_deref()),
            ("updated-min", self.updated_min.as_deref()),
            ("updated-max", self.updated_max.as_deref()),
            ("published-min", self.published_min.as_deref()),
            ("published-max", self.published_max.as_deref()),
            ("start-index", start_index.as_deref()),
            ("max-results", max_results.as_deref()),
            ("orderby", self.orderby.as_deref()),
        ];
        let params: Vec<(&str, &str)> = named
            .into_iter()
            .filter_map(|(name, value)| Some((name, value?)))
            .chain(
                self.params
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str())),
            )
            .collect();
        build_uri(&feed, &params, true)
    }
}
