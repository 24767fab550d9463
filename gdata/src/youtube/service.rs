use super::{
    CONTACT_CATEGORY_SCHEME, ContactEntry, ContactFeed, Description, PlaylistEntry,
    PlaylistFeed, PlaylistVideoEntry, PlaylistVideoFeed, Position, QueryString,
    SUBSCRIPTION_CATEGORY_SCHEME, State, Status, SubscriptionEntry, SubscriptionFeed, UserEntry,
    Username, VideoCommentEntry, VideoCommentFeed, VideoEntry, VideoFeed, VideoResponseEntry,
    VideoResponseFeed,
};
use crate::data::{GDataEntry, Rating};
use crate::service::{ATOM_CONTENT_TYPE, GDataService, MediaSource, Query};
use atom::http::{HttpClient, ReqwestClient};
use atom::{AtomElement, LinkFinder};
use eyre::{Context, bail};
use http::Method;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use tracing::instrument;

pub const YOUTUBE_SERVER: &str = "gdata.youtube.com";

pub const VIDEO_FEED_URI: &str = "http://gdata.youtube.com/feeds/api/videos";
pub const USER_FEED_URI: &str = "http://gdata.youtube.com/feeds/api/users";
pub const STANDARD_FEEDS_URI: &str = "http://gdata.youtube.com/feeds/api/standardfeeds";
pub const UPLOAD_URI: &str = "http://uploads.gdata.youtube.com/feeds/api/users";
pub const UPLOAD_TOKEN_URI: &str = "http://gdata.youtube.com/action/GetUploadToken";

/// The user the request's credentials belong to.
const DEFAULT_USER: &str = "default";

/// The site-wide video lists YouTube maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFeed {
    TopRated,
    MostViewed,
    RecentlyFeatured,
    WatchOnMobile,
    TopFavorites,
    MostRecent,
    MostDiscussed,
    MostLinked,
    MostResponded,
}

impl StandardFeed {
    pub const ALL: [StandardFeed; 9] = [
        Self::TopRated,
        Self::MostViewed,
        Self::RecentlyFeatured,
        Self::WatchOnMobile,
        Self::TopFavorites,
        Self::MostRecent,
        Self::MostDiscussed,
        Self::MostLinked,
        Self::MostResponded,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::TopRated => "top_rated",
            Self::MostViewed => "most_viewed",
            Self::RecentlyFeatured => "recently_featured",
            Self::WatchOnMobile => "watch_on_mobile_devices",
            Self::TopFavorites => "top_favorites",
            Self::MostRecent => "most_recent",
            Self::MostDiscussed => "most_discussed",
            Self::MostLinked => "most_linked",
            Self::MostResponded => "most_responded",
        }
    }

    pub fn uri(self) -> String {
        format!("{STANDARD_FEEDS_URI}/{}", self.name())
    }
}

impl fmt::Display for StandardFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StandardFeed {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|feed| feed.name() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|feed| feed.name()).collect();
                eyre::eyre!("unknown standard feed '{s}', expected one of {}", known.join(", "))
            })
    }
}

/// Client for the YouTube data API.
///
/// Derefs to the underlying [`GDataService`] for configuration and generic requests.
#[derive(Debug)]
pub struct YouTubeService<C = ReqwestClient> {
    service: GDataService<C>,
    developer_key: Option<String>,
    client_id: Option<String>,
}

impl<C> YouTubeService<C> {
    pub fn new(client: C) -> Self {
        Self::from_service(GDataService::new(client, YOUTUBE_SERVER))
    }

    pub fn from_service(service: GDataService<C>) -> Self {
        Self {
            service,
            developer_key: None,
            client_id: None,
        }
    }

    /// Sends `X-GData-Key: key=<developer_key>` with every request.
    pub fn with_developer_key(mut self, developer_key: impl Into<String>) -> Self {
        let developer_key = developer_key.into();
        self.service
            .set_header("X-GData-Key", format!("key={developer_key}"));
        self.developer_key = Some(developer_key);
        self
    }

    /// Sends `X-GData-Client: <client_id>` with every request.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        let client_id = client_id.into();
        self.service.set_header("X-GData-Client", client_id.clone());
        self.client_id = Some(client_id);
        self
    }

    /// Sets the `Authorization` header value sent with every request.
    pub fn with_auth_header(mut self, value: impl Into<String>) -> Self {
        self.service.set_auth_header(Some(value.into()));
        self
    }

    pub fn developer_key(&self) -> Option<&str> {
        self.developer_key.as_deref()
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn into_service(self) -> GDataService<C> {
        self.service
    }
}

impl<C> Deref for YouTubeService<C> {
    type Target = GDataService<C>;

    fn deref(&self) -> &GDataService<C> {
        &self.service
    }
}

impl<C> DerefMut for YouTubeService<C> {
    fn deref_mut(&mut self) -> &mut GDataService<C> {
        &mut self.service
    }
}

fn user_uri(username: &str, feed: &str) -> String {
    format!("{USER_FEED_URI}/{username}/{feed}")
}

/// The feed of videos `username` has uploaded.
pub fn user_uploads_uri(username: &str) -> String {
    user_uri(username, "uploads")
}

fn video_uri(video_id: &str, feed: &str) -> String {
    format!("{VIDEO_FEED_URI}/{video_id}/{feed}")
}

fn edit_href(entry: &VideoEntry) -> eyre::Result<&str> {
    match entry.edit_link().and_then(|link| link.href.as_deref()) {
        Some(href) => Ok(href),
        None => bail!("video entry has no edit link"),
    }
}

fn require_video_id(entry: &VideoEntry) -> eyre::Result<&str> {
    entry
        .video_id()
        .ok_or_else(|| eyre::eyre!("video entry has no video id"))
}

impl<C> YouTubeService<C>
where
    C: HttpClient + Sync,
{
    pub async fn get_standard_feed(&self, feed: StandardFeed) -> eyre::Result<VideoFeed> {
        self.get(&feed.uri()).await
    }

    pub async fn get_video_feed(&self, uri: &str) -> eyre::Result<VideoFeed> {
        self.get(uri).await
    }

    pub async fn get_video_entry(&self, uri: &str) -> eyre::Result<VideoEntry> {
        self.get(uri).await
    }

    pub async fn get_video_entry_by_id(&self, video_id: &str) -> eyre::Result<VideoEntry> {
        self.get(&format!("{VIDEO_FEED_URI}/{video_id}")).await
    }

    /// The videos a user has uploaded.
    pub async fn get_user_uploads_feed(&self, uri: &str) -> eyre::Result<VideoFeed> {
        self.get(uri).await
    }

    pub async fn get_user_uploads_by_username(&self, username: &str) -> eyre::Result<VideoFeed> {
        self.get(&user_uploads_uri(username)).await
    }

    #[instrument(skip(self))]
    pub async fn youtube_query(&self, query: &YouTubeVideoQuery) -> eyre::Result<VideoFeed> {
        let uri = query.to_uri()?;
        self.get(&uri).await
    }

    pub async fn get_related_video_feed(&self, uri: &str) -> eyre::Result<VideoFeed> {
        self.get(uri).await
    }

    pub async fn get_related_video_feed_by_id(&self, video_id: &str) -> eyre::Result<VideoFeed> {
        self.get(&video_uri(video_id, "related")).await
    }

    pub async fn get_video_response_feed(&self, uri: &str) -> eyre::Result<VideoResponseFeed> {
        self.get(uri).await
    }

    pub async fn get_video_response_feed_by_id(
        &self,
        video_id: &str,
    ) -> eyre::Result<VideoResponseFeed> {
        self.get(&video_uri(video_id, "responses")).await
    }

    pub async fn get_video_comment_feed(&self, uri: &str) -> eyre::Result<VideoCommentFeed> {
        self.get(uri).await
    }

    pub async fn get_video_comment_feed_by_id(
        &self,
        video_id: &str,
    ) -> eyre::Result<VideoCommentFeed> {
        self.get(&video_uri(video_id, "comments")).await
    }

    /// Uploads a video with `entry` as its metadata to the authenticated user's uploads.
    #[instrument(skip(self, entry, media))]
    pub async fn insert_video_entry(
        &self,
        entry: &VideoEntry,
        media: &MediaSource,
    ) -> eyre::Result<VideoEntry> {
        let uri = format!("{UPLOAD_URI}/{DEFAULT_USER}/uploads");
        self.post_media(Some(entry), media, &uri)
            .await
            .context("upload video")
    }

    /// Fetches one of the user's uploads and reports its processing state.
    ///
    /// Returns `None` once the video is live.
    #[instrument(skip(self))]
    pub async fn check_upload_status(&self, video_id: &str) -> eyre::Result<Option<State>> {
        let uri = format!("{}/{video_id}", user_uri(DEFAULT_USER, "uploads"));
        let entry: VideoEntry = self.get(&uri).await?;
        let state = entry.upload_status()?;
        tracing::debug!(state = ?state.as_ref().and_then(|s| s.name.as_deref()), "upload status");
        Ok(state)
    }

    pub async fn update_video_entry(&self, entry: &VideoEntry) -> eyre::Result<VideoEntry> {
        self.put(entry, edit_href(entry)?).await
    }

    pub async fn delete_video_entry(&self, entry: &VideoEntry) -> eyre::Result<bool> {
        self.delete(edit_href(entry)?).await
    }

    /// Registers `entry` for a browser-based upload.
    ///
    /// Returns the URL the browser should post the file to and the token to post with it.
    #[instrument(skip(self, entry))]
    pub async fn get_form_upload_token(&self, entry: &VideoEntry) -> eyre::Result<(String, String)> {
        let mut request = self.build_request(Method::POST, UPLOAD_TOKEN_URI)?;
        request.add_body_part(entry.to_xml()?, ATOM_CONTENT_TYPE);
        let response = self.send(request).await?;
        let document =
            atom::xml::parse(response.text()?).context("parse upload token response")?;
        let url = document.child_text("", "url");
        let token = document.child_text("", "token");
        match (url, token) {
            (Some(url), Some(token)) => Ok((url.to_string(), token.to_string())),
            _ => bail!("upload token response lacks <url> or <token>"),
        }
    }

    /// Posts `response` as a video response to the video `video_id`.
    pub async fn add_video_response(
        &self,
        video_id: &str,
        response: &VideoEntry,
    ) -> eyre::Result<VideoResponseEntry> {
        self.post(response, &video_uri(video_id, "responses")).await
    }

    pub async fn delete_video_response(
        &self,
        video_id: &str,
        response_video_id: &str,
    ) -> eyre::Result<bool> {
        let uri = format!("{}/{response_video_id}", video_uri(video_id, "responses"));
        self.delete(&uri).await
    }

    /// Comments on `video`, posting to its comment feed.
    #[instrument(skip(self, video))]
    pub async fn add_comment(&self, text: &str, video: &VideoEntry) -> eyre::Result<VideoCommentEntry> {
        let uri = match video.comments_href() {
            Some(href) => href.to_string(),
            None => video_uri(require_video_id(video)?, "comments"),
        };
        self.post(&VideoCommentEntry::new(text), &uri).await
    }

    /// Rates `video` from 1 to 5.
    #[instrument(skip(self, video))]
    pub async fn add_rating(&self, value: u8, video: &VideoEntry) -> eyre::Result<GDataEntry> {
        if !(1..=5).contains(&value) {
            bail!("rating must be between 1 and 5, got {value}");
        }
        let rating = Rating {
            min: Some("1".to_string()),
            max: Some("5".to_string()),
            value: Some(value.to_string()),
            ..Default::default()
        };
        let mut entry = GDataEntry::default();
        entry.extension_elements.push(rating.to_element());
        self.post(&entry, &video_uri(require_video_id(video)?, "ratings"))
            .await
    }

    pub async fn get_playlist_feed(&self, uri: &str) -> eyre::Result<PlaylistFeed> {
        self.get(uri).await
    }

    pub async fn get_playlist_feed_by_username(&self, username: &str) -> eyre::Result<PlaylistFeed> {
        self.get(&user_uri(username, "playlists")).await
    }

    /// The videos in a playlist, from the playlist entry's feed link.
    pub async fn get_playlist_video_feed(&self, uri: &str) -> eyre::Result<PlaylistVideoFeed> {
        self.get(uri).await
    }

    pub async fn add_playlist(
        &self,
        title: &str,
        description: &str,
        private: bool,
    ) -> eyre::Result<PlaylistEntry> {
        let playlist = PlaylistEntry::new(title, description, private);
        self.post(&playlist, &user_uri(DEFAULT_USER, "playlists"))
            .await
    }

    pub async fn update_playlist(
        &self,
        playlist_id: &str,
        title: &str,
        description: &str,
        private: bool,
    ) -> eyre::Result<PlaylistEntry> {
        let playlist = PlaylistEntry::new(title, description, private);
        let uri = format!("{}/{playlist_id}", user_uri(DEFAULT_USER, "playlists"));
        self.put(&playlist, &uri).await
    }

    pub async fn delete_playlist(&self, playlist_uri: &str) -> eyre::Result<bool> {
        self.delete(playlist_uri).await
    }

    /// Adds the video `video_id` to the playlist, optionally with its own title and description.
    pub async fn add_playlist_video_entry_to_playlist(
        &self,
        playlist_uri: &str,
        video_id: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> eyre::Result<PlaylistVideoEntry> {
        let mut entry = PlaylistVideoEntry {
            description: description.map(Description::with_text),
            ..Default::default()
        };
        entry.id = Some(atom::Id::with_text(video_id));
        entry.title = title.map(atom::Title::with_text);
        self.post(&entry, playlist_uri).await
    }

    pub async fn update_playlist_video_entry_metadata(
        &self,
        playlist_uri: &str,
        playlist_entry_id: &str,
        title: &str,
        description: &str,
        position: u32,
    ) -> eyre::Result<PlaylistVideoEntry> {
        let mut entry = PlaylistVideoEntry {
            description: Some(Description::with_text(description)),
            position: Some(Position::with_text(position.to_string())),
            ..Default::default()
        };
        entry.title = Some(atom::Title::with_text(title));
        self.put(&entry, &format!("{playlist_uri}/{playlist_entry_id}"))
            .await
    }

    pub async fn delete_playlist_video_entry(
        &self,
        playlist_uri: &str,
        playlist_entry_id: &str,
    ) -> eyre::Result<bool> {
        self.delete(&format!("{playlist_uri}/{playlist_entry_id}"))
            .await
    }

    pub async fn get_subscription_feed(&self, uri: &str) -> eyre::Result<SubscriptionFeed> {
        self.get(uri).await
    }

    pub async fn get_subscription_feed_by_username(
        &self,
        username: &str,
    ) -> eyre::Result<SubscriptionFeed> {
        self.get(&user_uri(username, "subscriptions")).await
    }

    async fn add_subscription(&self, mut entry: SubscriptionEntry, kind: &str) -> eyre::Result<SubscriptionEntry> {
        entry
            .category
            .push(atom::Category::new(SUBSCRIPTION_CATEGORY_SCHEME, kind));
        self.post(&entry, &user_uri(DEFAULT_USER, "subscriptions"))
            .await
    }

    /// Subscribes to the uploads of `username`.
    pub async fn add_subscription_to_channel(&self, username: &str) -> eyre::Result<SubscriptionEntry> {
        let entry = SubscriptionEntry {
            username: Some(Username::with_text(username)),
            ..Default::default()
        };
        self.add_subscription(entry, "channel").await
    }

    /// Subscribes to the favorites of `username`.
    pub async fn add_subscription_to_favorites(
        &self,
        username: &str,
    ) -> eyre::Result<SubscriptionEntry> {
        let entry = SubscriptionEntry {
            username: Some(Username::with_text(username)),
            ..Default::default()
        };
        self.add_subscription(entry, "favorites").await
    }

    /// Subscribes to the results of a search.
    pub async fn add_subscription_to_query(&self, query: &str) -> eyre::Result<SubscriptionEntry> {
        let entry = SubscriptionEntry {
            query_string: Some(QueryString::with_text(query)),
            ..Default::default()
        };
        self.add_subscription(entry, "query").await
    }

    pub async fn delete_subscription(&self, subscription_uri: &str) -> eyre::Result<bool> {
        self.delete(subscription_uri).await
    }

    pub async fn get_user_entry(&self, uri: &str) -> eyre::Result<UserEntry> {
        self.get(uri).await
    }

    pub async fn get_user_entry_by_username(&self, username: &str) -> eyre::Result<UserEntry> {
        self.get(&format!("{USER_FEED_URI}/{username}")).await
    }

    /// The favorites of `username`, or of the authenticated user.
    pub async fn get_user_favorites_feed(&self, username: Option<&str>) -> eyre::Result<VideoFeed> {
        self.get(&user_uri(username.unwrap_or(DEFAULT_USER), "favorites"))
            .await
    }

    pub async fn add_video_entry_to_favorites(&self, video: &VideoEntry) -> eyre::Result<VideoEntry> {
        self.post(video, &user_uri(DEFAULT_USER, "favorites")).await
    }

    pub async fn delete_video_entry_from_favorites(&self, video_id: &str) -> eyre::Result<bool> {
        let uri = format!("{}/{video_id}", user_uri(DEFAULT_USER, "favorites"));
        self.delete(&uri).await
    }

    pub async fn get_contact_feed(&self, uri: &str) -> eyre::Result<ContactFeed> {
        self.get(uri).await
    }

    pub async fn get_contact_feed_by_username(&self, username: &str) -> eyre::Result<ContactFeed> {
        self.get(&user_uri(username, "contacts")).await
    }

    pub async fn add_contact(&self, contact_username: &str) -> eyre::Result<ContactEntry> {
        let contact = ContactEntry {
            username: Some(Username::with_text(contact_username)),
            ..Default::default()
        };
        self.post(&contact, &user_uri(DEFAULT_USER, "contacts")).await
    }

    /// Accepts or rejects a contact (`status`) and files it under `category`, such as `Friends`.
    pub async fn update_contact(
        &self,
        contact_username: &str,
        status: &str,
        category: &str,
    ) -> eyre::Result<ContactEntry> {
        let mut contact = ContactEntry {
            status: Some(Status::with_text(status)),
            ..Default::default()
        };
        contact
            .category
            .push(atom::Category::new(CONTACT_CATEGORY_SCHEME, category));
        let uri = format!("{}/{contact_username}", user_uri(DEFAULT_USER, "contacts"));
        self.put(&contact, &uri).await
    }

    pub async fn delete_contact(&self, contact_username: &str) -> eyre::Result<bool> {
        let uri = format!("{}/{contact_username}", user_uri(DEFAULT_USER, "contacts"));
        self.delete(&uri).await
    }
}

/// A video search.
///
/// Derefs to the generic [`Query`] for categories, paging and ordering. Only `relevance`,
/// `viewCount`, `published`, `rating` and `relevance_lang_*` are valid orderings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YouTubeVideoQuery {
    pub base: Query,
    /// Search terms.
    pub vq: Option<String>,
    /// `include` or `exclude` restricted content.
    pub racy: Option<String>,
    /// Language restriction, as an ISO 639-1 code.
    pub lr: Option<String>,
    /// Country code or IP address to filter results for.
    pub restriction: Option<String>,
    /// `today`, `this_week`, `this_month` or `all_time`; standard feeds only.
    pub time: Option<String>,
    pub format: Option<String>,
    pub location: Option<String>,
}

impl Default for YouTubeVideoQuery {
    fn default() -> Self {
        Self::new(VIDEO_FEED_URI)
    }
}

impl YouTubeVideoQuery {
    pub fn new(feed: impl Into<String>) -> Self {
        Self {
            base: Query::new(feed),
            vq: None,
            racy: None,
            lr: None,
            restriction: None,
            time: None,
            format: None,
            location: None,
        }
    }

    /// A query over one of the standard feeds, where `time` applies.
    pub fn standard_feed(feed: StandardFeed) -> Self {
        Self::new(feed.uri())
    }

    pub fn to_uri(&self) -> eyre::Result<String> {
        if let Some(orderby) = &self.base.orderby {
            let known = ["relevance", "viewCount", "published", "rating"];
            if !known.contains(&orderby.as_str()) && !orderby.starts_with("relevance_lang_") {
                bail!("invalid orderby '{orderby}'");
            }
        }
        if let Some(racy) = &self.racy {
            if racy != "include" && racy != "exclude" {
                bail!("invalid racy '{racy}', expected include or exclude");
            }
        }
        if let Some(time) = &self.time {
            if !["today", "this_week", "this_month", "all_time"].contains(&time.as_str()) {
                bail!("invalid time '{time}'");
            }
        }

        let mut query = self.base.clone();
        let params = [
            ("vq", &self.vq),
            ("racy", &self.racy),
            ("lr", &self.lr),
            ("restriction", &self.restriction),
            ("time", &self.time),
            ("format", &self.format),
            ("location", &self.location),
        ];
        for (name, value) in params {
            if let Some(value) = value {
                query.params.insert(name.to_string(), value.clone());
            }
        }
        Ok(query.to_uri())
    }
}

impl Deref for YouTubeVideoQuery {
    type Target = Query;

    fn deref(&self) -> &Query {
        &self.base
    }
}

impl DerefMut for YouTubeVideoQuery {
    fn deref_mut(&mut self) -> &mut Query {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media;
    use crate::service::RequestError;
    use atom::http::{HttpRequest, HttpResponse, Uri};
    use atom::mock::{EchoHttpClient, MockHttpClient, SettableHttpClient};
    use atom::Link;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn echo_youtube() -> YouTubeService<MockHttpClient<EchoHttpClient>> {
        YouTubeService::new(MockHttpClient::recording_through(EchoHttpClient))
            .with_developer_key("devkey")
            .with_client_id("gdata-rs-test")
    }

    async fn sent(youtube: &YouTubeService<MockHttpClient<EchoHttpClient>>) -> Vec<String> {
        youtube
            .client()
            .recordings()
            .await
            .iter()
            .map(|r| format!("{} {}", r.request.method, r.request.uri))
            .collect()
    }

    fn uploaded_video() -> VideoEntry {
        let mut video = VideoEntry::with_media(media::Group {
            title: Some(media::Title::with_text("my cool video")),
            ..Default::default()
        });
        video.id = Some(atom::Id::with_text(
            "http://gdata.youtube.com/feeds/api/videos/Ncakifd_16k",
        ));
        video.link.push(Link::new(
            atom::rel::EDIT,
            "http://gdata.youtube.com/feeds/api/users/default/uploads/Ncakifd_16k",
        ));
        video
    }

    #[tokio::test]
    async fn sends_developer_headers() {
        let youtube = YouTubeService::new(EchoHttpClient)
            .with_developer_key("devkey")
            .with_client_id("gdata-rs-test");
        assert_eq!(youtube.developer_key(), Some("devkey"));
        assert_eq!(youtube.client_id(), Some("gdata-rs-test"));

        let response = youtube
            .request(Method::GET, "/feeds/api/videos/Ncakifd_16k")
            .await
            .unwrap();
        assert_eq!(response.header("X-GData-Key"), Some("key=devkey"));
        assert_eq!(response.header("X-GData-Client"), Some("gdata-rs-test"));
        assert_eq!(response.header("Echo-Host"), Some("gdata.youtube.com:None"));
    }

    #[tokio::test]
    async fn reads_feeds_by_uri_and_name() {
        let mock = MockHttpClient::<EchoHttpClient>::new();
        let feed = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry><title>a</title></entry></feed>"#;
        for uri in [
            "http://gdata.youtube.com/feeds/api/standardfeeds/top_rated",
            "http://gdata.youtube.com/feeds/api/users/gdpython/uploads",
            "http://gdata.youtube.com/feeds/api/videos/Ncakifd_16k/related",
            "http://gdata.youtube.com/feeds/api/users/default/favorites",
            "http://gdata.youtube.com/feeds/api/videos",
        ] {
            mock.add_response(
                &HttpRequest::new(Method::GET, Uri::parse(uri).unwrap()),
                HttpResponse::new(200, "OK").with_body(feed),
            )
            .await;
        }
        let youtube = YouTubeService::new(mock);

        let top = youtube.get_standard_feed(StandardFeed::TopRated).await.unwrap();
        assert_eq!(top.entry.len(), 1);
        youtube.get_user_uploads_by_username("gdpython").await.unwrap();
        youtube.get_related_video_feed_by_id("Ncakifd_16k").await.unwrap();
        youtube.get_user_favorites_feed(None).await.unwrap();

        let mut query = YouTubeVideoQuery::default();
        query.vq = Some("stanford".to_string());
        query.orderby = Some("viewCount".to_string());
        let found = youtube.youtube_query(&query).await.unwrap();
        assert_eq!(found.entry[0].title.as_ref().unwrap().text.as_deref(), Some("a"));

        let missing = youtube.get_playlist_feed_by_username("gdpython").await.unwrap_err();
        assert!(
            missing
                .chain()
                .any(|cause| cause.to_string().contains("no recorded response"))
        );
    }

    #[tokio::test]
    async fn uploads_video_with_metadata() {
        let created = r#"<entry xmlns="http://www.w3.org/2005/Atom" xmlns:app="http://www.w3.org/2007/app"
              xmlns:yt="http://gdata.youtube.com/schemas/2007">
            <id>http://gdata.youtube.com/feeds/api/videos/Ncakifd_16k</id>
            <title>my cool video</title>
            <app:control><app:draft>yes</app:draft><yt:state name="processing"/></app:control>
          </entry>"#;
        let youtube = YouTubeService::new(MockHttpClient::recording_through(
            SettableHttpClient::new(HttpResponse::new(201, "Created").with_body(created)),
        ));
        let media = MediaSource::new("fake video", "video/quicktime").with_file_name("test.mov");
        let video = youtube
            .insert_video_entry(&uploaded_video(), &media)
            .await
            .unwrap();
        assert_eq!(video.video_id(), Some("Ncakifd_16k"));
        assert_eq!(
            video.upload_status().unwrap().unwrap().name.as_deref(),
            Some("processing")
        );

        let recordings = youtube.client().recordings().await;
        let request = &recordings[0].request;
        assert_eq!(
            request.uri.to_string(),
            "http://uploads.gdata.youtube.com/feeds/api/users/default/uploads"
        );
        assert_eq!(request.headers.get("Slug").map(String::as_str), Some("test.mov"));
        assert_eq!(request.body_parts.len(), 2);
        assert_eq!(request.body_parts[0].content_type, ATOM_CONTENT_TYPE);
        assert_eq!(request.body_parts[1].content_type, "video/quicktime");
    }

    #[tokio::test]
    async fn checks_upload_status() {
        let mock = MockHttpClient::<EchoHttpClient>::new();
        mock.add_response(
            &HttpRequest::new(
                Method::GET,
                Uri::parse("http://gdata.youtube.com/feeds/api/users/default/uploads/Ncakifd_16k")
                    .unwrap(),
            ),
            HttpResponse::new(200, "OK").with_body(
                r#"<entry xmlns="http://www.w3.org/2005/Atom" xmlns:app="http://www.w3.org/2007/app"
                     xmlns:yt="http://gdata.youtube.com/schemas/2007">
                     <app:control><yt:state name="failed" reasonCode="invalidFormat">bad file</yt:state></app:control>
                   </entry>"#,
            ),
        )
        .await;
        let youtube = YouTubeService::new(mock);
        let state = youtube.check_upload_status("Ncakifd_16k").await.unwrap().unwrap();
        assert_eq!(state.name.as_deref(), Some("failed"));
        assert_eq!(state.reason_code.as_deref(), Some("invalidFormat"));
        assert_eq!(state.text.as_deref(), Some("bad file"));
    }

    #[tokio::test]
    async fn edits_videos_through_their_edit_link() {
        let youtube = echo_youtube();
        let video = uploaded_video();
        let updated = youtube.update_video_entry(&video).await.unwrap();
        assert_eq!(updated, video);
        assert!(youtube.delete_video_entry(&video).await.unwrap());

        let err = youtube
            .update_video_entry(&VideoEntry::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "video entry has no edit link");

        assert_eq!(
            sent(&youtube).await,
            [
                "PUT http://gdata.youtube.com/feeds/api/users/default/uploads/Ncakifd_16k",
                "DELETE http://gdata.youtube.com/feeds/api/users/default/uploads/Ncakifd_16k",
            ]
        );
    }

    #[tokio::test]
    async fn gets_form_upload_token() {
        let youtube = YouTubeService::new(SettableHttpClient::new(
            HttpResponse::new(200, "OK").with_body(
                "<response><url>http://uploads.gdata.youtube.com/action/FormDataUpload/AIwbF</url>\
                 <token>AEwbFAQEvf3xox</token></response>",
            ),
        ));
        let (url, token) = youtube.get_form_upload_token(&uploaded_video()).await.unwrap();
        assert_eq!(url, "http://uploads.gdata.youtube.com/action/FormDataUpload/AIwbF");
        assert_eq!(token, "AEwbFAQEvf3xox");

        youtube
            .client()
            .set_response(HttpResponse::new(200, "OK").with_body("<response/>"))
            .await;
        assert!(youtube.get_form_upload_token(&uploaded_video()).await.is_err());

        youtube
            .client()
            .set_response(HttpResponse::new(403, "Forbidden").with_body("Invalid developer key"))
            .await;
        let err = youtube.get_form_upload_token(&uploaded_video()).await.unwrap_err();
        assert_eq!(err.downcast_ref::<RequestError>().unwrap().status, 403);
    }

    #[tokio::test]
    async fn comments_rates_and_responds() {
        let youtube = echo_youtube();
        let mut video = uploaded_video();

        let comment = youtube.add_comment("nice video", &video).await.unwrap();
        assert_eq!(comment.content.as_ref().unwrap().text.as_deref(), Some("nice video"));

        video.comments = Some(crate::data::Comments {
            feed_link: Some(crate::data::FeedLink::new(
                "",
                "http://gdata.youtube.com/feeds/api/videos/Ncakifd_16k/comments?v=2",
            )),
            ..Default::default()
        });
        youtube.add_comment("again", &video).await.unwrap();

        let rated = youtube.add_rating(3, &video).await.unwrap();
        let rating: Rating = rated.find_extension().unwrap().unwrap();
        assert_eq!(rating.value.as_deref(), Some("3"));
        assert_eq!(rating.max.as_deref(), Some("5"));

        youtube.add_video_response("9g6buYJTt_g", &video).await.unwrap();
        youtube
            .delete_video_response("9g6buYJTt_g", "Ncakifd_16k")
            .await
            .unwrap();

        assert_eq!(
            sent(&youtube).await,
            [
                "POST http://gdata.youtube.com/feeds/api/videos/Ncakifd_16k/comments",
                "POST http://gdata.youtube.com/feeds/api/videos/Ncakifd_16k/comments?v=2",
                "POST http://gdata.youtube.com/feeds/api/videos/Ncakifd_16k/ratings",
                "POST http://gdata.youtube.com/feeds/api/videos/9g6buYJTt_g/responses",
                "DELETE http://gdata.youtube.com/feeds/api/videos/9g6buYJTt_g/responses/Ncakifd_16k",
            ]
        );
    }

    #[tokio::test]
    async fn rejects_out_of_range_ratings() {
        let youtube = echo_youtube();
        for value in [0, 6] {
            let err = youtube.add_rating(value, &uploaded_video()).await.unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("rating must be between 1 and 5, got {value}")
            );
        }
        assert!(sent(&youtube).await.is_empty());
    }

    #[tokio::test]
    async fn manages_playlists() {
        let youtube = echo_youtube();
        let playlist = youtube
            .add_playlist("my test playlist", "test playlist", true)
            .await
            .unwrap();
        assert!(playlist.private.is_some());
        assert_eq!(
            playlist.description.as_ref().unwrap().text.as_deref(),
            Some("test playlist")
        );
        youtube
            .update_playlist("BCB3BB96DF51B505", "renamed", "still a test", false)
            .await
            .unwrap();

        let playlist_uri = "http://gdata.youtube.com/feeds/api/playlists/BCB3BB96DF51B505";
        let added = youtube
            .add_playlist_video_entry_to_playlist(playlist_uri, "Ncakifd_16k", Some("custom"), None)
            .await
            .unwrap();
        assert_eq!(added.id.as_ref().unwrap().text.as_deref(), Some("Ncakifd_16k"));
        assert_eq!(added.title.as_ref().unwrap().text.as_deref(), Some("custom"));
        assert_eq!(added.description, None);

        let moved = youtube
            .update_playlist_video_entry_metadata(playlist_uri, "E5B0B3B2", "video number 1", "test video", 1)
            .await
            .unwrap();
        assert_eq!(moved.position.as_ref().unwrap().text.as_deref(), Some("1"));

        youtube.delete_playlist_video_entry(playlist_uri, "E5B0B3B2").await.unwrap();
        youtube.delete_playlist(playlist_uri).await.unwrap();

        assert_eq!(
            sent(&youtube).await,
            [
                "POST http://gdata.youtube.com/feeds/api/users/default/playlists",
                "PUT http://gdata.youtube.com/feeds/api/users/default/playlists/BCB3BB96DF51B505",
                "POST http://gdata.youtube.com/feeds/api/playlists/BCB3BB96DF51B505",
                "PUT http://gdata.youtube.com/feeds/api/playlists/BCB3BB96DF51B505/E5B0B3B2",
                "DELETE http://gdata.youtube.com/feeds/api/playlists/BCB3BB96DF51B505/E5B0B3B2",
                "DELETE http://gdata.youtube.com/feeds/api/playlists/BCB3BB96DF51B505",
            ]
        );
    }

    #[tokio::test]
    async fn manages_subscriptions_favorites_and_contacts() {
        let youtube = echo_youtube();

        let channel = youtube.add_subscription_to_channel("gdpython").await.unwrap();
        assert_eq!(channel.subscription_type(), Some("channel"));
        let favorites = youtube.add_subscription_to_favorites("gdpython").await.unwrap();
        assert_eq!(favorites.subscription_type(), Some("favorites"));
        let query = youtube.add_subscription_to_query("cats").await.unwrap();
        assert_eq!(query.subscription_type(), Some("query"));
        assert_eq!(query.query_string.as_ref().unwrap().text.as_deref(), Some("cats"));

        youtube.add_video_entry_to_favorites(&uploaded_video()).await.unwrap();
        youtube.delete_video_entry_from_favorites("Ncakifd_16k").await.unwrap();

        let contact = youtube.add_contact("andyland74").await.unwrap();
        assert_eq!(contact.username.as_ref().unwrap().text.as_deref(), Some("andyland74"));
        let contact = youtube
            .update_contact("andyland74", "accepted", "Friends")
            .await
            .unwrap();
        assert_eq!(contact.status.as_ref().unwrap().text.as_deref(), Some("accepted"));
        assert_eq!(contact.category[0].term.as_deref(), Some("Friends"));
        youtube.delete_contact("andyland74").await.unwrap();

        assert_eq!(
            sent(&youtube).await,
            [
                "POST http://gdata.youtube.com/feeds/api/users/default/subscriptions",
                "POST http://gdata.youtube.com/feeds/api/users/default/subscriptions",
                "POST http://gdata.youtube.com/feeds/api/users/default/subscriptions",
                "POST http://gdata.youtube.com/feeds/api/users/default/favorites",
                "DELETE http://gdata.youtube.com/feeds/api/users/default/favorites/Ncakifd_16k",
                "POST http://gdata.youtube.com/feeds/api/users/default/contacts",
                "PUT http://gdata.youtube.com/feeds/api/users/default/contacts/andyland74",
                "DELETE http://gdata.youtube.com/feeds/api/users/default/contacts/andyland74",
            ]
        );
    }

    #[test]
    fn video_query_uri() {
        let mut query = YouTubeVideoQuery::default();
        query.vq = Some("digital camera".to_string());
        query.orderby = Some("relevance_lang_fr".to_string());
        query.racy = Some("include".to_string());
        query.max_results = Some(10);
        query.categories.push("Comedy".to_string());
        assert_snapshot!(query.to_uri().unwrap(), @"http://gdata.youtube.com/feeds/api/videos/-/Comedy?max-results=10&orderby=relevance_lang_fr&vq=digital+camera&racy=include");

        let mut top = YouTubeVideoQuery::standard_feed(StandardFeed::TopRated);
        top.time = Some("this_week".to_string());
        assert_eq!(
            top.to_uri().unwrap(),
            "http://gdata.youtube.com/feeds/api/standardfeeds/top_rated?time=this_week"
        );

        top.time = Some("yesterday".to_string());
        assert!(top.to_uri().is_err());
        query.orderby = Some("random".to_string());
        assert!(query.to_uri().is_err());
    }

    #[test]
    fn parses_standard_feed_names() {
        assert_eq!(
            "most_viewed".parse::<StandardFeed>().unwrap(),
            StandardFeed::MostViewed
        );
        assert_eq!(
            StandardFeed::WatchOnMobile.uri(),
            "http://gdata.youtube.com/feeds/api/standardfeeds/watch_on_mobile_devices"
        );
        assert!("top_secret".parse::<StandardFeed>().is_err());
    }
}
