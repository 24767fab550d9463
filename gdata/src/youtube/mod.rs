//! YouTube: videos, comments, playlists, subscriptions, user profiles and contacts.

mod service;

pub use service::{
    STANDARD_FEEDS_URI, StandardFeed, UPLOAD_TOKEN_URI, UPLOAD_URI, USER_FEED_URI, VIDEO_FEED_URI,
    YOUTUBE_SERVER, YouTubeService, YouTubeVideoQuery, user_uploads_uri,
};

use crate::data::{Comments, FeedLink, GDataFeedMembers, Rating, atom_feed};
use crate::media;
use atom::{AtomElement, EntryMembers, atom_element};

pub const YOUTUBE_NAMESPACE: &str = "http://gdata.youtube.com/schemas/2007";

pub const CATEGORY_SCHEME: &str = "http://gdata.youtube.com/schemas/2007/categories.cat";
pub const KEYWORD_SCHEME: &str = "http://gdata.youtube.com/schemas/2007/keywords.cat";
pub const DEVELOPER_TAG_SCHEME: &str = "http://gdata.youtube.com/schemas/2007/developertags.cat";
pub const SUBSCRIPTION_CATEGORY_SCHEME: &str =
    "http://gdata.youtube.com/schemas/2007/subscriptiontypes.cat";
pub const CONTACT_CATEGORY_SCHEME: &str = "http://gdata.youtube.com/schemas/2007/contact.cat";

/// Declares `yt` elements that carry nothing but text.
macro_rules! text_elements {
    ($($(#[$meta:meta])* $name:ident($tag:literal);)*) => {
        $(
            atom_element! {
                $(#[$meta])*
                pub struct $name(YOUTUBE_NAMESPACE, $tag) {}
            }
        )*
    };
}

text_elements! {
    Username("username");
    FirstName("firstName");
    LastName("lastName");
    Age("age");
    Books("books");
    Gender("gender");
    Company("company");
    Hobbies("hobbies");
    Hometown("hometown");
    Location("location");
    Movies("movies");
    Music("music");
    Occupation("occupation");
    School("school");
    Relationship("relationship");
    Description("description");
    /// 1-based position of a video in a playlist.
    Position("position");
    /// Present (and empty) when a video or playlist is private.
    Private("private");
    QueryString("queryString");
    Racy("racy");
    Recorded("recorded");
    NoEmbed("noembed");
    VideoId("videoid");
    /// Status of a contact: `accepted`, `requested` or `pending`.
    Status("status");
}

atom_element! {
    pub struct Duration(YOUTUBE_NAMESPACE, "duration") {
        attributes {
            seconds: String = "seconds",
        }
    }
}

atom_element! {
    pub struct Statistics(YOUTUBE_NAMESPACE, "statistics") {
        attributes {
            view_count: String = "viewCount",
            video_watch_count: String = "videoWatchCount",
            subscriber_count: String = "subscriberCount",
            last_web_access: String = "lastWebAccess",
            favorite_count: String = "favoriteCount",
        }
    }
}

atom_element! {
    /// Processing state of an uploaded video, found inside the entry's `app:control`.
    ///
    /// The text, if any, is a human-readable explanation.
    pub struct State(YOUTUBE_NAMESPACE, "state") {
        attributes {
            name: String = "name",
            reason_code: String = "reasonCode",
            help_url: String = "helpUrl",
        }
    }
}

/// Returns the last path segment of an entry's id, which is how YouTube ids embed the resource id.
fn id_tail(entry: &EntryMembers) -> Option<&str> {
    let id = entry.id.as_ref()?.text.as_deref()?;
    id.rsplit('/').next().filter(|tail| !tail.is_empty())
}

atom_element! {
    pub struct VideoEntry(atom::ATOM_NAMESPACE, "entry") {
        base entry: EntryMembers;
        one {
            media: media::Group,
            statistics: Statistics,
            racy: Racy,
            rating: Rating,
            noembed: NoEmbed,
            location: Location,
            recorded: Recorded,
            comments: Comments,
        }
        many {
            feed_link: FeedLink,
        }
    }
}

impl VideoEntry {
    /// An entry describing a video to upload.
    pub fn with_media(media: media::Group) -> Self {
        Self {
            media: Some(media),
            ..Default::default()
        }
    }

    /// The video's id: `media:group/yt:videoid` when present, else the tail of the entry id.
    pub fn video_id(&self) -> Option<&str> {
        self.media
            .as_ref()
            .and_then(|media| media.video_id.as_ref())
            .and_then(|id| id.text.as_deref())
            .or_else(|| id_tail(&self.entry))
    }

    /// The upload state reported in `app:control`, or `None` once the video is live.
    pub fn upload_status(&self) -> eyre::Result<Option<State>> {
        match &self.control {
            Some(control) => control.find_extension(),
            None => Ok(None),
        }
    }

    /// URL of the embeddable Flash player, if the video may be embedded.
    pub fn swf_url(&self) -> Option<&str> {
        if self.noembed.is_some() {
            return None;
        }
        self.media
            .as_ref()?
            .content
            .iter()
            .find(|content| content.content_type.as_deref() == Some("application/x-shockwave-flash"))?
            .url
            .as_deref()
    }

    /// The href of the comment feed, where new comments are posted.
    pub fn comments_href(&self) -> Option<&str> {
        self.comments.as_ref()?.feed_link.as_ref()?.href.as_deref()
    }
}

atom_element! {
    pub struct VideoFeed(atom::ATOM_NAMESPACE, "feed") {
        base feed: GDataFeedMembers;
        many {
            entry: VideoEntry,
        }
    }
}

atom_element! {
    pub struct VideoCommentEntry(atom::ATOM_NAMESPACE, "entry") {
        base entry: EntryMembers;
    }
}

impl VideoCommentEntry {
    pub fn new(text: impl Into<String>) -> Self {
        let mut comment = Self::default();
        comment.content = Some(atom::Content::plain(text));
        comment
    }
}

atom_element! {
    pub struct VideoCommentFeed(atom::ATOM_NAMESPACE, "feed") {
        base feed: GDataFeedMembers;
        many {
            entry: VideoCommentEntry,
        }
    }
}

atom_element! {
    /// A video posted in response to another.
    pub struct VideoResponseEntry(atom::ATOM_NAMESPACE, "entry") {
        base entry: EntryMembers;
        one {
            media: media::Group,
            statistics: Statistics,
            rating: Rating,
        }
        many {
            feed_link: FeedLink,
        }
    }
}

atom_element! {
    pub struct VideoResponseFeed(atom::ATOM_NAMESPACE, "feed") {
        base feed: GDataFeedMembers;
        many {
            entry: VideoResponseEntry,
        }
    }
}

atom_element! {
    /// One of a user's playlists. Its `feed_link` points at the playlist's videos.
    pub struct PlaylistEntry(atom::ATOM_NAMESPACE, "entry") {
        base entry: EntryMembers;
        one {
            description: Description,
            private: Private,
        }
        many {
            feed_link: FeedLink,
        }
    }
}

impl PlaylistEntry {
    pub fn new(title: impl Into<String>, description: impl Into<String>, private: bool) -> Self {
        let mut playlist = Self {
            description: Some(Description::with_text(description)),
            private: private.then(Private::default),
            ..Default::default()
        };
        playlist.title = Some(atom::Title::with_text(title));
        playlist
    }

    /// The href of the playlist's video feed.
    pub fn videos_href(&self) -> Option<&str> {
        self.feed_link.first()?.href.as_deref()
    }
}

atom_element! {
    pub struct PlaylistFeed(atom::ATOM_NAMESPACE, "feed") {
        base feed: GDataFeedMembers;
        many {
            entry: PlaylistEntry,
        }
    }
}

atom_element! {
    /// A video as it appears in a playlist, with the playlist's own title and description for it.
    pub struct PlaylistVideoEntry(atom::ATOM_NAMESPACE, "entry") {
        base entry: EntryMembers;
        one {
            media: media::Group,
            position: Position,
            description: Description,
            statistics: Statistics,
            rating: Rating,
        }
        many {
            feed_link: FeedLink,
        }
    }
}

impl PlaylistVideoEntry {
    /// The playlist entry's own id, the last segment of its entry id.
    pub fn playlist_entry_id(&self) -> Option<&str> {
        id_tail(&self.entry)
    }
}

atom_element! {
    pub struct PlaylistVideoFeed(atom::ATOM_NAMESPACE, "feed") {
        base feed: GDataFeedMembers;
        many {
            entry: PlaylistVideoEntry,
        }
    }
}

atom_element! {
    /// A subscription to a channel, a user's favorites or a search query.
    pub struct SubscriptionEntry(atom::ATOM_NAMESPACE, "entry") {
        base entry: EntryMembers;
        one {
            username: Username,
            query_string: QueryString,
        }
        many {
            feed_link: FeedLink,
        }
    }
}

impl SubscriptionEntry {
    /// `channel`, `favorites` or `query`, from the entry's subscription type category.
    pub fn subscription_type(&self) -> Option<&str> {
        self.category
            .iter()
            .find(|category| category.scheme.as_deref() == Some(SUBSCRIPTION_CATEGORY_SCHEME))?
            .term
            .as_deref()
    }
}

atom_element! {
    pub struct SubscriptionFeed(atom::ATOM_NAMESPACE, "feed") {
        base feed: GDataFeedMembers;
        many {
            entry: SubscriptionEntry,
        }
    }
}

atom_element! {
    /// A user's profile.
    pub struct UserEntry(atom::ATOM_NAMESPACE, "entry") {
        base entry: EntryMembers;
        one {
            username: Username,
            first_name: FirstName,
            last_name: LastName,
            age: Age,
            books: Books,
            gender: Gender,
            company: Company,
            description: Description,
            hobbies: Hobbies,
            hometown: Hometown,
            location: Location,
            movies: Movies,
            music: Music,
            occupation: Occupation,
            school: School,
            relationship: Relationship,
            statistics: Statistics,
            thumbnail: media::Thumbnail,
        }
        many {
            feed_link: FeedLink,
        }
    }
}

atom_element! {
    pub struct UserFeed(atom::ATOM_NAMESPACE, "feed") {
        base feed: GDataFeedMembers;
        many {
            entry: UserEntry,
        }
    }
}

atom_element! {
    pub struct ContactEntry(atom::ATOM_NAMESPACE, "entry") {
        base entry: EntryMembers;
        one {
            username: Username,
            status: Status,
        }
    }
}

atom_element! {
    pub struct ContactFeed(atom::ATOM_NAMESPACE, "feed") {
        base feed: GDataFeedMembers;
        many {
            entry: ContactEntry,
        }
    }
}

atom_feed! {
    VideoFeed => VideoEntry,
    VideoCommentFeed => VideoCommentEntry,
    VideoResponseFeed => VideoResponseEntry,
    PlaylistFeed => PlaylistEntry,
    PlaylistVideoFeed => PlaylistVideoEntry,
    SubscriptionFeed => SubscriptionEntry,
    UserFeed => UserEntry,
    ContactFeed => ContactEntry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AtomFeed;
    use atom::LinkFinder;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    const VIDEO_FEED: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
      <feed xmlns='http://www.w3.org/2005/Atom'
            xmlns:openSearch='http://a9.com/-/spec/opensearchrss/1.0/'
            xmlns:gd='http://schemas.google.com/g/2005'
            xmlns:media='http://search.yahoo.com/mrss/'
            xmlns:yt='http://gdata.youtube.com/schemas/2007'>
        <id>http://gdata.youtube.com/feeds/api/standardfeeds/top_rated</id>
        <title type='text'>Top Rated</title>
        <link rel='next' type='application/atom+xml'
              href='http://gdata.youtube.com/feeds/api/standardfeeds/top_rated?start-index=26&amp;max-results=25'/>
        <openSearch:totalResults>100</openSearch:totalResults>
        <entry>
          <id>http://gdata.youtube.com/feeds/api/videos/ZTUVgYoeN_b</id>
          <title type='text'>Shopping for Coats</title>
          <link rel='edit' href='http://gdata.youtube.com/feeds/api/users/GoogleDevelopers/uploads/ZTUVgYoeN_b'/>
          <media:group>
            <media:title type='plain'>Shopping for Coats</media:title>
            <media:content url='http://www.youtube.com/v/ZTUVgYoeN_b' type='application/x-shockwave-flash'
                           medium='video' isDefault='true' expression='full' duration='79' yt:format='5'/>
            <yt:duration seconds='79'/>
          </media:group>
          <yt:statistics viewCount='4' favoriteCount='1'/>
          <gd:rating min='1' max='5' numRaters='2' average='4.50'/>
          <yt:location>Mountain View, CA</yt:location>
          <gd:comments>
            <gd:feedLink href='http://gdata.youtube.com/feeds/api/videos/ZTUVgYoeN_b/comments' countHint='2'/>
          </gd:comments>
          <gd:feedLink rel='http://gdata.youtube.com/schemas/2007#video.related'
                       href='http://gdata.youtube.com/feeds/api/videos/ZTUVgYoeN_b/related'/>
        </entry>
        <entry>
          <id>http://gdata.youtube.com/feeds/api/videos/abc</id>
          <yt:noembed/>
          <media:group>
            <media:content url='http://www.youtube.com/v/abc' type='application/x-shockwave-flash'/>
          </media:group>
        </entry>
      </feed>"#;

    #[test]
    fn binds_video_feed() {
        let feed = VideoFeed::from_xml(VIDEO_FEED).unwrap();
        assert_eq!(
            feed.next_href(),
            Some("http://gdata.youtube.com/feeds/api/standardfeeds/top_rated?start-index=26&max-results=25")
        );
        assert_eq!(feed.total_results.as_ref().unwrap().value().unwrap(), Some(100));
        assert_eq!(feed.entries().len(), 2);

        let video = &feed.entry[0];
        assert_eq!(video.video_id(), Some("ZTUVgYoeN_b"));
        assert_eq!(video.swf_url(), Some("http://www.youtube.com/v/ZTUVgYoeN_b"));
        assert_eq!(
            video.comments_href(),
            Some("http://gdata.youtube.com/feeds/api/videos/ZTUVgYoeN_b/comments")
        );
        assert_eq!(
            video.statistics.as_ref().unwrap().view_count.as_deref(),
            Some("4")
        );
        assert_eq!(video.rating.as_ref().unwrap().average.as_deref(), Some("4.50"));
        assert_eq!(
            video.location.as_ref().unwrap().text.as_deref(),
            Some("Mountain View, CA")
        );
        assert_eq!(video.feed_link.len(), 1);
        assert_eq!(
            video.media.as_ref().unwrap().duration.as_ref().unwrap().seconds.as_deref(),
            Some("79")
        );
        assert_eq!(
            video.edit_link().and_then(|l| l.href.as_deref()),
            Some("http://gdata.youtube.com/feeds/api/users/GoogleDevelopers/uploads/ZTUVgYoeN_b")
        );
        assert_eq!(video.upload_status().unwrap(), None);

        assert_eq!(feed.entry[1].video_id(), Some("abc"));
        assert_eq!(feed.entry[1].swf_url(), None);

        let written = feed.to_xml().unwrap();
        assert_eq!(VideoFeed::from_xml(&written).unwrap(), feed);
    }

    #[test]
    fn reads_upload_state_from_control() {
        let video = VideoEntry::from_xml(
            r#"<entry xmlns="http://www.w3.org/2005/Atom" xmlns:app="http://www.w3.org/2007/app"
                 xmlns:yt="http://gdata.youtube.com/schemas/2007">
                 <id>http://gdata.youtube.com/feeds/api/videos/xyz</id>
                 <app:control>
                   <app:draft>yes</app:draft>
                   <yt:state name="rejected" reasonCode="duplicate"
                             helpUrl="http://www.youtube.com/t/community_guidelines">Duplicate video</yt:state>
                 </app:control>
               </entry>"#,
        )
        .unwrap();
        let state = video.upload_status().unwrap().unwrap();
        assert_eq!(state.name.as_deref(), Some("rejected"));
        assert_eq!(state.reason_code.as_deref(), Some("duplicate"));
        assert_eq!(state.text.as_deref(), Some("Duplicate video"));
        assert_eq!(
            video.control.as_ref().unwrap().draft.as_ref().unwrap().text.as_deref(),
            Some("yes")
        );
    }

    #[test]
    fn writes_upload_entry() {
        let video = VideoEntry::with_media(media::Group {
            title: Some(media::Title::with_text("my cool video")),
            keywords: Some(media::Keywords::with_text("video, foo")),
            private: Some(Private::default()),
            ..Default::default()
        });
        assert_snapshot!(atom::xml::to_string(&video.to_element()).unwrap(), @r#"<entry xmlns="http://www.w3.org/2005/Atom" xmlns:media="http://search.yahoo.com/mrss/" xmlns:yt="http://gdata.youtube.com/schemas/2007"><media:group><media:title>my cool video</media:title><media:keywords>video, foo</media:keywords><yt:private/></media:group></entry>"#);
    }

    #[test]
    fn binds_user_profile() {
        let user = UserEntry::from_xml(
            r#"<entry xmlns="http://www.w3.org/2005/Atom" xmlns:yt="http://gdata.youtube.com/schemas/2007"
                 xmlns:media="http://search.yahoo.com/mrss/" xmlns:gd="http://schemas.google.com/g/2005">
                 <id>http://gdata.youtube.com/feeds/api/users/andyland74</id>
                 <yt:username>andyland74</yt:username>
                 <yt:firstName>Andy</yt:firstName>
                 <yt:age>33</yt:age>
                 <yt:hometown>Chicago</yt:hometown>
                 <yt:relationship>taken</yt:relationship>
                 <yt:statistics viewCount="9" subscriberCount="2" lastWebAccess="2008-02-25T16:03:38.000-08:00"/>
                 <media:thumbnail url="http://i.ytimg.com/vi/YFbSxcdOL-w/default.jpg"/>
                 <gd:feedLink rel="http://gdata.youtube.com/schemas/2007#user.favorites"
                              href="http://gdata.youtube.com/feeds/api/users/andyland74/favorites" countHint="4"/>
                 <gd:feedLink rel="http://gdata.youtube.com/schemas/2007#user.uploads"
                              href="http://gdata.youtube.com/feeds/api/users/andyland74/uploads"/>
               </entry>"#,
        )
        .unwrap();
        assert_eq!(user.username.as_ref().unwrap().text.as_deref(), Some("andyland74"));
        assert_eq!(user.first_name.as_ref().unwrap().text.as_deref(), Some("Andy"));
        assert_eq!(user.age.as_ref().unwrap().text.as_deref(), Some("33"));
        assert_eq!(user.hometown.as_ref().unwrap().text.as_deref(), Some("Chicago"));
        assert_eq!(
            user.statistics.as_ref().unwrap().last_web_access.as_deref(),
            Some("2008-02-25T16:03:38.000-08:00")
        );
        assert!(user.thumbnail.is_some());
        assert_eq!(user.feed_link.len(), 2);
        assert_eq!(user.feed_link[0].count_hint.as_deref(), Some("4"));
    }

    #[test]
    fn playlist_and_subscription_helpers() {
        let playlist = PlaylistEntry::new("my test playlist", "test playlist", true);
        assert_eq!(playlist.title.as_ref().unwrap().text.as_deref(), Some("my test playlist"));
        assert!(playlist.private.is_some());
        assert!(PlaylistEntry::new("t", "d", false).private.is_none());

        let playlist = PlaylistEntry::from_xml(
            r#"<entry xmlns="http://www.w3.org/2005/Atom" xmlns:gd="http://schemas.google.com/g/2005"
                 xmlns:yt="http://gdata.youtube.com/schemas/2007">
                 <yt:description>funny</yt:description>
                 <gd:feedLink rel="http://gdata.youtube.com/schemas/2007#playlist"
                              href="http://gdata.youtube.com/feeds/api/playlists/BCB3BB96DF51B505"/>
               </entry>"#,
        )
        .unwrap();
        assert_eq!(
            playlist.videos_href(),
            Some("http://gdata.youtube.com/feeds/api/playlists/BCB3BB96DF51B505")
        );

        let video = PlaylistVideoEntry::from_xml(
            r#"<entry xmlns="http://www.w3.org/2005/Atom" xmlns:yt="http://gdata.youtube.com/schemas/2007">
                 <id>http://gdata.youtube.com/feeds/api/playlists/BCB3BB96DF51B505/E5B0B3B2A1F3B6C8</id>
                 <yt:position>2</yt:position>
               </entry>"#,
        )
        .unwrap();
        assert_eq!(video.playlist_entry_id(), Some("E5B0B3B2A1F3B6C8"));
        assert_eq!(video.position.as_ref().unwrap().text.as_deref(), Some("2"));

        let subscription = SubscriptionEntry::from_xml(
            r#"<entry xmlns="http://www.w3.org/2005/Atom" xmlns:yt="http://gdata.youtube.com/schemas/2007">
                 <category scheme="http://gdata.youtube.com/schemas/2007/subscriptiontypes.cat" term="query"/>
                 <yt:queryString>cats</yt:queryString>
               </entry>"#,
        )
        .unwrap();
        assert_eq!(subscription.subscription_type(), Some("query"));
        assert_eq!(
            subscription.query_string.as_ref().unwrap().text.as_deref(),
            Some("cats")
        );
    }
}
