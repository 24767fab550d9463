use super::{
    CalendarAclEntry, CalendarAclFeed, CalendarEventCommentEntry, CalendarEventCommentFeed,
    CalendarEventEntry, CalendarEventFeed, CalendarListEntry, CalendarListFeed,
};
use crate::service::{GDataService, Query};
use atom::http::{HttpClient, ReqwestClient};
use std::ops::{Deref, DerefMut};
use tracing::instrument;

pub const CALENDAR_SERVER: &str = "www.google.com";

pub const DEFAULT_EVENT_FEED: &str = "/calendar/feeds/default/private/full";
pub const ALL_CALENDARS_FEED: &str = "/calendar/feeds/default/allcalendars/full";
pub const OWN_CALENDARS_FEED: &str = "/calendar/feeds/default/owncalendars/full";
pub const DEFAULT_ACL_FEED: &str = "/calendar/feeds/default/acl/full";

/// Client for the Google Calendar data API.
///
/// Derefs to the underlying [`GDataService`] for configuration and generic requests.
#[derive(Debug)]
pub struct CalendarService<C = ReqwestClient> {
    service: GDataService<C>,
}

impl<C> CalendarService<C> {
    pub fn new(client: C) -> Self {
        Self::from_service(GDataService::new(client, CALENDAR_SERVER))
    }

    pub fn from_service(service: GDataService<C>) -> Self {
        Self { service }
    }

    /// Sets the `Authorization` header value sent with every request.
    pub fn with_auth_header(mut self, value: impl Into<String>) -> Self {
        self.service.set_auth_header(Some(value.into()));
        self
    }

    pub fn into_service(self) -> GDataService<C> {
        self.service
    }
}

impl<C> Deref for CalendarService<C> {
    type Target = GDataService<C>;

    fn deref(&self) -> &GDataService<C> {
        &self.service
    }
}

impl<C> DerefMut for CalendarService<C> {
    fn deref_mut(&mut self) -> &mut GDataService<C> {
        &mut self.service
    }
}

impl<C> CalendarService<C>
where
    C: HttpClient + Sync,
{
    /// Every calendar the user can see, including subscriptions.
    pub async fn get_all_calendars_feed(&self) -> eyre::Result<CalendarListFeed> {
        self.get(ALL_CALENDARS_FEED).await
    }

    /// The calendars the user owns.
    pub async fn get_own_calendars_feed(&self) -> eyre::Result<CalendarListFeed> {
        self.get(OWN_CALENDARS_FEED).await
    }

    pub async fn get_calendar_list_feed(&self, uri: &str) -> eyre::Result<CalendarListFeed> {
        self.get(uri).await
    }

    pub async fn get_calendar_list_entry(&self, uri: &str) -> eyre::Result<CalendarListEntry> {
        self.get(uri).await
    }

    pub async fn get_calendar_event_feed(&self, uri: &str) -> eyre::Result<CalendarEventFeed> {
        self.get(uri).await
    }

    pub async fn get_calendar_event_entry(&self, uri: &str) -> eyre::Result<CalendarEventEntry> {
        self.get(uri).await
    }

    pub async fn get_calendar_acl_feed(&self, uri: &str) -> eyre::Result<CalendarAclFeed> {
        self.get(uri).await
    }

    pub async fn get_calendar_acl_entry(&self, uri: &str) -> eyre::Result<CalendarAclEntry> {
        self.get(uri).await
    }

    pub async fn get_calendar_event_comment_feed(
        &self,
        uri: &str,
    ) -> eyre::Result<CalendarEventCommentFeed> {
        self.get(uri).await
    }

    #[instrument(skip(self))]
    pub async fn calendar_query(&self, query: &CalendarEventQuery) -> eyre::Result<CalendarEventFeed> {
        self.get(&query.to_uri()).await
    }

    pub async fn insert_event(
        &self,
        event: &CalendarEventEntry,
        insert_uri: &str,
    ) -> eyre::Result<CalendarEventEntry> {
        self.post(event, insert_uri).await
    }

    /// Creates an event from free text, letting the server work out when and where.
    #[instrument(skip(self))]
    pub async fn quick_add_event(&self, text: &str) -> eyre::Result<CalendarEventEntry> {
        self.insert_event(&CalendarEventEntry::quick_add(text), DEFAULT_EVENT_FEED)
            .await
    }

    pub async fn update_event(
        &self,
        edit_uri: &str,
        event: &CalendarEventEntry,
    ) -> eyre::Result<CalendarEventEntry> {
        self.put(event, edit_uri).await
    }

    pub async fn delete_event(&self, edit_uri: &str) -> eyre::Result<bool> {
        self.delete(edit_uri).await
    }

    /// Creates a new calendar owned by the user.
    pub async fn insert_calendar(&self, calendar: &CalendarListEntry) -> eyre::Result<CalendarListEntry> {
        self.post(calendar, OWN_CALENDARS_FEED).await
    }

    /// Adds an existing calendar to the user's list. `calendar` needs only its `id` set.
    pub async fn insert_calendar_subscription(
        &self,
        calendar: &CalendarListEntry,
    ) -> eyre::Result<CalendarListEntry> {
        self.post(calendar, ALL_CALENDARS_FEED).await
    }

    pub async fn update_calendar(
        &self,
        edit_uri: &str,
        calendar: &CalendarListEntry,
    ) -> eyre::Result<CalendarListEntry> {
        self.put(calendar, edit_uri).await
    }

    pub async fn delete_calendar_entry(&self, edit_uri: &str) -> eyre::Result<bool> {
        self.delete(edit_uri).await
    }

    pub async fn insert_acl_entry(
        &self,
        rule: &CalendarAclEntry,
        insert_uri: &str,
    ) -> eyre::Result<CalendarAclEntry> {
        self.post(rule, insert_uri).await
    }

    pub async fn update_acl_entry(
        &self,
        edit_uri: &str,
        rule: &CalendarAclEntry,
    ) -> eyre::Result<CalendarAclEntry> {
        self.put(rule, edit_uri).await
    }

    pub async fn delete_acl_entry(&self, edit_uri: &str) -> eyre::Result<bool> {
        self.delete(edit_uri).await
    }

    /// Posts a comment to an event's comment feed.
    pub async fn insert_event_comment(
        &self,
        comment: &CalendarEventCommentEntry,
        insert_uri: &str,
    ) -> eyre::Result<CalendarEventCommentEntry> {
        self.post(comment, insert_uri).await
    }
}

/// A query against one calendar's event feed.
///
/// Derefs to the generic [`Query`] for text search, categories and paging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEventQuery {
    pub base: Query,
    pub user: String,
    pub visibility: String,
    pub projection: String,
    pub start_min: Option<String>,
    pub start_max: Option<String>,
    pub sortorder: Option<String>,
    pub singleevents: Option<bool>,
    pub futureevents: Option<bool>,
    pub recurrence_expansion_start: Option<String>,
    pub recurrence_expansion_end: Option<String>,
    /// Time zone to express the results in.
    pub ctz: Option<String>,
}

impl Default for CalendarEventQuery {
    fn default() -> Self {
        Self::new("default", "private", "full")
    }
}

impl CalendarEventQuery {
    pub fn new(
        user: impl Into<String>,
        visibility: impl Into<String>,
        projection: impl Into<String>,
    ) -> Self {
        Self {
            base: Query::default(),
            user: user.into(),
            visibility: visibility.into(),
            projection: projection.into(),
            start_min: None,
            start_max: None,
            sortorder: None,
            singleevents: None,
            futureevents: None,
            recurrence_expansion_start: None,
            recurrence_expansion_end: None,
            ctz: None,
        }
    }

    pub fn feed(&self) -> String {
        format!(
            "http://{CALENDAR_SERVER}/calendar/feeds/{}/{}/{}",
            self.user, self.visibility, self.projection
        )
    }

    pub fn to_uri(&self) -> String {
        let mut query = self.base.clone();
        query.feed = self.feed();

        let flag = |value: Option<bool>| value.map(|value| value.to_string());
        let params = [
            ("start-min", self.start_min.clone()),
            ("start-max", self.start_max.clone()),
            ("sortorder", self.sortorder.clone()),
            ("singleevents", flag(self.singleevents)),
            ("futureevents", flag(self.futureevents)),
            ("recurrence-expansion-start", self.recurrence_expansion_start.clone()),
            ("recurrence-expansion-end", self.recurrence_expansion_end.clone()),
            ("ctz", self.ctz.clone()),
        ];
        for (name, value) in params {
            if let Some(value) = value {
                query.params.insert(name.to_string(), value);
            }
        }
        query.to_uri()
    }
}

impl Deref for CalendarEventQuery {
    type Target = Query;

    fn deref(&self) -> &Query {
        &self.base
    }
}

impl DerefMut for CalendarEventQuery {
    fn deref_mut(&mut self) -> &mut Query {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{CalendarEventEntry, WhoRel};
    use atom::mock::{EchoHttpClient, MockHttpClient};
    use atom::http::{HttpRequest, HttpResponse, Uri};
    use atom::{LinkFinder, Title};
    use http::Method;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    const EVENT_FEED: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom"
          xmlns:gd="http://schemas.google.com/g/2005">
        <title>GData Ops Demo</title>
        <entry>
          <title>Tennis with Beth</title>
          <link rel="edit" href="http://www.google.com/calendar/feeds/default/private/full/abc/1"/>
          <gd:who rel="http://schemas.google.com/g/2005#event.organizer" valueString="Beth"/>
        </entry>
      </feed>"#;

    #[tokio::test]
    async fn queries_event_feed() {
        let mock = MockHttpClient::<EchoHttpClient>::new();
        mock.add_response(
            &HttpRequest::new(
                Method::GET,
                Uri::parse("http://www.google.com/calendar/feeds/default/private/full").unwrap(),
            ),
            HttpResponse::new(200, "OK").with_body(EVENT_FEED),
        )
        .await;
        let calendar = CalendarService::new(mock);

        let mut query = CalendarEventQuery::default();
        query.start_min = Some("2007-03-16".to_string());
        query.text_query = Some("Tennis".to_string());
        let feed = calendar.calendar_query(&query).await.unwrap();
        assert_eq!(feed.entry.len(), 1);
        assert_eq!(feed.entry[0].who[0].rel, Some(WhoRel::Organizer));
        assert_eq!(
            feed.entry[0].edit_link().and_then(|l| l.href.as_deref()),
            Some("http://www.google.com/calendar/feeds/default/private/full/abc/1")
        );

        let feed = calendar.get_calendar_event_feed(DEFAULT_EVENT_FEED).await.unwrap();
        assert_eq!(feed.title.as_ref().unwrap().text.as_deref(), Some("GData Ops Demo"));
    }

    #[tokio::test]
    async fn inserts_and_updates_events() {
        let calendar = CalendarService::new(EchoHttpClient).with_auth_header("GoogleLogin auth=x");
        let mut event = CalendarEventEntry::default();
        event.title = Some(Title::with_text("Tennis with Beth"));

        let created = calendar.insert_event(&event, DEFAULT_EVENT_FEED).await.unwrap();
        assert_eq!(created, event);

        let quick = calendar.quick_add_event("Tennis with John April 3 3pm").await.unwrap();
        assert_eq!(
            quick.quick_add.as_ref().unwrap().value.as_deref(),
            Some("true")
        );

        let updated = calendar
            .update_event("http://www.google.com/calendar/feeds/default/private/full/abc/1", &event)
            .await
            .unwrap();
        assert_eq!(updated, event);
        assert!(calendar.delete_event("/calendar/feeds/default/private/full/abc/1").await.unwrap());
    }

    #[tokio::test]
    async fn calendar_and_acl_writes_go_to_their_feeds() {
        let calendar = CalendarService::new(MockHttpClient::recording_through(EchoHttpClient));

        let mut entry = CalendarListEntry::default();
        entry.title = Some(Title::with_text("Little League Schedule"));
        calendar.insert_calendar(&entry).await.unwrap();
        calendar.insert_calendar_subscription(&entry).await.unwrap();
        calendar
            .insert_acl_entry(&CalendarAclEntry::default(), DEFAULT_ACL_FEED)
            .await
            .unwrap();
        calendar
            .insert_event_comment(
                &CalendarEventCommentEntry::default(),
                "/calendar/feeds/default/private/full/abc/comments",
            )
            .await
            .unwrap();

        let sent: Vec<String> = calendar
            .client()
            .recordings()
            .await
            .iter()
            .map(|r| format!("{} {}", r.request.method, r.request.uri))
            .collect();
        assert_eq!(
            sent,
            [
                "POST http://www.google.com/calendar/feeds/default/owncalendars/full",
                "POST http://www.google.com/calendar/feeds/default/allcalendars/full",
                "POST http://www.google.com/calendar/feeds/default/acl/full",
                "POST http://www.google.com/calendar/feeds/default/private/full/abc/comments",
            ]
        );
    }

    #[test]
    fn event_query_uri() {
        let mut query = CalendarEventQuery::new("jo@gmail.com", "public", "basic");
        query.start_min = Some("2007-03-16T00:00:00".to_string());
        query.start_max = Some("2007-03-24T23:59:59".to_string());
        query.singleevents = Some(true);
        query.ctz = Some("America/Los_Angeles".to_string());
        query.max_results = Some(10);
        assert_snapshot!(query.to_uri(), @"http://www.google.com/calendar/feeds/jo@gmail.com/public/basic?max-results=10&start-min=2007-03-16T00%3A00%3A00&start-max=2007-03-24T23%3A59%3A59&singleevents=true&ctz=America%2FLos_Angeles");

        assert_eq!(
            CalendarEventQuery::default().to_uri(),
            "http://www.google.com/calendar/feeds/default/private/full"
        );
    }
}
