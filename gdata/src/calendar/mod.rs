//! Google Calendar: events, calendar lists, access control lists and event comments.

mod service;

pub use service::{
    ALL_CALENDARS_FEED, CALENDAR_SERVER, CalendarEventQuery, CalendarService, DEFAULT_ACL_FEED,
    DEFAULT_EVENT_FEED, OWN_CALENDARS_FEED,
};

use crate::data::{GDATA_NAMESPACE, GDataFeedMembers, atom_feed};
use atom::{AtomElement, EntryMembers, Link, atom_element};
use eyre::Context;
use std::borrow::Cow;

pub use crate::data::Comments;

pub const GCAL_NAMESPACE: &str = "http://schemas.google.com/gCal/2005";
pub const GACL_NAMESPACE: &str = "http://schemas.google.com/acl/2007";

/// `rel` of the link that embeds web content (a gadget or an image) in an event.
pub const WEB_CONTENT_LINK_REL: &str = "http://schemas.google.com/gCal/2005/webContent";

/// Declares elements whose only bound member is a `value` attribute.
macro_rules! value_elements {
    ($($(#[$meta:meta])* $name:ident($ns:expr, $tag:literal);)*) => {
        $(
            atom_element! {
                $(#[$meta])*
                pub struct $name($ns, $tag) {
                    attributes {
                        value: String = "value",
                    }
                }
            }

            impl $name {
                pub fn new(value: impl Into<String>) -> Self {
                    Self {
                        value: Some(value.into()),
                        ..Default::default()
                    }
                }
            }
        )*
    };
}

value_elements! {
    Color(GCAL_NAMESPACE, "color");
    AccessLevel(GCAL_NAMESPACE, "accesslevel");
    Hidden(GCAL_NAMESPACE, "hidden");
    Selected(GCAL_NAMESPACE, "selected");
    Timezone(GCAL_NAMESPACE, "timezone");
    SendEventNotifications(GCAL_NAMESPACE, "sendEventNotifications");
    /// Marks an event whose content is free text for the server to interpret.
    QuickAdd(GCAL_NAMESPACE, "quickadd");
    Role(GACL_NAMESPACE, "role");
}

/// Declares an enumeration stored as a URI in an attribute.
///
/// An empty attribute binds to nothing. A URI that is not listed is kept as `Other` so it is
/// written back unchanged.
macro_rules! uri_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident = $uri:literal, )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )*
            Other(String),
        }

        impl $name {
            pub fn uri(&self) -> &str {
                match self {
                    $( Self::$variant => $uri, )*
                    Self::Other(uri) => uri.as_str(),
                }
            }
        }

        impl atom::AttributeValue for $name {
            fn from_attribute(raw: &str) -> Option<Self> {
                match raw {
                    "" => None,
                    $( $uri => Some(Self::$variant), )*
                    other => Some(Self::Other(other.to_string())),
                }
            }

            fn to_attribute(&self) -> Cow<'_, str> {
                Cow::Borrowed(self.uri())
            }
        }
    };
}

uri_enum! {
    pub enum AttendeeStatusValue {
        Accepted = "http://schemas.google.com/g/2005#event.accepted",
        Declined = "http://schemas.google.com/g/2005#event.declined",
        Invited = "http://schemas.google.com/g/2005#event.invited",
        Tentative = "http://schemas.google.com/g/2005#event.tentative",
    }
}

uri_enum! {
    pub enum AttendeeTypeValue {
        Optional = "http://schemas.google.com/g/2005#event.optional",
        Required = "http://schemas.google.com/g/2005#event.required",
    }
}

uri_enum! {
    pub enum VisibilityValue {
        Confidential = "http://schemas.google.com/g/2005#event.confidential",
        Default = "http://schemas.google.com/g/2005#event.default",
        Private = "http://schemas.google.com/g/2005#event.private",
        Public = "http://schemas.google.com/g/2005#event.public",
    }
}

uri_enum! {
    pub enum TransparencyValue {
        Opaque = "http://schemas.google.com/g/2005#event.opaque",
        Transparent = "http://schemas.google.com/g/2005#event.transparent",
    }
}

uri_enum! {
    pub enum EventStatusValue {
        Canceled = "http://schemas.google.com/g/2005#event.canceled",
        Confirmed = "http://schemas.google.com/g/2005#event.confirmed",
        Tentative = "http://schemas.google.com/g/2005#event.tentative",
    }
}

uri_enum! {
    /// The role a person plays in an event or message.
    pub enum WhoRel {
        Attendee = "http://schemas.google.com/g/2005#event.attendee",
        Organizer = "http://schemas.google.com/g/2005#event.organizer",
        Performer = "http://schemas.google.com/g/2005#event.performer",
        Speaker = "http://schemas.google.com/g/2005#event.speaker",
        Bcc = "http://schemas.google.com/g/2005#message.bcc",
        Cc = "http://schemas.google.com/g/2005#message.cc",
        From = "http://schemas.google.com/g/2005#message.from",
        ReplyTo = "http://schemas.google.com/g/2005#message.reply-to",
        To = "http://schemas.google.com/g/2005#message.to",
    }
}

atom_element! {
    pub struct AttendeeStatus(GDATA_NAMESPACE, "attendeeStatus") {
        attributes {
            value: AttendeeStatusValue = "value",
        }
    }
}

atom_element! {
    pub struct AttendeeType(GDATA_NAMESPACE, "attendeeType") {
        attributes {
            value: AttendeeTypeValue = "value",
        }
    }
}

atom_element! {
    pub struct Visibility(GDATA_NAMESPACE, "visibility") {
        attributes {
            value: VisibilityValue = "value",
        }
    }
}

atom_element! {
    pub struct Transparency(GDATA_NAMESPACE, "transparency") {
        attributes {
            value: TransparencyValue = "value",
        }
    }
}

atom_element! {
    pub struct EventStatus(GDATA_NAMESPACE, "eventStatus") {
        attributes {
            value: EventStatusValue = "value",
        }
    }
}

atom_element! {
    /// A person taking part in an event.
    pub struct Who(GDATA_NAMESPACE, "who") {
        attributes {
            rel: WhoRel = "rel",
            name: String = "valueString",
            email: String = "email",
        }
        one {
            attendee_status: AttendeeStatus,
            attendee_type: AttendeeType,
        }
    }
}

atom_element! {
    pub struct Where(GDATA_NAMESPACE, "where") {
        attributes {
            value_string: String = "valueString",
        }
    }
}

impl Where {
    pub fn new(value_string: impl Into<String>) -> Self {
        Self {
            value_string: Some(value_string.into()),
            ..Default::default()
        }
    }
}

atom_element! {
    /// Who an access rule applies to.
    pub struct Scope(GACL_NAMESPACE, "scope") {
        attributes {
            value: String = "value",
            scope_type: String = "type",
        }
    }
}

atom_element! {
    pub struct ExtendedProperty(GDATA_NAMESPACE, "extendedProperty") {
        attributes {
            name: String = "name",
            value: String = "value",
        }
    }
}

atom_element! {
    pub struct Reminder(GDATA_NAMESPACE, "reminder") {
        attributes {
            absolute_time: String = "absoluteTime",
            days: String = "days",
            hours: String = "hours",
            minutes: String = "minutes",
        }
    }
}

atom_element! {
    pub struct When(GDATA_NAMESPACE, "when") {
        attributes {
            start_time: String = "startTime",
            end_time: String = "endTime",
        }
        many {
            reminder: Reminder,
        }
    }
}

/// A point in time as `gd:when` expresses it: a date for all-day events, else a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    Date(jiff::civil::Date),
    Timestamp(jiff::Timestamp),
}

impl EventTime {
    pub fn parse(raw: &str) -> eyre::Result<Self> {
        let raw = raw.trim();
        if raw.contains('T') {
            raw.parse()
                .map(Self::Timestamp)
                .with_context(|| format!("parse '{raw}' as a timestamp"))
        } else {
            raw.parse()
                .map(Self::Date)
                .with_context(|| format!("parse '{raw}' as a date"))
        }
    }
}

impl When {
    pub fn new(start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            start_time: Some(start_time.into()),
            end_time: Some(end_time.into()),
            ..Default::default()
        }
    }

    pub fn start(&self) -> eyre::Result<Option<EventTime>> {
        self.start_time.as_deref().map(EventTime::parse).transpose()
    }

    pub fn end(&self) -> eyre::Result<Option<EventTime>> {
        self.end_time.as_deref().map(EventTime::parse).transpose()
    }
}

atom_element! {
    /// An iCalendar recurrence rule, held as text.
    pub struct Recurrence(GDATA_NAMESPACE, "recurrence") {}
}

atom_element! {
    /// The recurring event an exception was split from.
    pub struct OriginalEvent(GDATA_NAMESPACE, "originalEvent") {
        attributes {
            id: String = "id",
            href: String = "href",
        }
        one {
            when: When,
        }
    }
}

atom_element! {
    /// An `entryLink` whose inlined entry is itself a calendar event.
    pub struct CalendarEventEntryLink(GDATA_NAMESPACE, "entryLink") {
        attributes {
            rel: String = "rel",
            href: String = "href",
            read_only: String = "readOnly",
        }
        one {
            entry: Box<CalendarEventEntry>,
        }
    }
}

atom_element! {
    pub struct RecurrenceException(GDATA_NAMESPACE, "recurrenceException") {
        attributes {
            specialized: String = "specialized",
        }
        one {
            entry_link: CalendarEventEntryLink,
            original_event: OriginalEvent,
        }
    }
}

atom_element! {
    pub struct WebContentGadgetPref(GCAL_NAMESPACE, "webContentGadgetPref") {
        attributes {
            name: String = "name",
            value: String = "value",
        }
    }
}

atom_element! {
    pub struct WebContent(GCAL_NAMESPACE, "webContent") {
        attributes {
            url: String = "url",
            width: String = "width",
            height: String = "height",
        }
        many {
            gadget_pref: WebContentGadgetPref,
        }
    }
}

atom_element! {
    /// An Atom link carrying [`WebContent`].
    pub struct WebContentLink(atom::ATOM_NAMESPACE, "link") {
        attributes {
            rel: String = "rel",
            href: String = "href",
            link_type: String = "type",
            title: String = "title",
        }
        one {
            web_content: WebContent,
        }
    }
}

impl WebContentLink {
    pub fn new(
        title: impl Into<String>,
        href: impl Into<String>,
        link_type: impl Into<String>,
        web_content: WebContent,
    ) -> Self {
        Self {
            rel: Some(WEB_CONTENT_LINK_REL.to_string()),
            title: Some(title.into()),
            href: Some(href.into()),
            link_type: Some(link_type.into()),
            web_content: Some(web_content),
            ..Default::default()
        }
    }
}

atom_element! {
    /// A calendar in the user's calendar list.
    pub struct CalendarListEntry(atom::ATOM_NAMESPACE, "entry") {
        base entry: EntryMembers;
        one {
            color: Color,
            access_level: AccessLevel,
            hidden: Hidden,
            selected: Selected,
            timezone: Timezone,
            r#where: Where,
        }
    }
}

atom_element! {
    pub struct CalendarListFeed(atom::ATOM_NAMESPACE, "feed") {
        base feed: GDataFeedMembers;
        many {
            entry: CalendarListEntry,
        }
    }
}

atom_element! {
    /// One access rule of a calendar.
    pub struct CalendarAclEntry(atom::ATOM_NAMESPACE, "entry") {
        base entry: EntryMembers;
        one {
            scope: Scope,
            role: Role,
        }
    }
}

atom_element! {
    pub struct CalendarAclFeed(atom::ATOM_NAMESPACE, "feed") {
        base feed: GDataFeedMembers;
        many {
            entry: CalendarAclEntry,
        }
    }
}

atom_element! {
    pub struct CalendarEventCommentEntry(atom::ATOM_NAMESPACE, "entry") {
        base entry: EntryMembers;
    }
}

atom_element! {
    pub struct CalendarEventCommentFeed(atom::ATOM_NAMESPACE, "feed") {
        base feed: GDataFeedMembers;
        many {
            entry: CalendarEventCommentEntry,
        }
    }
}

atom_element! {
    pub struct CalendarEventEntry(atom::ATOM_NAMESPACE, "entry") {
        base entry: EntryMembers;
        one {
            visibility: Visibility,
            transparency: Transparency,
            event_status: EventStatus,
            recurrence: Recurrence,
            send_event_notifications: SendEventNotifications,
            quick_add: QuickAdd,
            comments: Comments,
            original_event: OriginalEvent,
        }
        many {
            r#where: Where,
            when: When,
            who: Who,
            extended_property: ExtendedProperty,
            recurrence_exception: RecurrenceException,
        }
    }
}

impl CalendarEventEntry {
    /// An event for the server to build from free text such as "Tennis with John April 3 3pm".
    pub fn quick_add(text: impl Into<String>) -> Self {
        let mut event = Self::default();
        event.content = Some(atom::Content::plain(text));
        event.quick_add = Some(QuickAdd::new("true"));
        event
    }

    /// The first link embedding web content, bound with its [`WebContent`].
    pub fn web_content_link(&self) -> eyre::Result<Option<WebContentLink>> {
        self.link
            .iter()
            .find(|link| link.rel.as_deref() == Some(WEB_CONTENT_LINK_REL))
            .map(|link| WebContentLink::from_element(link.to_element()))
            .transpose()
    }

    /// Replaces any web content links with `link`.
    pub fn set_web_content_link(&mut self, link: &WebContentLink) -> eyre::Result<()> {
        let link = Link::from_element(link.to_element())?;
        self.link
            .retain(|existing| existing.rel.as_deref() != Some(WEB_CONTENT_LINK_REL));
        self.link.push(link);
        Ok(())
    }
}

atom_element! {
    pub struct CalendarEventFeed(atom::ATOM_NAMESPACE, "feed") {
        base feed: GDataFeedMembers;
        many {
            entry: CalendarEventEntry,
        }
    }
}

atom_feed! {
    CalendarListFeed => CalendarListEntry,
    CalendarAclFeed => CalendarAclEntry,
    CalendarEventCommentFeed => CalendarEventCommentEntry,
    CalendarEventFeed => CalendarEventEntry,
}
