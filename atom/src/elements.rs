//! Atom syndication format elements (RFC 4287) and the Atom Publishing Protocol control element.
//!
//! Entries and feeds of specific services embed [`EntryMembers`] or [`FeedMembers`] as their
//! `base`, and add their own members next to them.

use crate::{AtomElement, atom_element, atom_members};
use eyre::Context;
use jiff::Timestamp;

pub const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";
pub const APP_NAMESPACE: &str = "http://www.w3.org/2007/app";

/// Link relations used by [`LinkFinder`].
pub mod rel {
    pub const SELF: &str = "self";
    pub const EDIT: &str = "edit";
    pub const EDIT_MEDIA: &str = "edit-media";
    pub const NEXT: &str = "next";
    pub const PREVIOUS: &str = "previous";
    pub const ALTERNATE: &str = "alternate";
    pub const LICENSE: &str = "license";
    pub const POST: &str = "http://schemas.google.com/g/2005#post";
    pub const FEED: &str = "http://schemas.google.com/g/2005#feed";
}

atom_element! {
    /// A reference from an entry or feed to a web resource.
    pub struct Link(ATOM_NAMESPACE, "link") {
        attributes {
            rel: String = "rel",
            href: String = "href",
            link_type: String = "type",
            hreflang: String = "hreflang",
            title: String = "title",
            length: String = "length",
        }
    }
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: Some(rel.into()),
            href: Some(href.into()),
            ..Default::default()
        }
    }
}

atom_element! {
    pub struct Category(ATOM_NAMESPACE, "category") {
        attributes {
            term: String = "term",
            scheme: String = "scheme",
            label: String = "label",
        }
    }
}

impl Category {
    pub fn new(scheme: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            scheme: Some(scheme.into()),
            term: Some(term.into()),
            ..Default::default()
        }
    }
}

atom_element! {
    pub struct Name(ATOM_NAMESPACE, "name") {}
}

atom_element! {
    pub struct Email(ATOM_NAMESPACE, "email") {}
}

atom_element! {
    pub struct Uri(ATOM_NAMESPACE, "uri") {}
}

atom_element! {
    /// The person who wrote an entry or feed.
    pub struct Author(ATOM_NAMESPACE, "author") {
        one {
            name: Name,
            email: Email,
            uri: Uri,
        }
    }
}

atom_element! {
    pub struct Contributor(ATOM_NAMESPACE, "contributor") {
        one {
            name: Name,
            email: Email,
            uri: Uri,
        }
    }
}

atom_element! {
    /// Body of an entry, either inline as text or by reference through `src`.
    pub struct Content(ATOM_NAMESPACE, "content") {
        attributes {
            content_type: String = "type",
            src: String = "src",
        }
    }
}

impl Content {
    /// Inline content with type `text`.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            content_type: Some("text".to_string()),
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

atom_element! {
    pub struct Title(ATOM_NAMESPACE, "title") {
        attributes {
            text_type: String = "type",
        }
    }
}

atom_element! {
    pub struct Subtitle(ATOM_NAMESPACE, "subtitle") {
        attributes {
            text_type: String = "type",
        }
    }
}

atom_element! {
    pub struct Rights(ATOM_NAMESPACE, "rights") {
        attributes {
            text_type: String = "type",
        }
    }
}

atom_element! {
    pub struct Summary(ATOM_NAMESPACE, "summary") {
        attributes {
            text_type: String = "type",
        }
    }
}

atom_element! {
    pub struct Id(ATOM_NAMESPACE, "id") {}
}

atom_element! {
    pub struct Published(ATOM_NAMESPACE, "published") {}
}

atom_element! {
    pub struct Updated(ATOM_NAMESPACE, "updated") {}
}

atom_element! {
    pub struct Icon(ATOM_NAMESPACE, "icon") {}
}

atom_element! {
    pub struct Logo(ATOM_NAMESPACE, "logo") {}
}

atom_element! {
    /// The agent that generated a feed.
    pub struct Generator(ATOM_NAMESPACE, "generator") {
        attributes {
            uri: String = "uri",
            version: String = "version",
        }
    }
}

fn parse_timestamp(tag: &str, text: Option<&str>) -> eyre::Result<Timestamp> {
    let text = text.ok_or_else(|| eyre::eyre!("<{tag}> has no text"))?;
    text.trim()
        .parse()
        .with_context(|| format!("parse <{tag}> value '{text}' as a timestamp"))
}

impl Published {
    pub fn timestamp(&self) -> eyre::Result<Timestamp> {
        parse_timestamp(Self::TAG, self.text.as_deref())
    }
}

impl Updated {
    pub fn at(timestamp: Timestamp) -> Self {
        Self::with_text(timestamp.to_string())
    }

    pub fn timestamp(&self) -> eyre::Result<Timestamp> {
        parse_timestamp(Self::TAG, self.text.as_deref())
    }
}

atom_element! {
    /// Whether an entry is a draft (`yes`) or published (`no`).
    pub struct Draft(APP_NAMESPACE, "draft") {}
}

atom_element! {
    /// Publishing controls of an entry. Services put their own status elements in here.
    pub struct Control(APP_NAMESPACE, "control") {
        one {
            draft: Draft,
        }
    }
}

atom_members! {
    /// Members common to every Atom entry.
    pub struct EntryMembers {
        one {
            content: Content,
            id: Id,
            published: Published,
            rights: Rights,
            summary: Summary,
            title: Title,
            updated: Updated,
            control: Control,
        }
        many {
            author: Author,
            category: Category,
            contributor: Contributor,
            link: Link,
        }
    }
}

atom_members! {
    /// Members common to every Atom feed, apart from its entries.
    pub struct FeedMembers {
        one {
            generator: Generator,
            icon: Icon,
            id: Id,
            logo: Logo,
            rights: Rights,
            subtitle: Subtitle,
            title: Title,
            updated: Updated,
        }
        many {
            author: Author,
            category: Category,
            contributor: Contributor,
            link: Link,
        }
    }
}

atom_element! {
    /// A plain Atom entry.
    pub struct Entry(ATOM_NAMESPACE, "entry") {
        base entry: EntryMembers;
    }
}

atom_element! {
    /// A plain Atom feed.
    pub struct Feed(ATOM_NAMESPACE, "feed") {
        base feed: FeedMembers;
        many {
            entry: Entry,
        }
    }
}

/// Lookup of an entry's or feed's links by relation.
pub trait LinkFinder {
    fn links(&self) -> &[Link];

    /// The first link with relation `rel`.
    fn find_link(&self, rel: &str) -> Option<&Link> {
        self.links()
            .iter()
            .find(|link| link.rel.as_deref() == Some(rel))
    }

    /// The `href` of the first link with relation `rel`.
    fn find_href(&self, rel: &str) -> Option<&str> {
        self.find_link(rel)?.href.as_deref()
    }

    fn self_link(&self) -> Option<&Link> {
        self.find_link(rel::SELF)
    }

    fn edit_link(&self) -> Option<&Link> {
        self.find_link(rel::EDIT)
    }

    fn edit_media_link(&self) -> Option<&Link> {
        self.find_link(rel::EDIT_MEDIA)
    }

    fn next_link(&self) -> Option<&Link> {
        self.find_link(rel::NEXT)
    }

    fn prev_link(&self) -> Option<&Link> {
        self.find_link(rel::PREVIOUS)
    }

    fn post_link(&self) -> Option<&Link> {
        self.find_link(rel::POST)
    }

    fn feed_link(&self) -> Option<&Link> {
        self.find_link(rel::FEED)
    }

    fn license_link(&self) -> Option<&Link> {
        self.find_link(rel::LICENSE)
    }

    fn alternate_link(&self) -> Option<&Link> {
        self.find_link(rel::ALTERNATE)
    }

    /// The alternate link pointing at an HTML page.
    fn html_link(&self) -> Option<&Link> {
        self.links().iter().find(|link| {
            link.rel.as_deref() == Some(rel::ALTERNATE)
                && link.link_type.as_deref() == Some("text/html")
        })
    }
}

impl LinkFinder for EntryMembers {
    fn links(&self) -> &[Link] {
        &self.link
    }
}

impl LinkFinder for FeedMembers {
    fn links(&self) -> &[Link] {
        &self.link
    }
}
