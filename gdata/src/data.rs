//! Elements shared by every Google Data feed: the `gd` kinds and OpenSearch result counters.

use atom::{
    AtomElement, EntryMembers, FeedMembers, Link, LinkFinder, atom_element, atom_members,
};
use eyre::Context;

pub const GDATA_NAMESPACE: &str = "http://schemas.google.com/g/2005";
pub const OPENSEARCH_NAMESPACE: &str = "http://a9.com/-/spec/opensearchrss/1.0/";

atom_element! {
    pub struct TotalResults(OPENSEARCH_NAMESPACE, "totalResults") {}
}

atom_element! {
    pub struct StartIndex(OPENSEARCH_NAMESPACE, "startIndex") {}
}

atom_element! {
    pub struct ItemsPerPage(OPENSEARCH_NAMESPACE, "itemsPerPage") {}
}

fn parse_counter(tag: &str, text: Option<&str>) -> eyre::Result<Option<u64>> {
    text.map(|text| {
        text.trim()
            .parse()
            .with_context(|| format!("parse <{tag}> value '{text}' as a number"))
    })
    .transpose()
}

impl TotalResults {
    pub fn value(&self) -> eyre::Result<Option<u64>> {
        parse_counter(Self::TAG, self.text.as_deref())
    }
}

impl StartIndex {
    pub fn value(&self) -> eyre::Result<Option<u64>> {
        parse_counter(Self::TAG, self.text.as_deref())
    }
}

impl ItemsPerPage {
    pub fn value(&self) -> eyre::Result<Option<u64>> {
        parse_counter(Self::TAG, self.text.as_deref())
    }
}

atom_members! {
    /// The members of a feed returned by a GData service.
    pub struct GDataFeedMembers {
        base feed: FeedMembers;
        one {
            total_results: TotalResults,
            start_index: StartIndex,
            items_per_page: ItemsPerPage,
        }
    }
}

impl LinkFinder for GDataFeedMembers {
    fn links(&self) -> &[Link] {
        &self.feed.link
    }
}

atom_element! {
    /// An entry with no service-specific members.
    pub struct GDataEntry(atom::ATOM_NAMESPACE, "entry") {
        base entry: EntryMembers;
    }
}

atom_element! {
    pub struct GDataFeed(atom::ATOM_NAMESPACE, "feed") {
        base feed: GDataFeedMembers;
        many {
            entry: GDataEntry,
        }
    }
}

atom_element! {
    /// A link to a feed, optionally with the feed inlined.
    pub struct FeedLink(GDATA_NAMESPACE, "feedLink") {
        attributes {
            rel: String = "rel",
            href: String = "href",
            read_only: String = "readOnly",
            count_hint: String = "countHint",
        }
        one {
            feed: GDataFeed,
        }
    }
}

impl FeedLink {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: Some(rel.into()),
            href: Some(href.into()),
            ..Default::default()
        }
    }
}

atom_element! {
    /// A link to an entry, optionally with the entry inlined.
    pub struct EntryLink(GDATA_NAMESPACE, "entryLink") {
        attributes {
            rel: String = "rel",
            href: String = "href",
            read_only: String = "readOnly",
        }
        one {
            entry: GDataEntry,
        }
    }
}

atom_element! {
    pub struct Rating(GDATA_NAMESPACE, "rating") {
        attributes {
            min: String = "min",
            max: String = "max",
            num_raters: String = "numRaters",
            average: String = "average",
            value: String = "value",
        }
    }
}

atom_element! {
    pub struct Comments(GDATA_NAMESPACE, "comments") {
        attributes {
            rel: String = "rel",
        }
        one {
            feed_link: FeedLink,
        }
    }
}

/// A feed type that yields entries of a single type.
///
/// Implemented by every feed in this crate, so that generic code such as
/// [`GDataService::feed_entries`](crate::GDataService::feed_entries) can page through them.
pub trait AtomFeed: AtomElement + Send + 'static {
    type Entry: AtomElement + Send + Unpin + 'static;

    fn entries(&self) -> &[Self::Entry];

    fn into_entries(self) -> Vec<Self::Entry>;

    /// The `href` of the feed's `next` link, if there are more results.
    fn next_href(&self) -> Option<&str>;
}

/// Implements [`AtomFeed`] for a feed whose base is [`GDataFeedMembers`] and whose entries live
/// in an `entry` member.
macro_rules! atom_feed {
    ($($feed:ty => $entry:ty),* $(,)?) => {
        $(
            impl $crate::data::AtomFeed for $feed {
                type Entry = $entry;

                fn entries(&self) -> &[$entry] {
                    &self.entry
                }

                fn into_entries(self) -> Vec<$entry> {
                    self.entry
                }

                fn next_href(&self) -> Option<&str> {
                    ::atom::LinkFinder::find_href(&self.feed, ::atom::rel::NEXT)
                }
            }
        )*
    };
}
pub(crate) use atom_feed;

atom_feed!(GDataFeed => GDataEntry);
