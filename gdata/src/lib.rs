//! Clients for Google Data APIs, YouTube and Calendar, built on the [`atom`] element binding.
//!
//! [`GDataService`] speaks Atom to any GData server. [`youtube::YouTubeService`] and
//! [`calendar::CalendarService`] wrap it with typed operations for their product, and deref to
//! it for everything else.
//!
//! ```no_run
//! # async fn run() -> eyre::Result<()> {
//! use gdata::youtube::{StandardFeed, YouTubeService};
//!
//! let youtube = YouTubeService::new(atom::http::ReqwestClient::new()).with_developer_key("key");
//! let feed = youtube.get_standard_feed(StandardFeed::MostViewed).await?;
//! for video in &feed.entry {
//!     println!("{:?}", video.video_id());
//! }
//! # Ok(())
//! # }
//! ```

pub mod calendar;
pub mod data;
pub mod media;
pub mod paging;
pub mod service;
pub mod youtube;

pub use atom;
pub use data::{AtomFeed, EntryLink, FeedLink, GDataEntry, GDataFeed, GDataFeedMembers};
pub use service::{GDataService, MediaSource, Query, RequestError};
