//! Media RSS elements, as YouTube uses them to describe videos.

use crate::youtube::{Duration, Private, VideoId, YOUTUBE_NAMESPACE};
use atom::{XmlName, atom_element};

pub const MEDIA_NAMESPACE: &str = "http://search.yahoo.com/mrss/";

atom_element! {
    pub struct Title(MEDIA_NAMESPACE, "title") {
        attributes {
            title_type: String = "type",
        }
    }
}

atom_element! {
    pub struct Description(MEDIA_NAMESPACE, "description") {
        attributes {
            description_type: String = "type",
        }
    }
}

impl Description {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            description_type: Some("plain".to_string()),
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

atom_element! {
    /// Comma-separated keywords.
    pub struct Keywords(MEDIA_NAMESPACE, "keywords") {}
}

atom_element! {
    /// A category; the term is the element's text.
    pub struct Category(MEDIA_NAMESPACE, "category") {
        attributes {
            scheme: String = "scheme",
            label: String = "label",
        }
    }
}

impl Category {
    pub fn new(scheme: impl Into<String>, term: impl Into<String>) -> Self {
        let term = term.into();
        Self {
            scheme: Some(scheme.into()),
            label: Some(term.clone()),
            text: Some(term),
            ..Default::default()
        }
    }
}

atom_element! {
    pub struct Player(MEDIA_NAMESPACE, "player") {
        attributes {
            url: String = "url",
        }
    }
}

atom_element! {
    /// One rendition of the media.
    pub struct Content(MEDIA_NAMESPACE, "content") {
        attributes {
            url: String = "url",
            content_type: String = "type",
            medium: String = "medium",
            is_default: String = "isDefault",
            expression: String = "expression",
            duration: String = "duration",
        }
    }
}

impl Content {
    /// YouTube's format code for this rendition (`yt:format`), kept as an extension attribute.
    pub fn format(&self) -> Option<&str> {
        self.extension_attributes
            .get(&XmlName::new(YOUTUBE_NAMESPACE, "format"))
            .map(String::as_str)
    }
}

atom_element! {
    pub struct Thumbnail(MEDIA_NAMESPACE, "thumbnail") {
        attributes {
            url: String = "url",
            width: String = "width",
            height: String = "height",
            time: String = "time",
        }
    }
}

atom_element! {
    pub struct Credit(MEDIA_NAMESPACE, "credit") {
        attributes {
            role: String = "role",
            scheme: String = "scheme",
        }
    }
}

atom_element! {
    /// Everything known about a video's media.
    pub struct Group(MEDIA_NAMESPACE, "group") {
        one {
            title: Title,
            description: Description,
            keywords: Keywords,
            player: Player,
            credit: Credit,
            duration: Duration,
            private: Private,
            video_id: VideoId,
        }
        many {
            category: Category,
            content: Content,
            thumbnail: Thumbnail,
        }
    }
}
