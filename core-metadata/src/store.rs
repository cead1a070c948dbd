//! # Frame Store
//!
//! Owns every entry decoded from the current tag: text frames (including
//! lyrics), comments, TXXX extras and pictures. Convenience fields such as
//! title or artist are kept as indices into the text and comment lists and are
//! recomputed by [`FrameStore::link`] after each parse.

use std::fmt;

use bytes::Bytes;

use crate::error::Result;

/// Four-character frame identifier, e.g. `TIT2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameId(pub [u8; 4]);

impl FrameId {
    pub const TITLE: FrameId = FrameId(*b"TIT2");
    pub const ARTIST: FrameId = FrameId(*b"TPE1");
    pub const ALBUM: FrameId = FrameId(*b"TALB");
    pub const YEAR: FrameId = FrameId(*b"TYER");
    pub const GENRE: FrameId = FrameId(*b"TCON");
    pub const COMMENT: FrameId = FrameId(*b"COMM");
    pub const EXTRA: FrameId = FrameId(*b"TXXX");
    pub const RVA2: FrameId = FrameId(*b"RVA2");
    pub const LYRICS: FrameId = FrameId(*b"USLT");
    pub const PICTURE: FrameId = FrameId(*b"APIC");

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// The id as text; frame ids are restricted to `0-9A-Z` once parsed.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Undecoded field bytes, each starting with its encoding byte.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawText {
    pub description: Bytes,
    pub text: Bytes,
}

/// One decoded text, comment, lyrics or TXXX frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextEntry {
    pub id: FrameId,
    /// ISO-639-2 language code (comments and lyrics only).
    pub lang: [u8; 3],
    pub description: String,
    pub text: String,
    /// Present when the parser keeps plain ID3 text.
    pub raw: Option<RawText>,
}

impl TextEntry {
    pub fn lang_str(&self) -> &str {
        std::str::from_utf8(&self.lang)
            .map(|s| s.trim_end_matches('\0'))
            .unwrap_or("")
    }
}

/// One APIC frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Picture {
    pub mime_type: String,
    pub description: String,
    /// APIC picture type, e.g. 3 for the front cover.
    pub picture_type: u8,
    pub data: Bytes,
}

/// Selects one of the text-shaped lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextList {
    Text,
    Comment,
    Extra,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Links {
    title: Option<usize>,
    artist: Option<usize>,
    album: Option<usize>,
    year: Option<usize>,
    genre: Option<usize>,
    comment: Option<usize>,
}

/// Growable lists of decoded frames plus linked convenience fields.
#[derive(Debug, Clone, Default)]
pub struct FrameStore {
    texts: Vec<TextEntry>,
    comments: Vec<TextEntry>,
    extras: Vec<TextEntry>,
    pictures: Vec<Picture>,
    links: Links,
}

/// Append a default entry, failing without side effects when memory runs out.
fn grow<T: Default>(list: &mut Vec<T>) -> Result<&mut T> {
    list.try_reserve(1)?;
    let index = list.len();
    list.push(T::default());
    Ok(&mut list[index])
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn list(&self, list: TextList) -> &Vec<TextEntry> {
        match list {
            TextList::Text => &self.texts,
            TextList::Comment => &self.comments,
            TextList::Extra => &self.extras,
        }
    }

    fn list_mut(&mut self, list: TextList) -> &mut Vec<TextEntry> {
        match list {
            TextList::Text => &mut self.texts,
            TextList::Comment => &mut self.comments,
            TextList::Extra => &mut self.extras,
        }
    }

    /// Append an empty entry to `list` and return it for filling in.
    pub fn add(&mut self, list: TextList) -> Result<&mut TextEntry> {
        grow(self.list_mut(list))
    }

    /// Drop the most recently added entry of `list`.
    pub fn pop(&mut self, list: TextList) -> Option<TextEntry> {
        self.list_mut(list).pop()
    }

    /// Most recently added entry of `list`.
    pub fn last_mut(&mut self, list: TextList) -> Option<&mut TextEntry> {
        self.list_mut(list).last_mut()
    }

    pub fn add_picture(&mut self) -> Result<&mut Picture> {
        grow(&mut self.pictures)
    }

    pub fn pop_picture(&mut self) -> Option<Picture> {
        self.pictures.pop()
    }

    pub fn last_picture_mut(&mut self) -> Option<&mut Picture> {
        self.pictures.last_mut()
    }

    /// Free every entry and forget the links.
    pub fn clear(&mut self) {
        self.texts.clear();
        self.comments.clear();
        self.extras.clear();
        self.pictures.clear();
        self.links = Links::default();
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
            && self.comments.is_empty()
            && self.extras.is_empty()
            && self.pictures.is_empty()
    }

    pub fn texts(&self) -> &[TextEntry] {
        &self.texts
    }

    pub fn comments(&self) -> &[TextEntry] {
        &self.comments
    }

    pub fn extras(&self) -> &[TextEntry] {
        &self.extras
    }

    pub fn pictures(&self) -> &[Picture] {
        &self.pictures
    }

    /// Last entry of `list` carrying `id`.
    pub fn find(&self, list: TextList, id: FrameId) -> Option<&TextEntry> {
        self.list(list).iter().rev().find(|entry| entry.id == id)
    }

    /// TXXX entry whose description matches `description` case-insensitively.
    pub fn find_extra(&self, description: &str) -> Option<&TextEntry> {
        self.extras
            .iter()
            .rev()
            .find(|entry| entry.description.eq_ignore_ascii_case(description))
    }

    /// Recompute the convenience fields.
    ///
    /// A later text frame with the same id overrides an earlier one. The
    /// comment is the first one without a description, or the last comment
    /// when every comment has one.
    pub fn link(&mut self) {
        let mut links = Links::default();

        for (index, entry) in self.texts.iter().enumerate() {
            match entry.id {
                FrameId::TITLE => links.title = Some(index),
                FrameId::ALBUM => links.album = Some(index),
                FrameId::ARTIST => links.artist = Some(index),
                FrameId::YEAR => links.year = Some(index),
                FrameId::GENRE => links.genre = Some(index),
                _ => {}
            }
        }

        links.comment = self
            .comments
            .iter()
            .position(|entry| entry.description.is_empty())
            .or_else(|| self.comments.len().checked_sub(1));

        self.links = links;
    }

    fn linked_text(&self, index: Option<usize>) -> Option<&str> {
        index
            .and_then(|i| self.texts.get(i))
            .map(|entry| entry.text.as_str())
    }

    pub fn title(&self) -> Option<&str> {
        self.linked_text(self.links.title)
    }

    pub fn artist(&self) -> Option<&str> {
        self.linked_text(self.links.artist)
    }

    pub fn album(&self) -> Option<&str> {
        self.linked_text(self.links.album)
    }

    pub fn year(&self) -> Option<&str> {
        self.linked_text(self.links.year)
    }

    pub fn genre(&self) -> Option<&str> {
        self.linked_text(self.links.genre)
    }

    pub fn comment(&self) -> Option<&str> {
        self.links
            .comment
            .and_then(|i| self.comments.get(i))
            .map(|entry| entry.text.as_str())
    }
}
