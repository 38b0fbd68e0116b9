//! Value objects passed across the store boundary.

use crate::error::{StoreError, StoreResult};
use crate::types::{PageId, WikiId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Class of a wiki page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PageClass {
    /// A regular entry.
    #[default]
    Entry,
    /// An article-type entry, rendered with emphasis.
    Article,
    /// The wiki's landing page; exactly one per wiki.
    Cover,
}

impl PageClass {
    /// Stored column value.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Entry => 0,
            Self::Article => 1,
            Self::Cover => 2,
        }
    }

    /// Decodes a stored column value.
    pub fn from_code(code: i64) -> StoreResult<Self> {
        match code {
            0 => Ok(Self::Entry),
            1 => Ok(Self::Article),
            2 => Ok(Self::Cover),
            other => Err(StoreError::codec(format!("unknown page class {other}"))),
        }
    }
}

impl fmt::Display for PageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Entry => "Entry",
            Self::Article => "Article",
            Self::Cover => "Cover",
        })
    }
}

/// A wiki container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wiki {
    /// Store-assigned identifier.
    pub id: WikiId,
    /// Unique name.
    pub name: String,
    /// Free-text description; may be empty.
    pub description: String,
}

/// A page with its contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Store-assigned identifier, unique across all wikis.
    pub id: PageId,
    /// Owning wiki.
    pub wiki: WikiId,
    /// Name, unique within the owning wiki.
    pub name: String,
    /// Page class.
    pub class: PageClass,
    /// Page body.
    pub contents: String,
    /// Time of the last content-affecting write.
    pub last_updated: DateTime<Utc>,
}

impl Page {
    /// The body-less projection of this page.
    #[must_use]
    pub fn index_entry(&self) -> PageIndexEntry {
        PageIndexEntry {
            id: self.id,
            wiki: self.wiki,
            name: self.name.clone(),
            class: self.class,
            last_updated: self.last_updated,
        }
    }
}

/// A page's identity and classification without its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageIndexEntry {
    /// Page identifier.
    pub id: PageId,
    /// Owning wiki.
    pub wiki: WikiId,
    /// Page name.
    pub name: String,
    /// Page class.
    pub class: PageClass,
    /// Time of the last content-affecting write.
    pub last_updated: DateTime<Utc>,
}
