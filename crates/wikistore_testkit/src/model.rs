//! A reference model of the store for property tests.
//!
//! The model predicts the outcome of every [`StoreOp`] and the exact
//! identifiers the store hands out; [`ReferenceModel::check`] compares the
//! store's listings against it.

use crate::fixtures::TestStore;
use crate::generators::StoreOp;
use std::collections::BTreeMap;
use wikistore_core::store::FRONT_PAGE_NAME;
use wikistore_core::{PageClass, PageId, StoreError, StoreResult, WikiId};

/// Identifier used for slots past the end of a listing.
const MISSING_BASE: i64 = 1_000_000;

/// The kind of result an operation had.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Succeeded.
    Ok,
    /// Failed with `DuplicateName`.
    Duplicate,
    /// Failed with `NotFound`.
    NotFound,
    /// Failed with `CoverConflict`.
    Cover,
    /// Failed any other way.
    Other(String),
}

impl Outcome {
    /// Classifies a store result.
    pub fn of<T>(result: &StoreResult<T>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(StoreError::DuplicateName { .. }) => Self::Duplicate,
            Err(StoreError::NotFound { .. }) => Self::NotFound,
            Err(StoreError::CoverConflict { .. }) => Self::Cover,
            Err(err) => Self::Other(err.to_string()),
        }
    }
}

/// A modelled page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPage {
    /// Expected identifier.
    pub id: PageId,
    /// Expected class.
    pub class: PageClass,
}

/// A modelled wiki.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelWiki {
    /// Wiki name.
    pub name: String,
    /// Pages by title.
    pub pages: BTreeMap<String, ModelPage>,
}

/// The expected state of a store.
#[derive(Debug, Clone)]
pub struct ReferenceModel {
    wikis: BTreeMap<WikiId, ModelWiki>,
    next_wiki: i64,
    next_page: i64,
}

impl Default for ReferenceModel {
    fn default() -> Self {
        Self {
            wikis: BTreeMap::new(),
            next_wiki: 1,
            next_page: 1,
        }
    }
}

impl ReferenceModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Modelled wikis by identifier.
    pub fn wikis(&self) -> &BTreeMap<WikiId, ModelWiki> {
        &self.wikis
    }

    /// Resolves a wiki slot to an identifier.
    pub fn wiki_at(&self, slot: usize) -> WikiId {
        self.wikis
            .keys()
            .nth(slot)
            .copied()
            .unwrap_or(WikiId(MISSING_BASE + slot as i64))
    }

    /// Resolves a page slot within `wiki` to an identifier.
    pub fn page_at(&self, wiki: WikiId, slot: usize) -> PageId {
        self.wikis
            .get(&wiki)
            .and_then(|w| w.pages.values().nth(slot % w.pages.len().max(1)))
            .map(|p| p.id)
            .unwrap_or(PageId(MISSING_BASE + slot as i64))
    }

    fn page_title(&self, wiki: WikiId, id: PageId) -> Option<String> {
        self.wikis
            .get(&wiki)?
            .pages
            .iter()
            .find(|(_, p)| p.id == id)
            .map(|(title, _)| title.clone())
    }

    fn name_taken(&self, name: &str, except: Option<WikiId>) -> bool {
        self.wikis
            .iter()
            .any(|(id, w)| w.name == name && Some(*id) != except)
    }

    fn allocate_page(&mut self) -> PageId {
        let id = PageId(self.next_page);
        self.next_page += 1;
        id
    }

    /// Applies `op` to the model and returns the expected outcome.
    pub fn apply(&mut self, op: &StoreOp) -> Outcome {
        match op {
            StoreOp::CreateWiki { name } => {
                if self.name_taken(name, None) {
                    return Outcome::Duplicate;
                }
                let id = WikiId(self.next_wiki);
                self.next_wiki += 1;
                let front = ModelPage {
                    id: self.allocate_page(),
                    class: PageClass::Cover,
                };
                let pages = BTreeMap::from([(FRONT_PAGE_NAME.to_string(), front)]);
                self.wikis.insert(
                    id,
                    ModelWiki {
                        name: name.clone(),
                        pages,
                    },
                );
                Outcome::Ok
            }
            StoreOp::RenameWiki { wiki, name } => {
                let id = self.wiki_at(*wiki);
                if !self.wikis.contains_key(&id) {
                    return Outcome::NotFound;
                }
                if self.name_taken(name, Some(id)) {
                    return Outcome::Duplicate;
                }
                if let Some(w) = self.wikis.get_mut(&id) {
                    w.name = name.clone();
                }
                Outcome::Ok
            }
            StoreOp::DeleteWiki { wiki } => {
                let id = self.wiki_at(*wiki);
                match self.wikis.remove(&id) {
                    Some(_) => Outcome::Ok,
                    None => Outcome::NotFound,
                }
            }
            StoreOp::CreatePage { wiki, title } => {
                let id = self.wiki_at(*wiki);
                let Some(w) = self.wikis.get(&id) else {
                    return Outcome::NotFound;
                };
                if w.pages.contains_key(title) {
                    return Outcome::Duplicate;
                }
                let page = ModelPage {
                    id: self.allocate_page(),
                    class: PageClass::Entry,
                };
                if let Some(w) = self.wikis.get_mut(&id) {
                    w.pages.insert(title.clone(), page);
                }
                Outcome::Ok
            }
            StoreOp::SavePage { wiki, page, title } => {
                let wiki = self.wiki_at(*wiki);
                let page = self.page_at(wiki, *page);
                let Some(old) = self.page_title(wiki, page) else {
                    return Outcome::NotFound;
                };
                let Some(w) = self.wikis.get_mut(&wiki) else {
                    return Outcome::NotFound;
                };
                if *title != old && w.pages.contains_key(title) {
                    return Outcome::Duplicate;
                }
                if let Some(entry) = w.pages.remove(&old) {
                    w.pages.insert(title.clone(), entry);
                }
                Outcome::Ok
            }
            StoreOp::DeletePage { wiki, page } => {
                let wiki = self.wiki_at(*wiki);
                let page = self.page_at(wiki, *page);
                let Some(title) = self.page_title(wiki, page) else {
                    return Outcome::NotFound;
                };
                let Some(w) = self.wikis.get_mut(&wiki) else {
                    return Outcome::NotFound;
                };
                if w.pages.get(&title).map(|p| p.class) == Some(PageClass::Cover) {
                    return Outcome::Cover;
                }
                w.pages.remove(&title);
                Outcome::Ok
            }
            StoreOp::Tick { .. } => Outcome::Ok,
        }
    }

    /// Runs `op` against `store`, resolving slots against this model.
    ///
    /// Call before [`ReferenceModel::apply`] for the same operation.
    pub fn run(&self, store: &TestStore, op: &StoreOp) -> Outcome {
        match op {
            StoreOp::CreateWiki { name } => Outcome::of(&store.create_wiki(name, "")),
            StoreOp::RenameWiki { wiki, name } => {
                Outcome::of(&store.rename_wiki(self.wiki_at(*wiki), name, "renamed"))
            }
            StoreOp::DeleteWiki { wiki } => Outcome::of(&store.delete_wiki(self.wiki_at(*wiki))),
            StoreOp::CreatePage { wiki, title } => {
                Outcome::of(&store.create_page(self.wiki_at(*wiki), title))
            }
            StoreOp::SavePage { wiki, page, title } => {
                let wiki = self.wiki_at(*wiki);
                let result = store.get_page(wiki, self.page_at(wiki, *page)).and_then(|mut p| {
                    p.name = title.clone();
                    p.contents = format!("{} revised", p.contents);
                    store.save_page(&p)
                });
                Outcome::of(&result)
            }
            StoreOp::DeletePage { wiki, page } => {
                let wiki = self.wiki_at(*wiki);
                Outcome::of(&store.delete_page(wiki, self.page_at(wiki, *page)))
            }
            StoreOp::Tick { micros } => {
                store.tick(*micros);
                Outcome::Ok
            }
        }
    }

    /// Compares every listing of `store` with the model.
    ///
    /// Returns a description of the first difference.
    pub fn check(&self, store: &TestStore) -> Result<(), String> {
        let listed: Vec<(WikiId, String)> = store
            .list_wikis()
            .map_err(|e| e.to_string())?
            .into_iter()
            .map(|w| (w.id, w.name))
            .collect();
        let mut expected: Vec<(WikiId, String)> =
            self.wikis.iter().map(|(id, w)| (*id, w.name.clone())).collect();
        expected.sort_by(|a, b| a.1.cmp(&b.1));
        if listed != expected {
            return Err(format!("wikis: listed {listed:?}, expected {expected:?}"));
        }

        for (id, wiki) in &self.wikis {
            let by_title = store.list_pages_by_title(*id).map_err(|e| e.to_string())?;
            let got: Vec<(&str, PageId, PageClass)> = by_title
                .iter()
                .map(|p| (p.name.as_str(), p.id, p.class))
                .collect();
            let want: Vec<(&str, PageId, PageClass)> = wiki
                .pages
                .iter()
                .map(|(title, p)| (title.as_str(), p.id, p.class))
                .collect();
            if got != want {
                return Err(format!("pages of {id}: listed {got:?}, expected {want:?}"));
            }

            let count = store.count_pages(*id).map_err(|e| e.to_string())?;
            if count != wiki.pages.len() {
                return Err(format!("count of {id}: {count} != {}", wiki.pages.len()));
            }

            let by_recency = store.list_pages_by_recency(*id).map_err(|e| e.to_string())?;
            if by_recency.len() != by_title.len() {
                return Err(format!("recency listing of {id} has {} pages", by_recency.len()));
            }
            for pair in by_recency.windows(2) {
                let ordered = pair[0].last_updated > pair[1].last_updated
                    || (pair[0].last_updated == pair[1].last_updated && pair[0].id < pair[1].id);
                if !ordered {
                    return Err(format!("recency order of {id} broken at {pair:?}"));
                }
            }
            let mut recency_ids: Vec<PageId> = by_recency.iter().map(|p| p.id).collect();
            let mut title_ids: Vec<PageId> = by_title.iter().map(|p| p.id).collect();
            recency_ids.sort();
            title_ids.sort();
            if recency_ids != title_ids {
                return Err(format!("recency listing of {id} covers other pages"));
            }
        }
        Ok(())
    }
}
