//! Cursor-driven page sequences over a [`ResourceCache`].
//!
//! A [`PageSequence`] walks a collection one page at a time. Each page is an
//! ordinary cache entry keyed by `(kind, cursor, page size, params)`, so
//! pages get deduplication, staleness and retry like any other request. The
//! sequence itself is not cached: it is rebuilt by walking pages from the
//! start using the cursors recorded along the way.
//!
//! `next_page` takes `&mut self`, which rules out two page loads running on
//! the same sequence at once and keeps items in request order.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::ResourceCache;
use crate::key::{CacheKey, Identifier, Params, ResourceKind, make_key};
use crate::{CacheError, Result, telemetry};

/// Position within a paginated collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Nothing loaded yet.
    Start,
    /// Continuation token returned by the previous page.
    Token(String),
    /// The source reported no further pages.
    Exhausted,
}

/// One page as returned by a [`PageSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation token, or `None` if this is the last page.
    pub next: Option<String>,
}

/// Items produced by one [`PageSequence::next_page`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    /// Cursor after this page.
    pub cursor: Cursor,
}

/// Coarse state of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencePhase {
    Initial,
    Loaded,
    Exhausted,
}

/// Upstream that can produce pages of `T`.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Fetch the page at `cursor` (`None` for the first page).
    async fn fetch_page(&self, cursor: Option<&str>, page_size: usize) -> Result<Page<T>>;
}

/// Ordered, incrementally loaded view over a paginated collection.
pub struct PageSequence<T> {
    cache: ResourceCache<Page<T>>,
    source: Arc<dyn PageSource<T>>,
    kind: ResourceKind,
    params: Params,
    page_size: usize,
    cursor: Cursor,
    page_keys: Vec<CacheKey>,
    items: Vec<T>,
}

impl<T: Clone + Send + Sync + 'static> PageSequence<T> {
    /// Create a sequence positioned at the start of the collection.
    ///
    /// The page size defaults to the cache's configured `page_size`.
    pub fn new(
        cache: ResourceCache<Page<T>>,
        source: Arc<dyn PageSource<T>>,
        kind: impl Into<String>,
        params: Params,
    ) -> Result<Self> {
        let page_size = cache.options().page_size;
        Ok(Self {
            cache,
            source,
            kind: ResourceKind::new(kind)?,
            params,
            page_size,
            cursor: Cursor::Start,
            page_keys: Vec::new(),
            items: Vec::new(),
        })
    }

    /// Override the number of items requested per page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Load the next page and append its items.
    ///
    /// On an exhausted sequence this returns an empty list without fetching.
    /// On error the cursor is unchanged, so calling again retries the same
    /// page.
    pub async fn next_page(&mut self) -> Result<PageResult<T>> {
        let token = match &self.cursor {
            Cursor::Exhausted => {
                return Ok(PageResult {
                    items: Vec::new(),
                    cursor: Cursor::Exhausted,
                });
            }
            Cursor::Start => None,
            Cursor::Token(token) => Some(token.clone()),
        };

        let key = self.page_key(token.as_deref())?;
        let source = Arc::clone(&self.source);
        let page_size = self.page_size;
        let page = self
            .cache
            .request(&key, move || {
                let source = Arc::clone(&source);
                let token = token.clone();
                async move { source.fetch_page(token.as_deref(), page_size).await }
            })
            .await?;

        self.items.extend(page.items.iter().cloned());
        self.page_keys.push(key);
        // An empty continuation token ends the sequence like an absent one.
        self.cursor = match page.next {
            Some(next) if !next.is_empty() => Cursor::Token(next),
            _ => Cursor::Exhausted,
        };

        metrics::counter!(telemetry::PAGES_TOTAL, "kind" => self.kind.to_string()).increment(1);
        info!(
            kind = %self.kind,
            page = self.page_keys.len(),
            items = page.items.len(),
            total = self.items.len(),
            exhausted = self.is_exhausted(),
            "loaded page"
        );

        Ok(PageResult {
            items: page.items,
            cursor: self.cursor.clone(),
        })
    }

    /// Load pages until the sequence is exhausted or `max_pages` pages have
    /// been loaded by this call.
    pub async fn load_pages(&mut self, max_pages: usize) -> Result<&[T]> {
        for _ in 0..max_pages {
            if self.is_exhausted() {
                break;
            }
            self.next_page().await?;
        }
        Ok(&self.items)
    }

    /// All items loaded so far, in page order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Cache keys of the pages loaded so far, in order.
    pub fn page_keys(&self) -> &[CacheKey] {
        &self.page_keys
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor == Cursor::Exhausted
    }

    /// Whether another `next_page` call could return items.
    pub fn has_next_page(&self) -> bool {
        !self.is_exhausted()
    }

    pub fn phase(&self) -> SequencePhase {
        match (&self.cursor, self.page_keys.is_empty()) {
            (Cursor::Exhausted, _) => SequencePhase::Exhausted,
            (_, true) => SequencePhase::Initial,
            (_, false) => SequencePhase::Loaded,
        }
    }

    /// Rewind to the start. Cached pages stay in the cache.
    pub fn reset(&mut self) {
        self.cursor = Cursor::Start;
        self.page_keys.clear();
        self.items.clear();
    }

    /// Cache key for the page at `token`. The first page carries no
    /// `cursor` param, so no token can alias it.
    fn page_key(&self, token: Option<&str>) -> Result<CacheKey> {
        let mut params = self.params.clone().with("page_size", self.page_size);
        if let Some(token) = token {
            params.insert("cursor", token);
        }
        make_key(
            self.kind.as_str(),
            Identifier::Name("page".into()),
            params,
        )
    }
}

/// Pages over a list that is already in memory, using item offsets as
/// cursors.
pub struct SlicePageSource<T> {
    items: Arc<Vec<T>>,
}

impl<T> SlicePageSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Arc::new(items),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl<T: Clone + Send + Sync> PageSource<T> for SlicePageSource<T> {
    async fn fetch_page(&self, cursor: Option<&str>, page_size: usize) -> Result<Page<T>> {
        let start = match cursor {
            None => 0,
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| CacheError::InvalidKey(format!("invalid offset cursor: {raw}")))?,
        };
        let start = start.min(self.items.len());
        let end = start.saturating_add(page_size.max(1)).min(self.items.len());
        Ok(Page {
            items: self.items[start..end].to_vec(),
            next: (end < self.items.len()).then(|| end.to_string()),
        })
    }
}
