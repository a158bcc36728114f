//! Keeps the query state mirrored in the address bar.
//!
//! The state is stored as JSON in a single `req` query parameter. Each state
//! change pushes one history entry, except the change that follows a
//! back/forward navigation: restoring from history must not push the restored
//! location again, or the back button would loop.

use log::{debug, warn};
use url::Url;

use crate::error::ArtQueryError;
use crate::request_body::SearchRequest;
use crate::state::QueryState;

pub const REQ_PARAM: &str = "req";

/// Browser-style session history.
pub trait History: Send {
    /// The current location.
    fn location(&self) -> Url;

    /// Adds a new entry and makes it current.
    fn push_state(&mut self, url: Url);
}

/// In-process history with back/forward navigation.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<Url>,
    index: usize,
}

impl MemoryHistory {
    pub fn new(initial: Url) -> Self {
        MemoryHistory {
            entries: vec![initial],
            index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Moves one entry back. Returns the new location, or `None` at the start.
    pub fn back(&mut self) -> Option<Url> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(self.entries[self.index].clone())
    }

    /// Moves one entry forward. Returns the new location, or `None` at the end.
    pub fn forward(&mut self) -> Option<Url> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        Some(self.entries[self.index].clone())
    }
}

impl History for MemoryHistory {
    fn location(&self) -> Url {
        self.entries[self.index].clone()
    }

    fn push_state(&mut self, url: Url) {
        // Pushing discards any forward entries, like a browser does.
        self.entries.truncate(self.index + 1);
        self.entries.push(url);
        self.index = self.entries.len() - 1;
    }
}

/// Read-once marker set before a popstate restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Suppression {
    #[default]
    Clear,
    Suppressed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Pushed(Url),
    Suppressed,
}

pub struct UrlSync<H: History> {
    history: H,
    suppression: Suppression,
}

impl<H: History> UrlSync<H> {
    pub fn new(history: H) -> Self {
        UrlSync {
            history,
            suppression: Suppression::Clear,
        }
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    pub fn suppression(&self) -> Suppression {
        self.suppression
    }

    /// Decodes the state held in the `req` parameter of `url`.
    ///
    /// A missing parameter and a malformed one both yield `None`; the caller
    /// falls back to its default state either way.
    pub fn read(url: &Url) -> Option<QueryState> {
        let raw = url
            .query_pairs()
            .find(|(key, _)| key == REQ_PARAM)
            .map(|(_, value)| value.into_owned())?;

        match SearchRequest::from_json(&raw) {
            Ok(request) => Some(request.into_state()),
            Err(e) => {
                warn!("Ignoring malformed '{}' parameter: {}", REQ_PARAM, e);
                None
            }
        }
    }

    /// Decodes the state held in the current location.
    pub fn read_current(&self) -> Option<QueryState> {
        Self::read(&self.history.location())
    }

    /// Builds the location for `state`, keeping any other query parameters.
    pub fn encode(base: &Url, state: &QueryState) -> Result<Url, ArtQueryError> {
        let json = SearchRequest::from_state(state).to_json()?;

        let others: Vec<(String, String)> = base
            .query_pairs()
            .filter(|(key, _)| key != REQ_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut url = base.clone();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(others)
            .append_pair(REQ_PARAM, &json);
        Ok(url)
    }

    /// Pushes a history entry for `state`, unless a restore is in progress.
    /// A pending suppression is consumed by this call whatever triggered it.
    pub fn write(&mut self, state: &QueryState) -> Result<WriteOutcome, ArtQueryError> {
        if self.suppression == Suppression::Suppressed {
            self.suppression = Suppression::Clear;
            debug!("History write suppressed after restore");
            return Ok(WriteOutcome::Suppressed);
        }

        let url = Self::encode(&self.history.location(), state)?;
        debug!("Pushing history entry: {}", url);
        self.history.push_state(url.clone());
        Ok(WriteOutcome::Pushed(url))
    }

    /// Marks the next write as the echo of a history navigation.
    pub fn begin_restore(&mut self) {
        self.suppression = Suppression::Suppressed;
    }

    /// Handles a popstate: sets the suppression flag, then decodes the
    /// current location.
    pub fn restore(&mut self) -> Option<QueryState> {
        self.begin_restore();
        self.read_current()
    }
}
