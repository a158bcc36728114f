use log::trace;

use crate::state::{QueryState, SortField};

type Effect = Box<dyn FnMut(&QueryState) + Send>;

/// Owner of the current [`QueryState`].
///
/// Every mutation goes through [`QueryStore::update`] or
/// [`QueryStore::replace`], and each one notifies the subscribers once with
/// the resulting state. Setters do not validate their input.
pub struct QueryStore {
    state: QueryState,
    effects: Vec<Effect>,
}

impl QueryStore {
    pub fn new(state: QueryState) -> Self {
        QueryStore {
            state,
            effects: Vec::new(),
        }
    }

    pub fn get(&self) -> &QueryState {
        &self.state
    }

    pub fn subscribe<F>(&mut self, effect: F)
    where
        F: FnMut(&QueryState) + Send + 'static,
    {
        self.effects.push(Box::new(effect));
    }

    pub fn subscriber_count(&self) -> usize {
        self.effects.len()
    }

    pub fn update<F>(&mut self, mutate: F)
    where
        F: FnOnce(&mut QueryState),
    {
        mutate(&mut self.state);
        self.notify();
    }

    pub fn replace(&mut self, state: QueryState) {
        self.state = state;
        self.notify();
    }

    pub fn set_search(&mut self, search: &str) {
        self.update(|s| s.search = search.to_owned());
    }

    pub fn toggle_tag(&mut self, tag: &str) {
        self.update(|s| {
            s.toggle_tag(tag);
        });
    }

    pub fn set_min_price(&mut self, bound: Option<i64>) {
        self.update(|s| s.filter.min_price = bound);
    }

    pub fn set_max_price(&mut self, bound: Option<i64>) {
        self.update(|s| s.filter.max_price = bound);
    }

    /// Sets the sort. `None` clears any explicit sort.
    pub fn set_sort(&mut self, by: Option<SortField>, asc: bool) {
        self.update(|s| {
            s.sort.by = by.map(|f| f.to_string()).unwrap_or_default();
            s.sort.asc = asc;
        });
    }

    pub fn set_page(&mut self, page: i64) {
        self.update(|s| s.pagination.page = page);
    }

    pub fn set_limit(&mut self, limit: i64) {
        self.update(|s| s.pagination.limit = limit);
    }

    fn notify(&mut self) {
        trace!("Query state changed: {:?}", self.state);
        for effect in self.effects.iter_mut() {
            effect(&self.state);
        }
    }
}
