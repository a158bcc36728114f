use std::sync::{Arc, Mutex};

use log::{debug, error};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::dispatcher::{Dispatched, RequestDispatcher, ResultsView, SearchClient};
use crate::error::ArtQueryError;
use crate::state::QueryState;
use crate::store::QueryStore;
use crate::url_sync::{History, UrlSync, WriteOutcome};

/// View-layer controller for the arts listing.
///
/// Owns the query store and registers its one downstream effect: mirror the
/// new state into the history, then dispatch a search for it.
pub struct Storefront<H: History + 'static, C: SearchClient> {
    store: QueryStore,
    url_sync: Arc<Mutex<UrlSync<H>>>,
    dispatcher: RequestDispatcher<C>,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
    default_limit: i64,
}

impl<H: History + 'static, C: SearchClient> Storefront<H, C> {
    pub fn new(history: H, client: C, search_path: &str, default_limit: i64) -> Self {
        let initial = UrlSync::<H>::read(&history.location())
            .unwrap_or_else(|| QueryState::with_limit(default_limit));
        debug!("Initial query state: {:?}", initial);

        let url_sync = Arc::new(Mutex::new(UrlSync::new(history)));
        let dispatcher = RequestDispatcher::new(client, search_path);
        let pending = Arc::new(Mutex::new(Vec::new()));
        let mut store = QueryStore::new(initial);

        let effect_sync = Arc::clone(&url_sync);
        let effect_dispatcher = dispatcher.clone();
        let effect_pending = Arc::clone(&pending);
        store.subscribe(move |state| {
            let written = effect_sync.lock().unwrap().write(state);
            match written {
                Ok(WriteOutcome::Pushed(url)) => debug!("History now at {}", url),
                Ok(WriteOutcome::Suppressed) => {}
                Err(e) => error!("Failed to sync query state to URL: {}", e),
            }
            track(&effect_pending, effect_dispatcher.dispatch(state));
        });

        Storefront {
            store,
            url_sync,
            dispatcher,
            pending,
            default_limit,
        }
    }

    pub fn from_config(history: H, client: C, config: &Config) -> Self {
        Self::new(
            history,
            client,
            &config.client.search_path,
            config.query.page_limit,
        )
    }

    pub fn state(&self) -> &QueryState {
        self.store.get()
    }

    pub fn store_mut(&mut self) -> &mut QueryStore {
        &mut self.store
    }

    pub fn results(&self) -> ResultsView {
        self.dispatcher.results()
    }

    pub fn dispatcher(&self) -> &RequestDispatcher<C> {
        &self.dispatcher
    }

    /// Initial load: searches for the current state without touching history.
    pub fn start(&self) -> Result<u64, ArtQueryError> {
        let dispatched = self.dispatcher.dispatch(self.store.get())?;
        let seq = dispatched.seq;
        self.pending.lock().unwrap().push(dispatched.handle);
        Ok(seq)
    }

    pub fn apply<F>(&mut self, mutate: F)
    where
        F: FnOnce(&mut QueryState),
    {
        self.store.update(mutate);
    }

    /// Runs `f` against the history, e.g. to go back before `on_popstate`.
    pub fn with_history<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(self.url_sync.lock().unwrap().history_mut())
    }

    /// Restores the state after the history moved. The restored location is
    /// not pushed again; the search still runs.
    pub fn on_popstate(&mut self) {
        let restored = self.url_sync.lock().unwrap().restore();
        let state = restored.unwrap_or_else(|| QueryState::with_limit(self.default_limit));
        self.store.replace(state);
    }

    /// Points searches at another endpoint and searches again.
    pub fn set_target(&self, target: &str) -> Result<u64, ArtQueryError> {
        self.dispatcher.set_target(target);
        self.start()
    }

    /// Waits for every request issued so far.
    pub async fn settle(&self) {
        let handles: Vec<JoinHandle<()>> = self.pending.lock().unwrap().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Search task failed: {}", e);
            }
        }
    }
}

fn track(
    pending: &Mutex<Vec<JoinHandle<()>>>,
    dispatched: Result<Dispatched, ArtQueryError>,
) {
    match dispatched {
        Ok(dispatched) => {
            let mut pending = pending.lock().unwrap();
            pending.retain(|h| !h.is_finished());
            pending.push(dispatched.handle);
        }
        Err(e) => error!("Failed to dispatch search: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SearchPage;
    use crate::request_body::SearchRequest;
    use crate::url_sync::MemoryHistory;
    use url::Url;

    #[derive(Clone, Default)]
    struct RecordingClient {
        seen: Arc<Mutex<Vec<(String, SearchRequest)>>>,
    }

    impl SearchClient for RecordingClient {
        async fn search(
            &self,
            target: &str,
            request: &SearchRequest,
        ) -> Result<SearchPage, ArtQueryError> {
            self.seen
                .lock()
                .unwrap()
                .push((target.to_string(), request.clone()));
            Ok(SearchPage {
                total: request.search.len() as u64,
                items: Vec::new(),
            })
        }
    }

    fn storefront(start: &str) -> (Storefront<MemoryHistory, RecordingClient>, RecordingClient) {
        let client = RecordingClient::default();
        let history = MemoryHistory::new(Url::parse(start).unwrap());
        (Storefront::new(history, client.clone(), "/api/v1/arts", 20), client)
    }

    #[tokio::test]
    async fn test_initial_state_from_url() {
        let (front, _) =
            storefront("http://shop.test/arts?req=%7B%22search%22%3A%22abc%22%7D");
        assert_eq!(front.state().search, "abc");
        assert_eq!(front.state().pagination.limit, 20);
    }

    #[tokio::test]
    async fn test_initial_state_falls_back_to_default() {
        let client = RecordingClient::default();
        let history = MemoryHistory::new(Url::parse("http://shop.test/arts?req=%7Bbad").unwrap());
        let front = Storefront::new(history, client, "/api/v1/arts", 30);
        assert_eq!(front.state(), &QueryState::with_limit(30));
    }

    #[tokio::test]
    async fn test_start_does_not_push_history() {
        let (front, client) = storefront("http://shop.test/arts");
        front.start().unwrap();
        front.settle().await;

        assert_eq!(front.with_history(|h| h.len()), 1);
        assert_eq!(client.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_change_pushes_once_and_dispatches_once() {
        let (mut front, client) = storefront("http://shop.test/arts");

        front.apply(|s| {
            s.search = "sunset".into();
            s.filter.min_price = Some(50);
        });
        front.settle().await;

        assert_eq!(front.with_history(|h| h.len()), 2);
        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "/api/v1/arts");
        assert_eq!(seen[0].1.filter.min_price, 50);
        assert_eq!(seen[0].1.filter.max_price, -1);
        drop(seen);

        // The shared state still has no upper bound after serializing.
        assert_eq!(front.state().filter.max_price, None);
        assert_eq!(front.results().total, Some(6));
    }

    #[tokio::test]
    async fn test_back_navigation_restores_without_pushing() {
        let (mut front, client) = storefront("http://shop.test/arts");
        front.store_mut().set_search("one");
        front.store_mut().set_search("two");
        front.settle().await;
        assert_eq!(front.with_history(|h| h.len()), 3);

        front.with_history(|h| h.back());
        front.on_popstate();
        front.settle().await;

        assert_eq!(front.state().search, "one");
        assert_eq!(front.with_history(|h| h.len()), 3);
        let last = client.seen.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.1.search, "one");

        // Forward entries survive the restore; a new change truncates them.
        assert!(front.with_history(|h| h.forward()).is_some());
        front.with_history(|h| h.back());
        front.on_popstate();
        front.store_mut().set_search("three");
        front.settle().await;
        assert_eq!(front.with_history(|h| h.len()), 3);
    }

    #[tokio::test]
    async fn test_back_to_entry_without_state_uses_default() {
        let (mut front, _) = storefront("http://shop.test/arts");
        front.store_mut().set_page(4);
        front.with_history(|h| h.back());
        front.on_popstate();
        front.settle().await;

        assert_eq!(front.state(), &QueryState::default());
    }

    #[tokio::test]
    async fn test_target_change_dispatches() {
        let (front, client) = storefront("http://shop.test/arts");
        front.set_target("/api/v1/arts/starred").unwrap();
        front.settle().await;

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "/api/v1/arts/starred");
        assert_eq!(front.with_history(|h| h.len()), 1);
    }
}
