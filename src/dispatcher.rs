use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, error, info};
use reqwest::header::CONTENT_TYPE;
use tokio::task::JoinHandle;
use url::Url;

use crate::catalog::{Art, SearchPage};
use crate::config::RequestMethod;
use crate::error::ArtQueryError;
use crate::request_body::SearchRequest;
use crate::state::QueryState;
use crate::url_sync::REQ_PARAM;

/// Sends one search request to `target` and decodes the page it returns.
pub trait SearchClient: Send + Sync + 'static {
    fn search(
        &self,
        target: &str,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<SearchPage, ArtQueryError>> + Send;
}

/// Search client talking to the arts endpoint over HTTP.
pub struct HttpSearchClient {
    http: reqwest::Client,
    base_url: Url,
    method: RequestMethod,
}

impl HttpSearchClient {
    pub fn new(base_url: Url, method: RequestMethod) -> Self {
        HttpSearchClient {
            http: reqwest::Client::new(),
            base_url,
            method,
        }
    }

    fn endpoint(&self, target: &str) -> Result<Url, ArtQueryError> {
        self.base_url
            .join(target)
            .map_err(|e| ArtQueryError::ConfigError(format!("Invalid search target '{}': {}", target, e)))
    }
}

impl SearchClient for HttpSearchClient {
    async fn search(
        &self,
        target: &str,
        request: &SearchRequest,
    ) -> Result<SearchPage, ArtQueryError> {
        let mut url = self.endpoint(target)?;
        let body = request.to_json()?;

        let builder = match self.method {
            RequestMethod::Post => self
                .http
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(body),
            RequestMethod::Get => {
                url.query_pairs_mut().append_pair(REQ_PARAM, &body);
                self.http.get(url)
            }
        };

        let response = builder.send().await?.error_for_status()?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// What the listing shows: the latest accepted response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsView {
    /// Sequence number of the request these results belong to.
    pub seq: u64,
    pub total: Option<u64>,
    pub items: Vec<Art>,
    pub last_error: Option<String>,
}

pub struct Dispatched {
    pub seq: u64,
    pub handle: JoinHandle<()>,
}

/// Turns query states into search requests.
///
/// Requests may overlap and finish in any order. Each one is tagged with a
/// monotonic sequence number and only the response to the most recently
/// issued request may update the [`ResultsView`]. Nothing is retried.
pub struct RequestDispatcher<C: SearchClient> {
    client: Arc<C>,
    target: Arc<Mutex<String>>,
    latest: Arc<AtomicU64>,
    results: Arc<Mutex<ResultsView>>,
}

impl<C: SearchClient> Clone for RequestDispatcher<C> {
    fn clone(&self) -> Self {
        RequestDispatcher {
            client: Arc::clone(&self.client),
            target: Arc::clone(&self.target),
            latest: Arc::clone(&self.latest),
            results: Arc::clone(&self.results),
        }
    }
}

impl<C: SearchClient> RequestDispatcher<C> {
    pub fn new(client: C, target: &str) -> Self {
        RequestDispatcher {
            client: Arc::new(client),
            target: Arc::new(Mutex::new(target.to_owned())),
            latest: Arc::new(AtomicU64::new(0)),
            results: Arc::new(Mutex::new(ResultsView::default())),
        }
    }

    pub fn target(&self) -> String {
        self.target.lock().unwrap().clone()
    }

    pub fn set_target(&self, target: &str) {
        *self.target.lock().unwrap() = target.to_owned();
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn results(&self) -> ResultsView {
        self.results.lock().unwrap().clone()
    }

    /// Issues one request for `state` on the current tokio runtime.
    pub fn dispatch(&self, state: &QueryState) -> Result<Dispatched, ArtQueryError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ArtQueryError::Error(format!("No async runtime for dispatch: {}", e)))?;

        let request = SearchRequest::from_state(state);
        let target = self.target();
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Dispatching search #{} to {}", seq, target);

        let client = Arc::clone(&self.client);
        let latest = Arc::clone(&self.latest);
        let results = Arc::clone(&self.results);

        let handle = runtime.spawn(async move {
            let outcome = client.search(&target, &request).await;
            record(&results, &latest, seq, outcome);
        });

        Ok(Dispatched { seq, handle })
    }
}

/// Applies the outcome of search `seq` unless a newer search was issued.
///
/// The sequence check runs while `results` is locked, so a response that
/// passed it cannot be overwritten by an older one.
fn record(
    results: &Mutex<ResultsView>,
    latest: &AtomicU64,
    seq: u64,
    outcome: Result<SearchPage, ArtQueryError>,
) {
    let mut view = results.lock().unwrap();
    if latest.load(Ordering::SeqCst) != seq || view.seq > seq {
        debug!("Discarding stale response for search #{}", seq);
        return;
    }

    match outcome {
        Ok(page) => {
            info!("Search #{} returned {} of {} arts", seq, page.items.len(), page.total);
            view.seq = seq;
            view.total = Some(page.total);
            view.items = page.items;
            view.last_error = None;
        }
        Err(e) => {
            error!("Search #{} failed: {}", seq, e);
            view.seq = seq;
            view.last_error = Some(e.to_string());
        }
    }
}
