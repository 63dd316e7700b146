//! Word and phrase glosses from a remote service.
//!
//! Requests run on worker threads and are collected by [`GlossFetcher::poll`]
//! from the UI loop, so a slow service never blocks input handling.

use std::{
    sync::{
        Arc,
        mpsc::{self, Receiver, TryRecvError},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::chapter::Book;
use crate::error::GlossError;
use crate::resolver::SelectionResult;
use crate::store::KeyValueStore;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlossRequest {
    pub selected_text: String,
    pub sentence: String,
    pub book_title: String,
    pub author: String,
    pub book_id: String,
}

impl GlossRequest {
    pub fn new(result: &SelectionResult, book: &Book) -> Self {
        Self {
            selected_text: result.text.clone(),
            sentence: result.sentence.clone(),
            book_title: book.title.clone(),
            author: book.author.clone(),
            book_id: book.id.clone(),
        }
    }

    pub fn cache_key(&self) -> String {
        format!(
            "gloss:{}:{}:{}",
            self.book_id, self.sentence, self.selected_text
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Gloss {
    pub translation: String,
    pub grammar: String,
    pub pronunciation: String,
    pub contextual_meaning: String,
}

pub fn cached_gloss(store: &dyn KeyValueStore, key: &str) -> Option<Gloss> {
    let raw = store.get(key)?;
    serde_json::from_str(&raw)
        .inspect_err(|err| warn!("dropping unreadable cached gloss {key}: {err}"))
        .ok()
}

pub fn cache_gloss(store: &mut dyn KeyValueStore, key: &str, gloss: &Gloss) {
    match serde_json::to_string(gloss) {
        Ok(raw) => store.set(key, raw),
        Err(err) => warn!("failed to encode gloss for cache: {err}"),
    }
}

pub trait GlossService: Send + Sync {
    fn fetch(&self, request: &GlossRequest) -> Result<Gloss, GlossError>;
}

/// POSTs the request as JSON and reads the gloss from the JSON reply.
pub struct HttpGlossService {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl HttpGlossService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, GlossError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("glosa/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

impl GlossService for HttpGlossService {
    fn fetch(&self, request: &GlossRequest) -> Result<Gloss, GlossError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()?
            .error_for_status()?;
        Ok(response.json::<Gloss>()?)
    }
}

#[derive(Debug)]
pub struct GlossResult {
    pub request_id: u64,
    pub gloss: Result<Gloss, GlossError>,
}

struct PendingGloss {
    request_id: u64,
    receiver: Receiver<Result<Gloss, GlossError>>,
    join: Option<JoinHandle<()>>,
}

/// Runs one worker thread per request. Cancelling drops the pending entry so
/// a late answer is never reported.
pub struct GlossFetcher {
    service: Arc<dyn GlossService>,
    pending: Vec<PendingGloss>,
    next_id: u64,
}

impl GlossFetcher {
    pub fn new(service: Arc<dyn GlossService>) -> Self {
        Self {
            service,
            pending: Vec::new(),
            next_id: 1,
        }
    }

    pub fn request(&mut self, request: GlossRequest) -> u64 {
        let request_id = self.next_id;
        self.next_id += 1;

        let (tx, rx) = mpsc::channel();
        let service = Arc::clone(&self.service);
        let join = thread::spawn(move || {
            let _ = tx.send(service.fetch(&request));
        });

        self.pending.push(PendingGloss {
            request_id,
            receiver: rx,
            join: Some(join),
        });
        request_id
    }

    pub fn cancel(&mut self, request_id: u64) {
        self.pending.retain(|p| p.request_id != request_id);
    }

    pub fn poll(&mut self) -> Vec<GlossResult> {
        let mut ready = Vec::new();
        let mut still = Vec::new();
        for mut pending in self.pending.drain(..) {
            match pending.receiver.try_recv() {
                Ok(gloss) => {
                    if let Some(j) = pending.join.take() {
                        let _ = j.join();
                    }
                    ready.push(GlossResult {
                        request_id: pending.request_id,
                        gloss,
                    });
                }
                Err(TryRecvError::Empty) => still.push(pending),
                Err(TryRecvError::Disconnected) => {
                    if let Some(j) = pending.join.take() {
                        let _ = j.join();
                    }
                    ready.push(GlossResult {
                        request_id: pending.request_id,
                        gloss: Err(GlossError::Disconnected),
                    });
                }
            }
        }
        self.pending = still;
        ready
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GlossState {
    Idle,
    Loading,
    Ready(Gloss),
    Failed(String),
    /// No service configured; the selection is still shown.
    Unavailable,
}

struct ActiveGloss {
    key: String,
    request_id: Option<u64>,
}

/// Follows the resolver's current result and keeps one gloss in flight.
pub struct GlossSession {
    fetcher: Option<GlossFetcher>,
    active: Option<ActiveGloss>,
    state: GlossState,
}

impl GlossSession {
    pub fn new(service: Option<Arc<dyn GlossService>>) -> Self {
        Self {
            fetcher: service.map(GlossFetcher::new),
            active: None,
            state: GlossState::Idle,
        }
    }

    pub fn state(&self) -> &GlossState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == GlossState::Loading
    }

    /// Call whenever the current selection result may have changed. A result
    /// with the same text and sentence as the active one is a no-op, unless
    /// its last fetch failed.
    pub fn on_selection(
        &mut self,
        result: Option<&SelectionResult>,
        book: &Book,
        store: &dyn KeyValueStore,
    ) {
        let Some(result) = result else {
            self.cancel_active();
            self.state = GlossState::Idle;
            return;
        };

        let request = GlossRequest::new(result, book);
        let key = request.cache_key();
        let retry = matches!(self.state, GlossState::Failed(_));
        if !retry && self.active.as_ref().is_some_and(|active| active.key == key) {
            return;
        }
        self.cancel_active();

        if let Some(gloss) = cached_gloss(store, &key) {
            debug!("gloss cache hit for {:?}", request.selected_text);
            self.active = Some(ActiveGloss {
                key,
                request_id: None,
            });
            self.state = GlossState::Ready(gloss);
            return;
        }

        let Some(fetcher) = self.fetcher.as_mut() else {
            self.active = Some(ActiveGloss {
                key,
                request_id: None,
            });
            self.state = GlossState::Unavailable;
            return;
        };

        debug!("requesting gloss for {:?}", request.selected_text);
        let request_id = fetcher.request(request);
        self.active = Some(ActiveGloss {
            key,
            request_id: Some(request_id),
        });
        self.state = GlossState::Loading;
    }

    /// Collects finished requests. Returns true when the state changed.
    /// Fetched glosses are cached and flushed right away.
    pub fn poll(&mut self, store: &mut dyn KeyValueStore) -> bool {
        let Some(fetcher) = self.fetcher.as_mut() else {
            return false;
        };
        let mut changed = false;
        for result in fetcher.poll() {
            let Some(active) = self.active.as_mut() else {
                continue;
            };
            if active.request_id != Some(result.request_id) {
                continue;
            }
            active.request_id = None;
            self.state = match result.gloss {
                Ok(gloss) => {
                    cache_gloss(store, &active.key, &gloss);
                    if let Err(err) = store.flush() {
                        warn!("failed to persist gloss cache: {err}");
                    }
                    GlossState::Ready(gloss)
                }
                Err(err) => {
                    warn!("gloss request failed: {err}");
                    GlossState::Failed(err.to_string())
                }
            };
            changed = true;
        }
        changed
    }

    fn cancel_active(&mut self) {
        if let Some(ActiveGloss {
            request_id: Some(id),
            ..
        }) = self.active.take()
            && let Some(fetcher) = self.fetcher.as_mut()
        {
            fetcher.cancel(id);
        }
    }
}
