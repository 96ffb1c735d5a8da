//! Fetch controller: owns the current [`FetchState`] and drives one lookup per
//! submitted query.
//!
//! State is published through a [`tokio::sync::watch`] channel, so subscribers
//! always see the latest value and never a replay. Every submission supersedes
//! the previous one: the older task is aborted and, should it still finish, its
//! result is discarded because its generation is no longer current.

use futures::FutureExt;
use std::{
    panic::AssertUnwindSafe,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    fetcher::WeatherFetcher,
    model::{FetchState, WeatherQuery},
    preferences::{PreferenceStore, load_last_city},
};

/// Failure text used when an error carries no description of its own.
pub const UNKNOWN_ERROR: &str = "Unknown error";

pub struct FetchController {
    fetcher: Arc<dyn WeatherFetcher>,
    preferences: Arc<dyn PreferenceStore>,
    region: Option<String>,
    state: Arc<watch::Sender<FetchState>>,
    generation: Arc<AtomicU64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for FetchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchController")
            .field("region", &self.region)
            .field("state", &self.state.borrow().name())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl FetchController {
    pub fn new(fetcher: Arc<dyn WeatherFetcher>, preferences: Arc<dyn PreferenceStore>) -> Self {
        let (state, _) = watch::channel(FetchState::Initial);
        Self {
            fetcher,
            preferences,
            region: None,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    /// Qualifier appended to queries that don't name a country themselves.
    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Resubmits the remembered city, if any. Returns whether a fetch started.
    pub fn initialize(&self) -> bool {
        let Some(saved) = load_last_city(self.preferences.as_ref()) else {
            debug!("no saved city to restore");
            return false;
        };

        match WeatherQuery::new(&saved) {
            Ok(query) => {
                info!(city = %query, "restoring last searched city");
                self.submit(&query);
                true
            }
            Err(_) => false,
        }
    }

    /// Moves to `Loading` immediately and resolves to `Success` or `Failed` in
    /// the background. Must be called from within a Tokio runtime.
    pub fn submit(&self, query: &WeatherQuery) {
        let specifier = query.with_region(self.region());
        let fetcher = Arc::clone(&self.fetcher);
        let state = Arc::clone(&self.state);
        let generation = Arc::clone(&self.generation);

        let mut slot = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        let mut current = 0;
        self.state.send_modify(|s| {
            current = generation.fetch_add(1, Ordering::SeqCst) + 1;
            *s = FetchState::Loading;
        });
        info!(city = %specifier, generation = current, "fetch started");

        *slot = Some(tokio::spawn(async move {
            let outcome = AssertUnwindSafe(async { fetcher.fetch_report(&specifier).await })
                .catch_unwind()
                .await;

            let next = match outcome {
                Ok(Ok(report)) => FetchState::Success(report),
                Ok(Err(err)) => {
                    warn!(city = %specifier, error = %err, "fetch failed");
                    FetchState::Failed(err.message().unwrap_or_else(|| UNKNOWN_ERROR.to_string()))
                }
                Err(_) => {
                    warn!(city = %specifier, "fetch panicked");
                    FetchState::Failed(UNKNOWN_ERROR.to_string())
                }
            };

            let published = state.send_if_modified(|s| {
                if generation.load(Ordering::SeqCst) != current {
                    return false;
                }
                *s = next;
                true
            });

            if published {
                let outcome = state.borrow().name();
                info!(city = %specifier, generation = current, outcome, "fetch finished");
            } else {
                debug!(city = %specifier, generation = current, "discarding superseded result");
            }
        }));
    }

    /// A receiver that starts at the current state.
    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> FetchState {
        self.state.borrow().clone()
    }

    /// Waits until no fetch is in flight and returns the resulting state.
    pub async fn settled(&self) -> FetchState {
        let mut rx = self.subscribe();
        match rx.wait_for(|s| !matches!(s, FetchState::Loading)).await {
            Ok(state) => state.clone(),
            // The sender lives as long as `self`, so this is unreachable in practice.
            Err(_) => self.state(),
        }
    }
}

impl Drop for FetchController {
    fn drop(&mut self) {
        let slot = self.task.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}
