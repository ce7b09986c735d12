//! Providers fed by a host platform location service.
//!
//! The host pushes fixes and failures into a [`PlatformFeed`]; any number of
//! [`PlatformProvider`]s read from it. Each pending request or open watch
//! holds one subscription to the feed, and dropping the request or stream
//! releases it, so [`PlatformFeed::active_watchers`] shows whether anything
//! is still listening.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use log::debug;
use lumigram_core::Coordinate;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::ProviderError;
use crate::provider::{LocationProvider, LocationStream, ProviderOptions};

#[derive(Debug, Clone, Default)]
enum FeedState {
    #[default]
    Empty,
    Fix {
        coordinate: Coordinate,
        received_at: Instant,
    },
    Failed(ProviderError),
}

impl FeedState {
    /// Item a reader should observe, skipping fixes older than `maximum_age`.
    fn observe(&self, options: &ProviderOptions) -> Option<Result<Coordinate, ProviderError>> {
        match self {
            Self::Empty => None,
            Self::Fix {
                coordinate,
                received_at,
            } => (received_at.elapsed() <= options.maximum_age()).then_some(Ok(*coordinate)),
            Self::Failed(error) => Some(Err(error.clone())),
        }
    }
}

/// Channel through which a host publishes location updates.
#[derive(Debug, Clone)]
pub struct PlatformFeed {
    sender: Arc<watch::Sender<FeedState>>,
    available: Arc<AtomicBool>,
}

impl Default for PlatformFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformFeed {
    /// Create an available feed with no fix yet.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(FeedState::Empty);
        Self {
            sender: Arc::new(sender),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Publish a fresh fix.
    pub fn publish(&self, coordinate: Coordinate) {
        self.sender.send_replace(FeedState::Fix {
            coordinate,
            received_at: Instant::now(),
        });
    }

    /// Publish a failure, replacing any earlier fix.
    pub fn fail(&self, error: ProviderError) {
        self.sender.send_replace(FeedState::Failed(error));
    }

    /// Mark the platform service present or absent.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Whether the platform service is present.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Number of pending requests and open watches.
    #[must_use]
    pub fn active_watchers(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Create a provider reading from this feed.
    #[must_use]
    pub fn provider(&self, name: impl Into<String>, options: ProviderOptions) -> PlatformProvider {
        PlatformProvider {
            name: name.into(),
            feed: self.clone(),
            options,
        }
    }
}

/// [`LocationProvider`] reading from a [`PlatformFeed`].
///
/// A one-shot request answers immediately with a fix no older than
/// [`ProviderOptions::maximum_age`], otherwise it waits for the next update.
#[derive(Debug, Clone)]
pub struct PlatformProvider {
    name: String,
    feed: PlatformFeed,
    options: ProviderOptions,
}

fn unavailable(name: &str) -> ProviderError {
    ProviderError::Unavailable {
        reason: format!("{name} is not available"),
    }
}

#[async_trait]
impl LocationProvider for PlatformProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_usable(&self) -> bool {
        self.feed.is_available()
    }

    fn options(&self) -> ProviderOptions {
        self.options
    }

    async fn request_once(&self, options: &ProviderOptions) -> Result<Coordinate, ProviderError> {
        let mut receiver = self.feed.sender.subscribe();
        loop {
            let observed = receiver.borrow_and_update().observe(options);
            if let Some(item) = observed {
                return item;
            }
            if receiver.changed().await.is_err() {
                return Err(unavailable(&self.name));
            }
        }
    }

    fn watch(&self, options: &ProviderOptions) -> Result<LocationStream, ProviderError> {
        if !self.is_usable() {
            return Err(unavailable(&self.name));
        }
        let receiver = self.feed.sender.subscribe();
        let options = *options;
        debug!("opened platform watch {}", self.name);
        let updates = stream::unfold((receiver, true), move |(mut receiver, first)| async move {
            if !first {
                receiver.changed().await.ok()?;
            }
            loop {
                let observed = receiver.borrow_and_update().observe(&options);
                if let Some(item) = observed {
                    return Some((item, (receiver, false)));
                }
                receiver.changed().await.ok()?;
            }
        });
        Ok(updates.boxed())
    }
}
