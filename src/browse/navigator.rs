use super::cancel::CancelToken;
use super::pages::{self, Destination, PageView};
use crate::catalog::Catalog;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct Loaded {
    generation: u64,
    view: Option<PageView>,
}

/// Loads pages on worker threads. Only the most recent navigation is ever
/// delivered; starting a new one cancels the previous load.
pub struct Navigator {
    catalog: Arc<dyn Catalog>,
    generation: u64,
    pending: Option<(Destination, CancelToken)>,
    tx: Sender<Loaded>,
    rx: Receiver<Loaded>,
}

impl Navigator {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            catalog,
            generation: 0,
            pending: None,
            tx,
            rx,
        }
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    /// Start loading a destination, superseding any load in flight
    pub fn navigate(&mut self, destination: Destination) -> u64 {
        self.cancel();
        self.generation += 1;

        let token = CancelToken::new();
        self.pending = Some((destination.clone(), token.clone()));

        let generation = self.generation;
        let catalog = Arc::clone(&self.catalog);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let view = pages::load(catalog.as_ref(), &destination, &token);
            // Receiver gone means the navigator was dropped
            let _ = tx.send(Loaded { generation, view });
        });

        generation
    }

    /// Cancel the load in flight, if any
    pub fn cancel(&mut self) {
        if let Some((_, token)) = self.pending.take() {
            token.cancel();
        }
    }

    /// Destination still loading, if any
    pub fn pending(&self) -> Option<&Destination> {
        self.pending.as_ref().map(|(d, _)| d)
    }

    /// Block up to `timeout` for the current navigation's result
    pub fn wait(&mut self, timeout: Duration) -> Option<PageView> {
        let deadline = Instant::now() + timeout;
        while self.pending.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(loaded) => {
                    if let Some(view) = self.accept(loaded) {
                        return Some(view);
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
        None
    }

    /// Take the current navigation's result if it has arrived
    pub fn poll(&mut self) -> Option<PageView> {
        while let Ok(loaded) = self.rx.try_recv() {
            if let Some(view) = self.accept(loaded) {
                return Some(view);
            }
        }
        None
    }

    fn accept(&mut self, loaded: Loaded) -> Option<PageView> {
        if loaded.generation != self.generation || self.pending.is_none() {
            return None;
        }
        let view = loaded.view?;
        self.pending = None;
        Some(view)
    }
}

impl Drop for Navigator {
    fn drop(&mut self) {
        self.cancel();
    }
}
