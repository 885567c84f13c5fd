//! Completion delivery on a single dedicated thread.
//!
//! Operations run concurrently on the blocking pool, but callback-style
//! completions are all handed to one thread (`cabinet-delivery`) that runs
//! them in the order they arrive. A caller reacting to completions therefore
//! never races itself.

use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, OnceLock};
use std::thread;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cabinet::Cabinet;
use crate::error::Result;
use crate::query::Query;
use crate::storable::Storable;
use crate::store::BackingStore;

/// Name of the delivery thread.
pub const DELIVERY_THREAD: &str = "cabinet-delivery";

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to the delivery thread. The thread is spawned on first dispatch and
/// exits once every handle is dropped.
#[derive(Default)]
pub struct Delivery {
    sender: OnceLock<Mutex<Sender<Job>>>,
}

impl Delivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `job` to run on the delivery thread.
    ///
    /// If the thread cannot be spawned the job runs on the calling thread.
    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) {
        let mut job: Job = Box::new(job);

        if let Some(sender) = self.sender() {
            match sender.lock() {
                Ok(sender) => match sender.send(job) {
                    Ok(()) => return,
                    Err(returned) => job = returned.0,
                },
                Err(_) => warn!("delivery sender lock poisoned"),
            }
        }

        warn!("delivery thread unavailable, completing inline");
        job();
    }

    fn sender(&self) -> Option<&Mutex<Sender<Job>>> {
        if let Some(sender) = self.sender.get() {
            return Some(sender);
        }

        let (tx, rx) = channel::<Job>();
        let spawned = thread::Builder::new()
            .name(DELIVERY_THREAD.to_string())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
                debug!("delivery thread stopped");
            });

        match spawned {
            Ok(_) => {
                // A concurrent first dispatch may have won the race; the loser's
                // thread exits as soon as its sender is dropped here.
                Some(self.sender.get_or_init(|| Mutex::new(tx)))
            }
            Err(err) => {
                warn!(error = %err, "failed to spawn delivery thread");
                None
            }
        }
    }
}

/// Callback-style operations. Each runs the async operation on the tokio
/// runtime and hands its result to `on_complete` on the delivery thread.
///
/// # Panics
///
/// Like `tokio::spawn`, these must be called from within a tokio runtime.
impl<B: BackingStore> Cabinet<B> {
    pub fn fetch_with<R, F>(&self, query: Query, on_complete: F) -> JoinHandle<()>
    where
        R: Storable,
        F: FnOnce(Result<Vec<R>>) + Send + 'static,
    {
        let cabinet = self.clone();
        tokio::spawn(async move {
            let result = cabinet.fetch::<R>(query).await;
            cabinet.delivery().dispatch(move || on_complete(result));
        })
    }

    pub fn insert_with<R, F>(&self, record: R, on_complete: F) -> JoinHandle<()>
    where
        R: Storable,
        F: FnOnce(Result<bool>) + Send + 'static,
    {
        let cabinet = self.clone();
        tokio::spawn(async move {
            let result = cabinet.insert(record).await;
            cabinet.delivery().dispatch(move || on_complete(result));
        })
    }

    pub fn update_with<R, F>(&self, records: Vec<R>, on_complete: F) -> JoinHandle<()>
    where
        R: Storable,
        F: FnOnce(Result<bool>) + Send + 'static,
    {
        let cabinet = self.clone();
        tokio::spawn(async move {
            let result = cabinet.update(records).await;
            cabinet.delivery().dispatch(move || on_complete(result));
        })
    }

    pub fn delete_with<R, F>(&self, records: Vec<R>, on_complete: F) -> JoinHandle<()>
    where
        R: Storable,
        F: FnOnce(Result<bool>) + Send + 'static,
    {
        let cabinet = self.clone();
        tokio::spawn(async move {
            let result = cabinet.delete(records).await;
            cabinet.delivery().dispatch(move || on_complete(result));
        })
    }

    pub fn save_with<F>(&self, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<bool>) + Send + 'static,
    {
        let cabinet = self.clone();
        tokio::spawn(async move {
            let result = cabinet.save().await;
            cabinet.delivery().dispatch(move || on_complete(result));
        })
    }
}
