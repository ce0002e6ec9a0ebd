//! Shared position within a tuning list.
//!
//! Tracks, pedals and UI all move the same current index. Readers load an
//! immutable snapshot with `ArcSwap` and always see a fully resolved tuning;
//! writers are serialized by a mutex. Every change is broadcast to
//! subscribers as a [`TuningChange`].

use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::debug;

use xentune_tuning::{MemoryFill, Tuning, TuningList};

use crate::error::{Error, Result};
use crate::trigger::TuningChangeRequest;

/// Snapshot of the active tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveTuning {
    pub index: usize,
    pub tuning: Arc<Tuning>,
}

/// Notification sent when the active tuning changes.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningChange {
    pub old: usize,
    pub new: usize,
    pub tuning: Arc<Tuning>,
}

pub struct TuningNavigator {
    list: Arc<TuningList>,
    active: ArcSwap<ActiveTuning>,
    /// Held while a change is resolved and published.
    memory: Mutex<Option<MemoryFill>>,
    subscribers: Mutex<Vec<Sender<TuningChange>>>,
}

impl TuningNavigator {
    /// Starts at the first tuning.
    pub fn new(list: Arc<TuningList>) -> Result<Self> {
        let first = list.get(0).cloned().ok_or(Error::EmptyTuningList)?;
        Ok(Self {
            list,
            active: ArcSwap::from_pointee(ActiveTuning {
                index: 0,
                tuning: Arc::new(first),
            }),
            memory: Mutex::new(None),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// Fills gaps of each tuning from the one sounding before it.
    pub fn with_memory_fill(self) -> Self {
        let mut memory = MemoryFill::new();
        memory.record(&self.active.load().tuning);
        *self.memory.lock() = Some(memory);
        self
    }

    pub fn list(&self) -> &Arc<TuningList> {
        &self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.list.names()
    }

    pub fn active(&self) -> Guard<Arc<ActiveTuning>> {
        self.active.load()
    }

    pub fn current_index(&self) -> usize {
        self.active.load().index
    }

    pub fn current_tuning(&self) -> Arc<Tuning> {
        Arc::clone(&self.active.load().tuning)
    }

    /// Receives every subsequent change. Dropped receivers are pruned.
    pub fn subscribe(&self) -> Receiver<TuningChange> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn next(&self) -> Option<TuningChange> {
        self.apply(TuningChangeRequest::Next)
    }

    pub fn previous(&self) -> Option<TuningChange> {
        self.apply(TuningChangeRequest::Previous)
    }

    pub fn jump(&self, index: usize) -> Option<TuningChange> {
        self.apply(TuningChangeRequest::Index(index))
    }

    /// Moves the current index. Returns `None` if it stays where it is.
    pub fn apply(&self, request: TuningChangeRequest) -> Option<TuningChange> {
        let mut memory = self.memory.lock();
        let old = self.active.load().index;
        let new = match request {
            TuningChangeRequest::Next => self.list.next_index(old),
            TuningChangeRequest::Previous => self.list.previous_index(old),
            TuningChangeRequest::Index(index) => self.list.clamp_index(index),
        };
        if new == old {
            return None;
        }

        let resolved = self.list.get(new)?;
        let tuning = match (memory.as_mut(), self.list.partial(new)) {
            (Some(memory), Some(partial)) => {
                let tuning = memory.apply(partial, resolved);
                memory.record(&tuning);
                tuning
            }
            _ => resolved.clone(),
        };
        let tuning = Arc::new(tuning);

        self.active.store(Arc::new(ActiveTuning {
            index: new,
            tuning: Arc::clone(&tuning),
        }));
        debug!(old, new, tuning = %tuning.name(), "Tuning changed");

        let change = TuningChange { old, new, tuning };
        self.subscribers
            .lock()
            .retain(|tx| tx.send(change.clone()).is_ok());
        Some(change)
    }
}

impl std::fmt::Debug for TuningNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TuningNavigator")
            .field("len", &self.list.len())
            .field("current_index", &self.current_index())
            .finish()
    }
}
