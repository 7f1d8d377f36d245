//! Auto-save: periodic saving of a recorded board.

use crate::history::{HistoryEvent, HistoryRecorder};
use crate::persistence::{PersistResult, PersistenceGateway};
use crate::scene::SceneView;
use crate::storage::Storage;
use std::cell::Cell;
use std::rc::Rc;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Saves a board to its cache key when history reports changes and the
/// interval has elapsed.
#[derive(Debug)]
pub struct AutoSaver {
    key: String,
    interval: Duration,
    last_save: Option<Instant>,
    /// Shared with the history observer.
    dirty: Rc<Cell<bool>>,
}

impl AutoSaver {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            interval: Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS),
            last_save: None,
            dirty: Rc::new(Cell::new(false)),
        }
    }

    /// Mark dirty whenever `history` records, replays or loads a state.
    pub fn watch(&self, history: &HistoryRecorder) {
        let dirty = Rc::clone(&self.dirty);
        history.observe(move |event| {
            if !matches!(event, HistoryEvent::Cleared) {
                dirty.set(true);
            }
        });
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Set the auto-save interval.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    /// Forget pending changes, e.g. after the saved key was reset.
    pub fn mark_clean(&self) {
        self.dirty.set(false);
    }

    /// Whether there are changes not yet saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Check if enough time has passed for an auto-save.
    pub fn should_save(&self) -> bool {
        if !self.is_dirty() {
            return false;
        }

        match self.last_save {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Save if dirty and the interval has elapsed. Never saves while a
    /// replay is in flight. Returns true if a save was performed.
    pub fn maybe_save<S: Storage + ?Sized>(
        &mut self,
        gateway: &PersistenceGateway<S>,
        scene: &dyn SceneView,
        history: &HistoryRecorder,
    ) -> PersistResult<bool> {
        if history.is_replaying() || !self.should_save() {
            return Ok(false);
        }

        self.save_now(gateway, scene)?;
        Ok(true)
    }

    /// Save immediately.
    pub fn save_now<S: Storage + ?Sized>(
        &mut self,
        gateway: &PersistenceGateway<S>,
        scene: &dyn SceneView,
    ) -> PersistResult<()> {
        gateway.save_to_cache(&self.key, scene)?;
        self.last_save = Some(Instant::now());
        self.dirty.set(false);
        log::debug!("Auto-saved '{}'", self.key);
        Ok(())
    }
}
