//! Undo/redo history for a scene.
//!
//! A [`HistoryRecorder`] subscribes to a scene's mutation events and keeps two
//! stacks of [`Snapshot`]s. It always holds the snapshot of the scene as it
//! was after the last settle point (the *pending* snapshot); when a mutation
//! event arrives, that pre-mutation state is pushed onto the undo stack and a
//! fresh pending snapshot is taken.
//!
//! Undo and redo replay a snapshot through [`Scene::restore`]. Restoring fires
//! mutation events of its own, so capture is suppressed for the whole replay,
//! including any asynchronous tail before the scene invokes the restore
//! callback. Suppression is held by a guard value that travels inside the
//! callback and is released when the callback runs or is dropped.

use crate::scene::{
    ExtraProps, HISTORY_EVENTS, ListenerId, Scene, SceneEvent, SceneResult, SceneView, Snapshot,
};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// What happens to the redo stack when a new edit is recorded after an undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedoPolicy {
    /// Keep the redo stack. Redo after a fresh edit replays the old branch.
    #[default]
    PreserveStale,
    /// Drop the redo stack on every recorded edit.
    ClearOnEdit,
}

/// History configuration.
#[derive(Debug, Clone, Default)]
pub struct HistoryConfig {
    /// Extra element properties captured in every snapshot.
    pub extra_props: ExtraProps,
    /// Redo handling for edits made after an undo.
    pub redo_policy: RedoPolicy,
    /// Maximum undo depth. `None` keeps everything.
    pub max_depth: Option<usize>,
}

/// Notifications sent to history observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    /// A pre-mutation snapshot was pushed onto the undo stack.
    Appended(Snapshot),
    /// An undo replay finished.
    Undo,
    /// A redo replay finished.
    Redo,
    /// Both stacks were emptied.
    Cleared,
    /// A snapshot was loaded as the new baseline.
    Loaded,
}

/// Callback run after an undo, redo or load has completed.
pub type Completion = Box<dyn FnOnce()>;

type Observer = Box<dyn FnMut(&HistoryEvent)>;

/// Undo/redo stacks plus the pending snapshot.
#[derive(Debug, Clone)]
pub struct HistoryState {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
    pending: Snapshot,
}

impl HistoryState {
    fn new(pending: Snapshot) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            pending,
        }
    }

    /// Past states, most recent last.
    pub fn undo_stack(&self) -> &[Snapshot] {
        &self.undo
    }

    /// Future states, most recent last.
    pub fn redo_stack(&self) -> &[Snapshot] {
        &self.redo
    }

    /// The state that will be pushed if a mutation happens now.
    pub fn pending(&self) -> &Snapshot {
        &self.pending
    }

    fn stack_mut(&mut self, which: Stack) -> &mut Vec<Snapshot> {
        match which {
            Stack::Undo => &mut self.undo,
            Stack::Redo => &mut self.redo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stack {
    Undo,
    Redo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

impl Direction {
    /// Stack the replayed snapshot is popped from.
    fn source(self) -> Stack {
        match self {
            Direction::Undo => Stack::Undo,
            Direction::Redo => Stack::Redo,
        }
    }

    /// Stack the current state is saved to.
    fn target(self) -> Stack {
        match self {
            Direction::Undo => Stack::Redo,
            Direction::Redo => Stack::Undo,
        }
    }

    fn event(self) -> HistoryEvent {
        match self {
            Direction::Undo => HistoryEvent::Undo,
            Direction::Redo => HistoryEvent::Redo,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Undo => f.write_str("undo"),
            Direction::Redo => f.write_str("redo"),
        }
    }
}

struct Inner {
    config: HistoryConfig,
    state: RefCell<HistoryState>,
    replay_depth: Cell<usize>,
    observers: RefCell<Vec<Observer>>,
}

impl Inner {
    fn is_replaying(&self) -> bool {
        self.replay_depth.get() > 0
    }

    fn capture(&self, scene: &dyn SceneView) {
        if self.is_replaying() {
            return;
        }

        let next = match scene.serialize(&self.config.extra_props) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                // The edit folds into the next recorded one.
                log::error!("History capture skipped: {}", err);
                return;
            }
        };

        let pushed = {
            let mut state = self.state.borrow_mut();
            let previous = std::mem::replace(&mut state.pending, next);
            state.undo.push(previous.clone());
            if self.config.redo_policy == RedoPolicy::ClearOnEdit {
                state.redo.clear();
            }
            if let Some(max) = self.config.max_depth {
                let excess = state.undo.len().saturating_sub(max);
                state.undo.drain(..excess);
            }
            previous
        };

        self.notify(HistoryEvent::Appended(pushed));
    }

    fn notify(&self, event: HistoryEvent) {
        let mut observers = self.observers.take();
        for observer in observers.iter_mut() {
            observer(&event);
        }
        // Keep observers registered while we were notifying.
        let mut slot = self.observers.borrow_mut();
        observers.append(&mut slot);
        *slot = observers;
    }
}

/// Holds capture suppression for as long as it lives.
struct ReplayGuard(Rc<Inner>);

impl ReplayGuard {
    fn acquire(inner: &Rc<Inner>) -> Self {
        inner.replay_depth.set(inner.replay_depth.get() + 1);
        Self(Rc::clone(inner))
    }
}

impl Drop for ReplayGuard {
    fn drop(&mut self) {
        let depth = self.0.replay_depth.get();
        self.0.replay_depth.set(depth.saturating_sub(1));
    }
}

/// Records scene mutations into undo/redo stacks.
///
/// Create one with [`HistoryRecorder::attach`] and tear it down with
/// [`HistoryRecorder::detach`]; one recorder per scene.
pub struct HistoryRecorder {
    inner: Rc<Inner>,
    listener: Option<ListenerId>,
}

impl HistoryRecorder {
    /// Start recording `scene`. The current scene state becomes the pending
    /// snapshot.
    pub fn attach(scene: &mut dyn Scene, config: HistoryConfig) -> SceneResult<Self> {
        let pending = scene.serialize(&config.extra_props)?;
        let inner = Rc::new(Inner {
            config,
            state: RefCell::new(HistoryState::new(pending)),
            replay_depth: Cell::new(0),
            observers: RefCell::new(Vec::new()),
        });

        let weak: Weak<Inner> = Rc::downgrade(&inner);
        let listener = scene.subscribe(
            &HISTORY_EVENTS,
            Box::new(move |event: &SceneEvent, view: &dyn SceneView| {
                if let Some(inner) = weak.upgrade() {
                    log::trace!("Scene event {:?} on {}", event.kind, event.element);
                    inner.capture(view);
                }
            }),
        );

        log::debug!("History attached ({:?})", listener);
        Ok(Self {
            inner,
            listener: Some(listener),
        })
    }

    /// Stop recording. Consumes the recorder and its stacks.
    pub fn detach(mut self, scene: &mut dyn Scene) {
        if let Some(id) = self.listener.take() {
            if !scene.unsubscribe(id) {
                log::warn!("History listener {:?} was already gone", id);
            }
            log::debug!("History detached ({:?})", id);
        }
    }

    /// Record a mutation: push the pending snapshot and re-sample the scene.
    ///
    /// Called automatically for subscribed events. Ignored while a replay is
    /// in flight.
    pub fn on_mutation_event(&self, scene: &dyn SceneView) {
        self.inner.capture(scene);
    }

    /// Step back one recorded state.
    ///
    /// Returns `Ok(false)` when there is nothing to undo, or while an earlier
    /// undo or redo is still restoring; the stacks are left untouched and
    /// `on_complete` is dropped. Otherwise `on_complete` runs after the scene
    /// has finished restoring.
    pub fn undo(&self, scene: &mut dyn Scene, on_complete: Option<Completion>) -> SceneResult<bool> {
        self.replay(scene, Direction::Undo, on_complete)
    }

    /// Step forward one undone state.
    pub fn redo(&self, scene: &mut dyn Scene, on_complete: Option<Completion>) -> SceneResult<bool> {
        self.replay(scene, Direction::Redo, on_complete)
    }

    fn replay(
        &self,
        scene: &mut dyn Scene,
        direction: Direction,
        on_complete: Option<Completion>,
    ) -> SceneResult<bool> {
        if self.inner.is_replaying() {
            log::debug!("Ignoring {} while a restore is in flight", direction);
            return Ok(false);
        }
        let guard = ReplayGuard::acquire(&self.inner);

        let Some(target) = self.inner.state.borrow_mut().stack_mut(direction.source()).pop() else {
            log::debug!("Nothing to {}", direction);
            return Ok(false);
        };

        let current = match scene.serialize(&self.inner.config.extra_props) {
            Ok(current) => current,
            Err(err) => {
                self.inner
                    .state
                    .borrow_mut()
                    .stack_mut(direction.source())
                    .push(target);
                return Err(err);
            }
        };

        let previous_pending = {
            let mut state = self.inner.state.borrow_mut();
            state.stack_mut(direction.target()).push(current);
            std::mem::replace(&mut state.pending, target.clone())
        };

        let inner = Rc::clone(&self.inner);
        let done = Box::new(move |scene: &mut dyn Scene| {
            scene.request_render();
            inner.notify(direction.event());
            drop(guard);
            if let Some(on_complete) = on_complete {
                on_complete();
            }
        });

        if let Err(err) = scene.restore(&target, done) {
            let mut state = self.inner.state.borrow_mut();
            state.stack_mut(direction.target()).pop();
            state.pending = previous_pending;
            state.stack_mut(direction.source()).push(target);
            return Err(err);
        }

        log::debug!("{} replay started", direction);
        Ok(true)
    }

    /// Empty both stacks. The pending snapshot is kept.
    pub fn clear(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.undo.clear();
            state.redo.clear();
        }
        self.inner.notify(HistoryEvent::Cleared);
    }

    /// Re-sample the pending snapshot after a change that bypassed history.
    pub fn rearm(&self, scene: &dyn Scene) -> SceneResult<()> {
        let pending = scene.serialize(&self.inner.config.extra_props)?;
        self.inner.state.borrow_mut().pending = pending;
        Ok(())
    }

    /// Replace the scene with `snapshot` and make it the new baseline.
    ///
    /// Both stacks are emptied and the pending snapshot is re-armed from the
    /// restored scene once the restore completes. Capture stays suppressed
    /// until then.
    pub fn load(
        &self,
        scene: &mut dyn Scene,
        snapshot: &Snapshot,
        on_complete: Option<Completion>,
    ) -> SceneResult<()> {
        let guard = ReplayGuard::acquire(&self.inner);
        let inner = Rc::clone(&self.inner);
        let loaded = snapshot.clone();

        scene.restore(
            snapshot,
            Box::new(move |scene: &mut dyn Scene| {
                scene.request_render();
                let pending = scene
                    .serialize(&inner.config.extra_props)
                    .unwrap_or_else(|err| {
                        log::error!("Re-arming history after load failed: {}", err);
                        loaded
                    });
                {
                    let mut state = inner.state.borrow_mut();
                    state.undo.clear();
                    state.redo.clear();
                    state.pending = pending;
                }
                inner.notify(HistoryEvent::Loaded);
                drop(guard);
                if let Some(on_complete) = on_complete {
                    on_complete();
                }
            }),
        )
    }

    /// Register an observer for history notifications.
    ///
    /// Observers run synchronously, sometimes while the scene is emitting an
    /// event, and must not call back into the scene.
    pub fn observe(&self, observer: impl FnMut(&HistoryEvent) + 'static) {
        self.inner.observers.borrow_mut().push(Box::new(observer));
    }

    pub fn can_undo(&self) -> bool {
        !self.inner.state.borrow().undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.inner.state.borrow().redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.inner.state.borrow().undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.inner.state.borrow().redo.len()
    }

    pub fn pending_snapshot(&self) -> Snapshot {
        self.inner.state.borrow().pending.clone()
    }

    /// Copy of the current stacks and pending snapshot.
    pub fn state(&self) -> HistoryState {
        self.inner.state.borrow().clone()
    }

    /// True while an undo, redo or load is waiting for its restore to finish.
    pub fn is_replaying(&self) -> bool {
        self.inner.is_replaying()
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.inner.config
    }
}

impl fmt::Debug for HistoryRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryRecorder")
            .field("listener", &self.listener)
            .field("undo_len", &self.undo_len())
            .field("redo_len", &self.redo_len())
            .field("replaying", &self.is_replaying())
            .finish()
    }
}

impl Drop for HistoryRecorder {
    fn drop(&mut self) {
        if let Some(id) = self.listener {
            log::warn!("History recorder dropped while still attached ({:?})", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Listener, RasterFormat, RestoreCallback, SceneError, SceneEventKind};
    use uuid::Uuid;

    /// Minimal scene: a list of labels serialized as JSON.
    #[derive(Default)]
    struct ListScene {
        items: Vec<String>,
        listeners: Vec<(ListenerId, Vec<SceneEventKind>, Listener)>,
        next_listener: u64,
        deferred: Option<(Vec<String>, RestoreCallback)>,
        defer_restores: bool,
        fail_serialize: bool,
        renders: usize,
    }

    impl ListScene {
        fn push(&mut self, item: &str) {
            self.items.push(item.to_string());
            self.emit(SceneEventKind::ElementAdded);
        }

        fn pop(&mut self) {
            self.items.pop();
            self.emit(SceneEventKind::ElementRemoved);
        }

        fn emit(&mut self, kind: SceneEventKind) {
            let event = SceneEvent::new(kind, Uuid::nil());
            let mut listeners = std::mem::take(&mut self.listeners);
            for (_, kinds, listener) in listeners.iter_mut() {
                if kinds.contains(&kind) {
                    listener(&event, &*self);
                }
            }
            listeners.append(&mut self.listeners);
            self.listeners = listeners;
        }

        fn apply(&mut self, items: Vec<String>, on_done: RestoreCallback) {
            self.items.clear();
            for item in items {
                self.push(&item);
            }
            on_done(self);
        }

        fn finish_restore(&mut self) {
            if let Some((items, on_done)) = self.deferred.take() {
                self.apply(items, on_done);
            }
        }
    }

    impl SceneView for ListScene {
        fn serialize(&self, _extra: &ExtraProps) -> SceneResult<Snapshot> {
            if self.fail_serialize {
                return Err(SceneError::Serialization("broken".into()));
            }
            serde_json::to_string(&self.items)
                .map(Snapshot::from)
                .map_err(|e| SceneError::Serialization(e.to_string()))
        }
    }

    impl Scene for ListScene {
        fn restore(&mut self, snapshot: &Snapshot, on_done: RestoreCallback) -> SceneResult<()> {
            let items: Vec<String> = serde_json::from_str(snapshot.as_str())
                .map_err(|e| SceneError::MalformedSnapshot(e.to_string()))?;
            if self.defer_restores {
                self.deferred = Some((items, on_done));
            } else {
                self.apply(items, on_done);
            }
            Ok(())
        }

        fn request_render(&mut self) {
            self.renders += 1;
        }

        fn subscribe(&mut self, events: &[SceneEventKind], listener: Listener) -> ListenerId {
            self.next_listener += 1;
            let id = ListenerId(self.next_listener);
            self.listeners.push((id, events.to_vec(), listener));
            id
        }

        fn unsubscribe(&mut self, id: ListenerId) -> bool {
            let before = self.listeners.len();
            self.listeners.retain(|(lid, _, _)| *lid != id);
            self.listeners.len() != before
        }

        fn clear(&mut self) {
            self.items.clear();
        }

        fn rasterize(&self, _format: RasterFormat) -> SceneResult<Vec<u8>> {
            Err(SceneError::RasterUnavailable)
        }
    }

    fn snap(items: &[&str]) -> Snapshot {
        Snapshot::from(serde_json::to_string(items).unwrap())
    }

    #[test]
    fn test_attach_captures_initial_state() {
        let mut scene = ListScene::default();
        scene.items.push("a".into());
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();

        assert_eq!(history.pending_snapshot(), snap(&["a"]));
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        history.detach(&mut scene);
        assert!(scene.listeners.is_empty());
    }

    #[test]
    fn test_mutation_pushes_pre_mutation_state() {
        let mut scene = ListScene::default();
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();

        scene.push("a");
        scene.push("b");

        let state = history.state();
        assert_eq!(state.undo_stack(), &[snap(&[]), snap(&["a"])]);
        assert_eq!(state.pending(), &snap(&["a", "b"]));
        history.detach(&mut scene);
    }

    #[test]
    fn test_undo_scenario() {
        let mut scene = ListScene::default();
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();

        scene.push("A");
        scene.push("B");

        assert!(history.undo(&mut scene, None).unwrap());
        assert_eq!(scene.items, vec!["A"]);
        assert_eq!(history.state().redo_stack(), &[snap(&["A", "B"])]);

        assert!(history.undo(&mut scene, None).unwrap());
        assert!(scene.items.is_empty());
        assert_eq!(
            history.state().redo_stack(),
            &[snap(&["A", "B"]), snap(&["A"])]
        );

        assert!(history.redo(&mut scene, None).unwrap());
        assert_eq!(scene.items, vec!["A"]);
        history.detach(&mut scene);
    }

    #[test]
    fn test_n_edits_then_n_undos_round_trip() {
        let mut scene = ListScene::default();
        scene.items.push("base".into());
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();
        let before = scene.serialize(&ExtraProps::default()).unwrap();

        for i in 0..5 {
            scene.push(&format!("item-{}", i));
        }
        scene.pop();
        for _ in 0..6 {
            assert!(history.undo(&mut scene, None).unwrap());
        }

        assert_eq!(scene.serialize(&ExtraProps::default()).unwrap(), before);
        assert!(!history.can_undo());
        history.detach(&mut scene);
    }

    #[test]
    fn test_undo_then_redo_is_identity() {
        let mut scene = ListScene::default();
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();
        scene.push("a");
        scene.push("b");
        let before = scene.serialize(&ExtraProps::default()).unwrap();
        let (undo_len, redo_len) = (history.undo_len(), history.redo_len());

        history.undo(&mut scene, None).unwrap();
        history.redo(&mut scene, None).unwrap();

        assert_eq!(scene.serialize(&ExtraProps::default()).unwrap(), before);
        assert_eq!(history.undo_len(), undo_len);
        assert_eq!(history.redo_len(), redo_len);
        assert_eq!(history.pending_snapshot(), before);
        history.detach(&mut scene);
    }

    #[test]
    fn test_undo_on_empty_stack_is_noop() {
        let mut scene = ListScene::default();
        scene.items.push("keep".into());
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();

        assert!(!history.undo(&mut scene, None).unwrap());
        assert!(!history.redo(&mut scene, None).unwrap());
        assert_eq!(scene.items, vec!["keep"]);
        assert!(!history.is_replaying());
        history.detach(&mut scene);
    }

    #[test]
    fn test_replay_events_are_not_recorded() {
        let mut scene = ListScene::default();
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();
        scene.push("a");
        scene.push("b");
        scene.push("c");

        history.undo(&mut scene, None).unwrap();
        history.undo(&mut scene, None).unwrap();
        history.redo(&mut scene, None).unwrap();
        history.redo(&mut scene, None).unwrap();

        assert_eq!(history.undo_len(), 3);
        assert_eq!(history.redo_len(), 0);
        history.detach(&mut scene);
    }

    #[test]
    fn test_deferred_restore_keeps_capture_suppressed() {
        let mut scene = ListScene {
            defer_restores: true,
            ..Default::default()
        };
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();
        scene.push("a");

        let completed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&completed);
        history
            .undo(&mut scene, Some(Box::new(move || flag.set(true))))
            .unwrap();
        assert!(history.is_replaying());
        assert!(!completed.get());

        // Events fired before the restore finishes are absorbed.
        scene.push("stray");
        assert_eq!(history.undo_len(), 0);

        scene.finish_restore();
        assert!(!history.is_replaying());
        assert!(completed.get());
        assert!(scene.items.is_empty());
        assert_eq!(scene.renders, 1);

        scene.push("z");
        assert_eq!(history.undo_len(), 1);
        history.detach(&mut scene);
    }

    #[test]
    fn test_replay_while_restoring_is_rejected() {
        let mut scene = ListScene {
            defer_restores: true,
            ..Default::default()
        };
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();
        scene.push("a");
        scene.push("b");
        assert!(history.undo(&mut scene, None).unwrap());
        let mid = (history.undo_len(), history.redo_len());
        assert_eq!(mid, (1, 1));

        let called = Rc::new(Cell::new(false));
        let flag = Rc::clone(&called);
        assert!(!history.undo(&mut scene, Some(Box::new(move || flag.set(true)))).unwrap());
        assert!(!history.redo(&mut scene, None).unwrap());
        assert_eq!((history.undo_len(), history.redo_len()), mid);
        assert!(!called.get());

        scene.finish_restore();
        assert_eq!(scene.items, vec!["a".to_string()]);
        assert!(history.undo(&mut scene, None).unwrap());
        scene.finish_restore();
        assert!(scene.items.is_empty());
        assert_eq!((history.undo_len(), history.redo_len()), (0, 2));
        history.detach(&mut scene);
    }

    #[test]
    fn test_dropped_restore_callback_releases_suppression() {
        let mut scene = ListScene {
            defer_restores: true,
            ..Default::default()
        };
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();
        scene.push("a");

        history.undo(&mut scene, None).unwrap();
        assert!(history.is_replaying());

        // The scene abandons the restore.
        scene.deferred = None;
        assert!(!history.is_replaying());
        history.detach(&mut scene);
    }

    #[test]
    fn test_malformed_snapshot_rolls_back() {
        let mut scene = ListScene::default();
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();
        scene.push("a");
        {
            let mut state = history.inner.state.borrow_mut();
            state.undo[0] = Snapshot::from("not json");
        }
        let before = history.state();

        let result = history.undo(&mut scene, None);
        assert!(matches!(result, Err(SceneError::MalformedSnapshot(_))));
        assert!(!history.is_replaying());

        let after = history.state();
        assert_eq!(after.undo_stack(), before.undo_stack());
        assert_eq!(after.redo_stack(), before.redo_stack());
        assert_eq!(after.pending(), before.pending());
        assert_eq!(scene.items, vec!["a"]);

        // Capture still works afterwards.
        scene.push("b");
        assert_eq!(history.undo_len(), 2);
        history.detach(&mut scene);
    }

    #[test]
    fn test_serialize_failure_during_undo_keeps_stacks() {
        let mut scene = ListScene::default();
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();
        scene.push("a");

        scene.fail_serialize = true;
        assert!(history.undo(&mut scene, None).is_err());
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.redo_len(), 0);
        assert!(!history.is_replaying());
        history.detach(&mut scene);
    }

    #[test]
    fn test_clear_empties_stacks_and_keeps_pending() {
        let mut scene = ListScene::default();
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();
        scene.push("a");
        scene.push("b");
        history.undo(&mut scene, None).unwrap();
        let pending = history.pending_snapshot();

        history.clear();

        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.pending_snapshot(), pending);
        assert!(!history.undo(&mut scene, None).unwrap());
        assert!(!history.redo(&mut scene, None).unwrap());
        assert_eq!(scene.items, vec!["a"]);
        history.detach(&mut scene);
    }

    #[test]
    fn test_stale_redo_is_preserved_by_default() {
        let mut scene = ListScene::default();
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();
        scene.push("a");
        history.undo(&mut scene, None).unwrap();
        scene.push("b");

        assert_eq!(history.redo_len(), 1);
        history.redo(&mut scene, None).unwrap();
        assert_eq!(scene.items, vec!["a"]);
        history.detach(&mut scene);
    }

    #[test]
    fn test_clear_on_edit_policy_drops_redo() {
        let mut scene = ListScene::default();
        let config = HistoryConfig {
            redo_policy: RedoPolicy::ClearOnEdit,
            ..Default::default()
        };
        let history = HistoryRecorder::attach(&mut scene, config).unwrap();
        scene.push("a");
        history.undo(&mut scene, None).unwrap();
        assert!(history.can_redo());

        scene.push("b");
        assert!(!history.can_redo());
        history.detach(&mut scene);
    }

    #[test]
    fn test_max_depth_drops_oldest() {
        let mut scene = ListScene::default();
        let config = HistoryConfig {
            max_depth: Some(2),
            ..Default::default()
        };
        let history = HistoryRecorder::attach(&mut scene, config).unwrap();
        scene.push("a");
        scene.push("b");
        scene.push("c");

        assert_eq!(history.state().undo_stack(), &[snap(&["a"]), snap(&["a", "b"])]);
        history.detach(&mut scene);
    }

    #[test]
    fn test_observers_receive_events() {
        let mut scene = ListScene::default();
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        history.observe(move |event| sink.borrow_mut().push(event.clone()));

        scene.push("a");
        history.undo(&mut scene, None).unwrap();
        history.redo(&mut scene, None).unwrap();
        history.clear();

        assert_eq!(
            *seen.borrow(),
            vec![
                HistoryEvent::Appended(snap(&[])),
                HistoryEvent::Undo,
                HistoryEvent::Redo,
                HistoryEvent::Cleared,
            ]
        );
        history.detach(&mut scene);
    }

    #[test]
    fn test_load_sets_new_baseline() {
        let mut scene = ListScene::default();
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();
        scene.push("scratch");

        history.load(&mut scene, &snap(&["x", "y"]), None).unwrap();

        assert_eq!(scene.items, vec!["x", "y"]);
        assert!(!history.can_undo());
        assert_eq!(history.pending_snapshot(), snap(&["x", "y"]));

        scene.push("z");
        history.undo(&mut scene, None).unwrap();
        assert_eq!(scene.items, vec!["x", "y"]);
        assert!(!history.can_undo());
        history.detach(&mut scene);
    }

    #[test]
    fn test_rearm_resamples_pending() {
        let mut scene = ListScene::default();
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();
        scene.push("a");
        scene.clear();

        history.rearm(&scene).unwrap();
        assert_eq!(history.pending_snapshot(), snap(&[]));
        history.detach(&mut scene);
    }

    #[test]
    fn test_dropped_recorder_stops_capturing() {
        let mut scene = ListScene::default();
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();
        drop(history);

        // The leaked listener holds a weak reference and does nothing.
        scene.push("a");
        assert_eq!(scene.listeners.len(), 1);
    }

    #[test]
    fn test_manual_event_routing() {
        let mut scene = ListScene::default();
        let history = HistoryRecorder::attach(&mut scene, HistoryConfig::default()).unwrap();
        scene.items.push("silent".into());

        history.on_mutation_event(&scene);
        assert_eq!(history.state().undo_stack(), &[snap(&[])]);
        assert_eq!(history.pending_snapshot(), snap(&["silent"]));
        history.detach(&mut scene);
    }
}
