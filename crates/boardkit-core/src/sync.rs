//! Sync bridge between the local scene and an external persistence feed.
//!
//! Outbound, every local change serializes the whole scene and compares it
//! with the last known fingerprint; only differing states are forwarded.
//! Inbound, a push equal to the fingerprint is an echo of our own write and
//! is dropped. Anything else replaces (or merges into) the local scene.

use crate::scene::{Scene, SceneChange, SceneResult};
use crate::shapes::{ElementRecord, Shape, ShapeId};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Errors reported by a persistence collaborator. Never fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("persistence unavailable: {0}")]
    Unavailable(String),
    #[error("persistence rejected the write: {0}")]
    Rejected(String),
}

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Callback receiving a full serialized scene pushed by the remote side.
pub type RemoteSceneCallback = Box<dyn FnMut(String)>;

/// External store that scenes are written to and pushed from.
///
/// Single-threaded: implementations may call the subscription callback
/// synchronously from inside a write.
pub trait Persistence: fmt::Debug {
    /// Start receiving remote scene pushes for `scene_id`.
    fn subscribe(
        &self,
        scene_id: &str,
        on_remote_scene: RemoteSceneCallback,
    ) -> PersistenceResult<Subscription>;

    /// Write one new element.
    fn push_element(&self, scene_id: &str, element: &ElementRecord) -> PersistenceResult<()>;

    /// Overwrite the whole scene with a serialized element array.
    fn push_full_scene(&self, scene_id: &str, scene_json: &str) -> PersistenceResult<()>;

    /// Delete elements by id.
    fn delete_elements(&self, scene_id: &str, ids: &[ShapeId]) -> PersistenceResult<()>;
}

/// Handle for an active subscription. Dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// How an inbound push is combined with the local scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// The remote scene replaces the local one. Last write wins.
    #[default]
    ReplaceScene,
    /// Per element, keep whichever side has the higher revision. Local
    /// elements created since the last synchronized state are kept.
    KeepNewerRevision,
}

/// What happened to an inbound payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// Our own write coming back. Nothing changed.
    Echo,
    /// The local scene now equals the remote one.
    Replaced,
    /// The remote scene was merged in. `diverged` is set when the result
    /// still differs from the remote and should be pushed back.
    Merged { diverged: bool },
}

/// Reconciles local scene changes with a [`Persistence`] collaborator.
#[derive(Debug)]
pub struct SyncBridge {
    scene_id: String,
    policy: MergePolicy,
    persistence: Option<Rc<dyn Persistence>>,
    subscription: Option<Subscription>,
    inbox: Rc<RefCell<VecDeque<String>>>,
    /// Serialized form of the last scene we wrote or accepted.
    last_known: Option<String>,
    /// Element ids present in the last synchronized scene.
    synced_ids: HashSet<ShapeId>,
    /// A previous outbound write failed; the next one sends the full scene.
    resend_full: bool,
}

impl SyncBridge {
    pub fn new(scene_id: impl Into<String>, policy: MergePolicy) -> Self {
        Self {
            scene_id: scene_id.into(),
            policy,
            persistence: None,
            subscription: None,
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            last_known: None,
            synced_ids: HashSet::new(),
            resend_full: false,
        }
    }

    pub fn scene_id(&self) -> &str {
        &self.scene_id
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    pub fn is_connected(&self) -> bool {
        self.persistence.is_some()
    }

    /// The last known serialized scene.
    pub fn fingerprint(&self) -> Option<&str> {
        self.last_known.as_deref()
    }

    /// Attach a collaborator and subscribe to its pushes. Inbound payloads
    /// queue up until [`SyncBridge::take_inbound`] drains them.
    pub fn connect(&mut self, persistence: Rc<dyn Persistence>) -> PersistenceResult<()> {
        self.disconnect();
        let inbox = Rc::clone(&self.inbox);
        let subscription = persistence.subscribe(
            &self.scene_id,
            Box::new(move |payload| inbox.borrow_mut().push_back(payload)),
        )?;
        log::info!("subscribed to scene {}", self.scene_id);
        self.subscription = Some(subscription);
        self.persistence = Some(persistence);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            log::info!("unsubscribed from scene {}", self.scene_id);
        }
        self.persistence = None;
    }

    /// Record `scene` as synchronized without writing it anywhere.
    pub fn mark_synced(&mut self, scene: &Scene) -> SceneResult<()> {
        self.last_known = Some(scene.to_json()?);
        self.synced_ids = scene.ids().into_iter().collect();
        Ok(())
    }

    /// Forward a local change. Returns the serialized scene when it differs
    /// from the fingerprint, `None` when there was nothing new to send.
    pub fn publish(&mut self, scene: &Scene, change: &SceneChange) -> SceneResult<Option<String>> {
        let json = scene.to_json()?;
        if self.last_known.as_deref() == Some(json.as_str()) {
            return Ok(None);
        }

        if let Some(persistence) = &self.persistence {
            let result = match change {
                _ if self.resend_full => persistence.push_full_scene(&self.scene_id, &json),
                SceneChange::Added(id) => match scene.get(id) {
                    Some(shape) => persistence.push_element(&self.scene_id, &ElementRecord::from(shape)),
                    None => persistence.push_full_scene(&self.scene_id, &json),
                },
                SceneChange::Removed(ids) => persistence.delete_elements(&self.scene_id, ids),
                SceneChange::Modified => persistence.push_full_scene(&self.scene_id, &json),
            };
            match result {
                Ok(()) => self.resend_full = false,
                Err(err) => {
                    log::warn!("sync write for scene {} failed: {err}", self.scene_id);
                    self.resend_full = true;
                }
            }
        }

        self.last_known = Some(json.clone());
        self.synced_ids = scene.ids().into_iter().collect();
        Ok(Some(json))
    }

    /// Drain queued inbound payloads, oldest first.
    pub fn take_inbound(&self) -> Vec<String> {
        self.inbox.borrow_mut().drain(..).collect()
    }

    /// Apply one inbound payload to `scene`. On error the scene is untouched.
    pub fn receive(&mut self, scene: &mut Scene, payload: &str) -> SceneResult<Inbound> {
        if self.last_known.as_deref() == Some(payload) {
            log::debug!("dropping echo for scene {}", self.scene_id);
            return Ok(Inbound::Echo);
        }

        let remote = Scene::shapes_from_json(payload)?;
        let remote_ids: HashSet<ShapeId> = remote.iter().map(|s| s.id().to_string()).collect();

        let outcome = match self.policy {
            MergePolicy::ReplaceScene => {
                scene.replace(remote)?;
                Inbound::Replaced
            }
            MergePolicy::KeepNewerRevision => {
                let merged = merge_by_revision(scene, remote.clone(), &self.synced_ids);
                let diverged = merged != remote;
                scene.replace(merged)?;
                Inbound::Merged { diverged }
            }
        };

        log::debug!(
            "applied remote scene {} ({} elements)",
            self.scene_id,
            scene.len()
        );
        self.last_known = Some(payload.to_string());
        self.synced_ids = remote_ids;
        Ok(outcome)
    }
}

/// Remote order first, then local elements created since the last sync.
fn merge_by_revision(local: &Scene, remote: Vec<Shape>, synced: &HashSet<ShapeId>) -> Vec<Shape> {
    let remote_ids: HashSet<ShapeId> = remote.iter().map(|s| s.id().to_string()).collect();
    let mut merged: Vec<Shape> = remote
        .into_iter()
        .map(|theirs| match local.get(theirs.id()) {
            Some(ours) if ours.revision() > theirs.revision() => ours.clone(),
            _ => theirs,
        })
        .collect();
    merged.extend(
        local
            .iter()
            .filter(|s| !remote_ids.contains(s.id()) && !synced.contains(s.id()))
            .cloned(),
    );
    merged
}

struct Subscriber {
    id: u64,
    scene_id: String,
    callback: RemoteSceneCallback,
}

#[derive(Default)]
struct MemoryState {
    scenes: HashMap<String, Vec<ElementRecord>>,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
    offline: bool,
    writes: usize,
}

impl MemoryState {
    fn check_online(&self) -> PersistenceResult<()> {
        if self.offline {
            return Err(PersistenceError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }

    /// Push the stored scene to every subscriber of `scene_id`, the writer
    /// included. Its bridge recognizes the echo.
    fn fan_out(&mut self, scene_id: &str) -> PersistenceResult<()> {
        self.writes += 1;
        let records = self.scenes.get(scene_id).map(Vec::as_slice).unwrap_or_default();
        let payload = serde_json::to_string(records)
            .map_err(|e| PersistenceError::Rejected(e.to_string()))?;
        for subscriber in self.subscribers.iter_mut().filter(|s| s.scene_id == scene_id) {
            (subscriber.callback)(payload.clone());
        }
        Ok(())
    }
}

/// In-process persistence shared by cloning. Used by tests and the demo.
#[derive(Clone, Default)]
pub struct MemoryPersistence {
    state: Rc<RefCell<MemoryState>>,
}

impl fmt::Debug for MemoryPersistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MemoryPersistence")
            .field("scenes", &state.scenes.len())
            .field("subscribers", &state.subscribers.len())
            .field("offline", &state.offline)
            .finish()
    }
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store going away. Writes fail with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.state.borrow_mut().offline = offline;
    }

    /// The stored scene as a serialized element array.
    pub fn scene_json(&self, scene_id: &str) -> Option<String> {
        let state = self.state.borrow();
        let records = state.scenes.get(scene_id)?;
        serde_json::to_string(records).ok()
    }

    pub fn element_count(&self, scene_id: &str) -> usize {
        self.state.borrow().scenes.get(scene_id).map_or(0, Vec::len)
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.state.borrow().writes
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }
}

impl Persistence for MemoryPersistence {
    fn subscribe(
        &self,
        scene_id: &str,
        on_remote_scene: RemoteSceneCallback,
    ) -> PersistenceResult<Subscription> {
        let mut state = self.state.borrow_mut();
        state.check_online()?;
        let id = state.next_subscriber;
        state.next_subscriber += 1;
        state.subscribers.push(Subscriber {
            id,
            scene_id: scene_id.to_string(),
            callback: on_remote_scene,
        });

        let weak = Rc::downgrade(&self.state);
        Ok(Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().subscribers.retain(|s| s.id != id);
            }
        }))
    }

    fn push_element(&self, scene_id: &str, element: &ElementRecord) -> PersistenceResult<()> {
        let mut state = self.state.borrow_mut();
        state.check_online()?;
        let records = state.scenes.entry(scene_id.to_string()).or_default();
        match records.iter_mut().find(|r| r.id == element.id) {
            Some(existing) => *existing = element.clone(),
            None => records.push(element.clone()),
        }
        state.fan_out(scene_id)
    }

    fn push_full_scene(&self, scene_id: &str, scene_json: &str) -> PersistenceResult<()> {
        let records: Vec<ElementRecord> = serde_json::from_str(scene_json)
            .map_err(|e| PersistenceError::Rejected(e.to_string()))?;
        let mut state = self.state.borrow_mut();
        state.check_online()?;
        state.scenes.insert(scene_id.to_string(), records);
        state.fan_out(scene_id)
    }

    fn delete_elements(&self, scene_id: &str, ids: &[ShapeId]) -> PersistenceResult<()> {
        let mut state = self.state.borrow_mut();
        state.check_online()?;
        if let Some(records) = state.scenes.get_mut(scene_id) {
            records.retain(|r| !ids.contains(&r.id));
        }
        state.fan_out(scene_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneError;
    use crate::shapes::BoxShape;
    use kurbo::Point;

    fn rect(id: &str, x: f64) -> Shape {
        Shape::Rectangle(BoxShape::new(id, Point::new(x, 0.0), 10.0, 10.0))
    }

    fn connected(store: &MemoryPersistence, policy: MergePolicy) -> SyncBridge {
        let mut bridge = SyncBridge::new("board", policy);
        bridge.connect(Rc::new(store.clone())).unwrap();
        bridge
    }

    #[test]
    fn test_publish_skips_unchanged_scene() {
        let store = MemoryPersistence::new();
        let mut bridge = connected(&store, MergePolicy::default());
        let mut scene = Scene::new();
        scene.add(rect("a", 0.0)).unwrap();

        assert!(bridge.publish(&scene, &SceneChange::Added("a".into())).unwrap().is_some());
        assert!(bridge.publish(&scene, &SceneChange::Modified).unwrap().is_none());
        assert_eq!(store.write_count(), 1);
        assert_eq!(store.element_count("board"), 1);
    }

    #[test]
    fn test_own_write_comes_back_as_echo() {
        let store = MemoryPersistence::new();
        let mut bridge = connected(&store, MergePolicy::default());
        let mut scene = Scene::new();
        scene.add(rect("a", 0.0)).unwrap();
        bridge.publish(&scene, &SceneChange::Added("a".into())).unwrap();

        let inbound = bridge.take_inbound();
        assert_eq!(inbound.len(), 1);
        assert_eq!(bridge.receive(&mut scene, &inbound[0]).unwrap(), Inbound::Echo);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_remote_push_replaces_scene() {
        let store = MemoryPersistence::new();
        let mut ours = connected(&store, MergePolicy::ReplaceScene);
        let mut theirs = connected(&store, MergePolicy::ReplaceScene);

        let mut their_scene = Scene::new();
        their_scene.add(rect("b", 5.0)).unwrap();
        theirs.publish(&their_scene, &SceneChange::Added("b".into())).unwrap();

        let mut our_scene = Scene::new();
        our_scene.add(rect("mine", 50.0)).unwrap();
        for payload in ours.take_inbound() {
            assert_eq!(ours.receive(&mut our_scene, &payload).unwrap(), Inbound::Replaced);
        }
        assert_eq!(our_scene.ids(), vec!["b"]);
        assert_eq!(ours.fingerprint(), store.scene_json("board").as_deref());
    }

    #[test]
    fn test_malformed_payload_keeps_scene() {
        let mut bridge = SyncBridge::new("board", MergePolicy::default());
        let mut scene = Scene::new();
        scene.add(rect("a", 0.0)).unwrap();
        assert!(matches!(
            bridge.receive(&mut scene, "{\"not\":\"an array\"}"),
            Err(SceneError::NotAnArray)
        ));
        assert!(bridge.receive(&mut scene, "nope").is_err());
        assert_eq!(scene.ids(), vec!["a"]);
        assert!(bridge.fingerprint().is_none());
    }

    #[test]
    fn test_change_shapes_outbound_call() {
        let store = MemoryPersistence::new();
        let mut bridge = connected(&store, MergePolicy::default());
        let mut scene = Scene::new();
        scene.add(rect("a", 0.0)).unwrap();
        scene.add(rect("b", 20.0)).unwrap();
        bridge.publish(&scene, &SceneChange::Modified).unwrap();
        assert_eq!(store.element_count("board"), 2);

        scene.remove_many(&["a".into()]);
        bridge.publish(&scene, &SceneChange::Removed(vec!["a".into()])).unwrap();
        assert_eq!(store.element_count("board"), 1);
        assert_eq!(store.scene_json("board"), scene.to_json().ok());
    }

    #[test]
    fn test_failed_write_resends_full_scene() {
        let store = MemoryPersistence::new();
        let mut bridge = connected(&store, MergePolicy::default());
        let mut scene = Scene::new();
        scene.add(rect("a", 0.0)).unwrap();

        store.set_offline(true);
        assert!(bridge.publish(&scene, &SceneChange::Added("a".into())).unwrap().is_some());
        assert_eq!(store.element_count("board"), 0);

        store.set_offline(false);
        scene.add(rect("b", 20.0)).unwrap();
        bridge.publish(&scene, &SceneChange::Added("b".into())).unwrap();
        assert_eq!(store.element_count("board"), 2);
    }

    #[test]
    fn test_unsubscribe_on_drop() {
        let store = MemoryPersistence::new();
        let mut bridge = connected(&store, MergePolicy::default());
        assert_eq!(store.subscriber_count(), 1);
        bridge.disconnect();
        assert_eq!(store.subscriber_count(), 0);

        let subscription = store.subscribe("board", Box::new(|_| {})).unwrap();
        assert_eq!(store.subscriber_count(), 1);
        drop(subscription);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_keep_newer_revision_merge() {
        let mut bridge = SyncBridge::new("board", MergePolicy::KeepNewerRevision);
        let mut scene = Scene::new();
        scene.add(rect("a", 0.0)).unwrap();
        scene.add(rect("gone", 40.0)).unwrap();
        bridge.mark_synced(&scene).unwrap();

        // Local edit to "a" and a new local element.
        scene.get_mut("a").unwrap().bump_revision();
        scene.add(rect("fresh", 80.0)).unwrap();

        // Remote still has the old "a", deleted "gone", added "b".
        let remote = Scene::from_shapes(vec![rect("a", 100.0), rect("b", 5.0)]).unwrap();
        let payload = remote.to_json().unwrap();

        let outcome = bridge.receive(&mut scene, &payload).unwrap();
        assert_eq!(outcome, Inbound::Merged { diverged: true });
        assert_eq!(scene.ids(), vec!["a", "b", "fresh"]);
        assert_eq!(scene.get("a").map(Shape::anchor), Some(Point::new(0.0, 0.0)));
    }

    #[test]
    fn test_keep_newer_revision_accepts_newer_remote() {
        let mut bridge = SyncBridge::new("board", MergePolicy::KeepNewerRevision);
        let mut scene = Scene::new();
        scene.add(rect("a", 0.0)).unwrap();
        bridge.mark_synced(&scene).unwrap();

        let mut newer = rect("a", 30.0);
        newer.bump_revision();
        let payload = Scene::from_shapes(vec![newer]).unwrap().to_json().unwrap();

        let outcome = bridge.receive(&mut scene, &payload).unwrap();
        assert_eq!(outcome, Inbound::Merged { diverged: false });
        assert_eq!(scene.get("a").map(Shape::anchor), Some(Point::new(30.0, 0.0)));
    }
}
