use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::models::track::{Track, TrackId};

/// Change delivered to track-scoped listeners.
#[derive(Debug, Clone)]
pub enum TrackChange {
    Updated(Track),
    /// Last delivery for the track; its subscriptions are released right after.
    Removed(TrackId),
}

pub type TrackListener = Arc<dyn Fn(&TrackChange) + Send + Sync + 'static>;

#[derive(Default)]
pub(crate) struct ListenerTable {
    next_id: u64,
    by_track: HashMap<TrackId, Vec<(u64, TrackListener)>>,
}

impl ListenerTable {
    pub(crate) fn insert(&mut self, track_id: TrackId, listener: TrackListener) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.by_track.entry(track_id).or_default().push((id, listener));
        id
    }

    fn remove(&mut self, track_id: &TrackId, id: u64) {
        if let Some(listeners) = self.by_track.get_mut(track_id) {
            listeners.retain(|(listener_id, _)| *listener_id != id);
            if listeners.is_empty() {
                self.by_track.remove(track_id);
            }
        }
    }

    pub(crate) fn listeners_for(&self, track_id: &TrackId) -> Vec<TrackListener> {
        self.by_track
            .get(track_id)
            .map(|listeners| listeners.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default()
    }

    /// Drop every listener of `track_id`, returning them for a final delivery.
    pub(crate) fn release_track(&mut self, track_id: &TrackId) -> Vec<TrackListener> {
        self.by_track
            .remove(track_id)
            .map(|listeners| listeners.into_iter().map(|(_, l)| l).collect())
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, track_id: &TrackId) -> usize {
        self.by_track.get(track_id).map_or(0, Vec::len)
    }
}

/// Listener registration scoped to a track's lifetime.
///
/// Dropping the subscription unregisters the listener. Removing the track
/// from the registry releases it as well, so a listener never outlives its
/// track.
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    table: Weak<Mutex<ListenerTable>>,
    track_id: TrackId,
    id: u64,
}

impl Subscription {
    pub(crate) fn new(table: &Arc<Mutex<ListenerTable>>, track_id: TrackId, id: u64) -> Self {
        Self {
            table: Arc::downgrade(table),
            track_id,
            id,
        }
    }

    pub fn track_id(&self) -> &TrackId {
        &self.track_id
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.table.upgrade().is_some_and(|table| {
            table
                .lock()
                .by_track
                .get(&self.track_id)
                .is_some_and(|listeners| listeners.iter().any(|(id, _)| *id == self.id))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            table.lock().remove(&self.track_id, self.id);
        }
    }
}
