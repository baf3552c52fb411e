//! Canonical in-memory store of tracks.
//!
//! The registry is the only place a `Track` is mutated. Every other
//! component reads snapshots and writes back through `patch`.

pub mod subscription;

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::MediaError;
use crate::models::track::{MediaType, NativeHandle, Track, TrackFilter, TrackId, TrackPatch};
use crate::traits::observer::RegistryObserver;
use subscription::{ListenerTable, Subscription, TrackChange, TrackListener};

pub struct TrackRegistry {
    tracks: BTreeMap<TrackId, Track>,
    observer: Arc<dyn RegistryObserver>,
    listeners: Arc<Mutex<ListenerTable>>,
}

impl TrackRegistry {
    pub fn new(observer: Arc<dyn RegistryObserver>) -> Self {
        Self {
            tracks: BTreeMap::new(),
            observer,
            listeners: Arc::new(Mutex::new(ListenerTable::default())),
        }
    }

    /// Insert a new track. A duplicate id is rejected and the registry is left untouched.
    pub fn add(&mut self, track: Track) -> Result<(), MediaError> {
        if self.tracks.contains_key(&track.id) {
            log::warn!("Ignoring duplicate track {}", track.id);
            return Err(MediaError::DuplicateTrack(track.id));
        }
        let id = track.id.clone();
        self.tracks.insert(id.clone(), track);
        if let Some(track) = self.tracks.get(&id) {
            self.observer.on_track_added(track);
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &TrackId) -> Option<Track> {
        self.remove_with(id, |_| {})
    }

    /// Remove a track, running `teardown` against it while it is still
    /// registered. Subscriptions receive `TrackChange::Removed` and are then
    /// released.
    pub fn remove_with(&mut self, id: &TrackId, teardown: impl FnOnce(&Track)) -> Option<Track> {
        let Some(track) = self.tracks.get(id) else {
            log::debug!("Ignoring removal of unknown track {}", id);
            return None;
        };
        teardown(track);

        let track = self.tracks.remove(id)?;
        let listeners = self.listeners.lock().release_track(id);
        let change = TrackChange::Removed(id.clone());
        for listener in listeners {
            listener(&change);
        }
        self.observer.on_track_removed(&track);
        Some(track)
    }

    /// Apply a partial update. Unknown ids are ignored, since the engine may
    /// race an update against a removal.
    pub fn patch(&mut self, id: &TrackId, patch: TrackPatch) -> Option<&Track> {
        let Some(track) = self.tracks.get_mut(id) else {
            log::debug!("Ignoring patch for unknown track {}", id);
            return None;
        };
        patch.apply(track);
        let track = &*track;

        self.observer.on_track_updated(track);
        let listeners = self.listeners.lock().listeners_for(id);
        if !listeners.is_empty() {
            let change = TrackChange::Updated(track.clone());
            for listener in listeners {
                listener(&change);
            }
        }
        Some(track)
    }

    pub fn get(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.get(id)
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.tracks.contains_key(id)
    }

    pub fn find_by_native_handle(&self, handle: &NativeHandle) -> Option<&Track> {
        self.tracks
            .values()
            .find(|track| track.native.as_ref().is_some_and(|native| native.same_as(handle)))
    }

    /// First local track of `media_type`, optionally including placeholders.
    pub fn find_local(&self, media_type: MediaType, include_pending: bool) -> Option<&Track> {
        let mut filter = TrackFilter::local(media_type);
        filter.include_pending = include_pending;
        self.tracks.values().find(|track| filter.matches(track))
    }

    pub fn list(&self, filter: &TrackFilter) -> Vec<&Track> {
        self.tracks.values().filter(|track| filter.matches(track)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Register a listener that lives at most as long as the track.
    pub fn subscribe(
        &self,
        id: &TrackId,
        listener: impl Fn(&TrackChange) + Send + Sync + 'static,
    ) -> Result<Subscription, MediaError> {
        if !self.tracks.contains_key(id) {
            return Err(MediaError::UnknownTrack(id.clone()));
        }
        let listener: TrackListener = Arc::new(listener);
        let listener_id = self.listeners.lock().insert(id.clone(), listener);
        Ok(Subscription::new(&self.listeners, id.clone(), listener_id))
    }

    pub fn subscription_count(&self, id: &TrackId) -> usize {
        self.listeners.lock().count(id)
    }
}
