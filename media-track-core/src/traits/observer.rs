use crate::models::track::Track;

/// Inspection interface handed to the registry at construction.
///
/// Called synchronously after each registry mutation, on the thread that
/// owns the registry.
pub trait RegistryObserver: Send + Sync {
    fn on_track_added(&self, track: &Track);

    fn on_track_updated(&self, track: &Track);

    fn on_track_removed(&self, track: &Track);
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RegistryObserver for NoopObserver {
    fn on_track_added(&self, _track: &Track) {}

    fn on_track_updated(&self, _track: &Track) {}

    fn on_track_removed(&self, _track: &Track) {}
}
