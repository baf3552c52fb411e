use std::sync::Arc;
use std::time::Duration;

use crate::models::error::MediaError;
use crate::models::notification::{Notification, NotificationKind};
use crate::models::track::{LivenessInfo, MediaType, Track, TrackId, TrackPatch};
use crate::registry::TrackRegistry;
use crate::session::timers::{Clock, TimerQueue};
use crate::traits::notifier::NotificationSink;

/// Per-track no-data state, derived from the track's liveness bookkeeping.
///
/// ```text
/// Receiving ──no data (video)──→ PendingNotification ──timeout──→ Notified
///     ↑                                  │                           │
///     └────────────── receiving ─────────┴───────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    Receiving,
    PendingNotification,
    Notified,
}

impl LivenessState {
    pub fn of(track: &Track) -> Self {
        match track.liveness {
            LivenessInfo {
                notification: Some(_),
                ..
            } => Self::Notified,
            LivenessInfo {
                no_data_timer: Some(_),
                ..
            } => Self::PendingNotification,
            _ => Self::Receiving,
        }
    }
}

/// Debounced "no data from source" detection.
///
/// Audio resolves immediately; video waits `timeout` before raising a
/// notification so momentary encoder stalls are not reported.
pub struct LivenessMonitor {
    timeout: Duration,
    monitor_remote: bool,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationSink>,
    timers: TimerQueue<TrackId>,
}

impl LivenessMonitor {
    pub fn new(
        timeout: Duration,
        monitor_remote: bool,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            timeout,
            monitor_remote,
            clock,
            notifier,
            timers: TimerQueue::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn on_no_data(&mut self, registry: &mut TrackRegistry, track_id: &TrackId) {
        let Some(track) = registry.get(track_id) else {
            return;
        };
        if !self.applies_to(track) {
            return;
        }

        match (track.media_type, LivenessState::of(track)) {
            (MediaType::Audio, _) => {
                // Any audio gap is actionable on its own; nothing to debounce.
                let track = track.clone();
                self.clear(&track);
                registry.patch(
                    track_id,
                    TrackPatch {
                        receiving_data: Some(false),
                        liveness: Some(LivenessInfo::default()),
                        ..TrackPatch::default()
                    },
                );
            }
            (MediaType::Video, LivenessState::Receiving) => {
                let deadline = self.clock.now() + self.timeout;
                let timer = self.timers.schedule(deadline, track_id.clone());
                log::debug!(
                    "No data from video track {}, notifying in {:?} unless it recovers",
                    track_id,
                    self.timeout
                );
                registry.patch(
                    track_id,
                    TrackPatch {
                        receiving_data: Some(false),
                        liveness: Some(LivenessInfo::pending(timer)),
                        ..TrackPatch::default()
                    },
                );
            }
            (MediaType::Video, state) => {
                log::debug!("Repeated no-data on video track {} ignored ({:?})", track_id, state);
            }
        }
    }

    pub fn on_receiving(&mut self, registry: &mut TrackRegistry, track_id: &TrackId) {
        let Some(track) = registry.get(track_id) else {
            return;
        };
        let state = LivenessState::of(track);
        if state != LivenessState::Receiving {
            let track = track.clone();
            self.clear(&track);
            log::debug!("Track {} is receiving data again ({:?} cleared)", track_id, state);
        }
        registry.patch(
            track_id,
            TrackPatch {
                receiving_data: Some(true),
                liveness: Some(LivenessInfo::default()),
                ..TrackPatch::default()
            },
        );
    }

    /// Fire every elapsed debounce timer. Returns the raised notifications.
    pub fn run_due(&mut self, registry: &mut TrackRegistry) -> Vec<Notification> {
        let mut raised = Vec::new();
        for (timer, track_id) in self.timers.pop_due(self.clock.now()) {
            let Some(track) = registry.get(&track_id) else {
                continue;
            };
            if track.liveness.no_data_timer != Some(timer) {
                continue;
            }

            let notification = Notification::new(
                Some(track_id.clone()),
                NotificationKind::NoDataFromSource {
                    media_type: track.media_type,
                },
            );
            log::warn!("{}", MediaError::NoDataTimeout(track_id.clone()));
            self.notifier.raise(&notification);
            registry.patch(&track_id, TrackPatch::liveness(LivenessInfo::notified(notification.id)));
            raised.push(notification);
        }
        raised
    }

    /// Drop all liveness state of a track that is being removed.
    pub fn release(&mut self, track: &Track) {
        self.clear(track);
    }

    pub fn next_deadline(&self) -> Option<std::time::Instant> {
        self.timers.next_deadline()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    fn applies_to(&self, track: &Track) -> bool {
        !track.is_pending() && (track.local || self.monitor_remote)
    }

    /// Cancel the live timer and dismiss the live notification, if any.
    fn clear(&mut self, track: &Track) {
        if let Some(timer) = track.liveness.no_data_timer {
            self.timers.cancel(timer);
        }
        if let Some(notification) = track.liveness.notification {
            self.notifier.dismiss(notification);
        }
    }
}
