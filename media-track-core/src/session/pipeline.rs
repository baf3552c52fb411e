use std::collections::HashMap;
use std::sync::Arc;

use crate::models::effect_state::EffectState;
use crate::models::error::MediaError;
use crate::models::notification::{Notification, NotificationKind};
use crate::models::track::{EffectDescriptor, EffectKind, NativeHandle, Track, TrackId, TrackPatch};
use crate::registry::TrackRegistry;
use crate::traits::effect::StreamEffect;
use crate::traits::notifier::NotificationSink;

struct AttachedEffect {
    instance_id: uuid::Uuid,
    effect: Box<dyn StreamEffect>,
}

impl AttachedEffect {
    fn descriptor(&self) -> EffectDescriptor {
        EffectDescriptor {
            instance_id: self.instance_id,
            kind: self.effect.kind(),
            state: self.effect.state(),
        }
    }
}

/// A running effect that died and was removed from its track.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectTermination {
    pub error: MediaError,
    pub notification: Notification,
}

/// Ordered start/stop lifecycle of the effect attached to each local track.
///
/// At most one effect runs per track. Replacing an effect stops the old one
/// before the new one starts, so two effects never hold the same capture
/// device at once.
pub struct EffectPipeline {
    attached: HashMap<TrackId, AttachedEffect>,
    notifier: Arc<dyn NotificationSink>,
}

impl EffectPipeline {
    pub fn new(notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            attached: HashMap::new(),
            notifier,
        }
    }

    /// Attach `effect` to a local track, replacing any running effect.
    ///
    /// On `EffectNotApplicable` nothing is touched. On `EffectStartFailed`
    /// the previously running effect is restarted if it allows it, otherwise
    /// the track transmits its plain source.
    pub fn attach(
        &mut self,
        registry: &mut TrackRegistry,
        track_id: &TrackId,
        mut effect: Box<dyn StreamEffect>,
    ) -> Result<EffectDescriptor, MediaError> {
        let track = registry
            .get(track_id)
            .ok_or_else(|| MediaError::UnknownTrack(track_id.clone()))?;
        let kind = effect.kind();
        if !track.local || !effect.is_enabled(track) {
            return Err(MediaError::EffectNotApplicable {
                track_id: track_id.clone(),
                kind,
            });
        }
        let native = track
            .native
            .clone()
            .ok_or_else(|| MediaError::TrackPending(track_id.clone()))?;

        let previous = self.attached.remove(track_id).map(|mut previous| {
            previous.effect.stop();
            restore_source(&native, track_id);
            previous
        });

        match start_on(&native, effect.as_mut()) {
            Ok(()) => {
                let attached = AttachedEffect {
                    instance_id: uuid::Uuid::new_v4(),
                    effect,
                };
                let descriptor = attached.descriptor();
                self.attached.insert(track_id.clone(), attached);
                registry.patch(track_id, TrackPatch::effects_chain(vec![descriptor.clone()]));
                log::debug!("Effect {} running on track {}", kind, track_id);
                Ok(descriptor)
            }
            Err(e) => {
                log::error!("Effect {} failed to start on track {}: {}", kind, track_id, e);
                let chain = match previous {
                    Some(mut previous) => match start_on(&native, previous.effect.as_mut()) {
                        Ok(()) => {
                            let descriptor = previous.descriptor();
                            self.attached.insert(track_id.clone(), previous);
                            vec![descriptor]
                        }
                        Err(restart) => {
                            log::warn!("Previous effect on track {} could not be restored: {}", track_id, restart);
                            Vec::new()
                        }
                    },
                    None => Vec::new(),
                };
                registry.patch(track_id, TrackPatch::effects_chain(chain));
                Err(match e {
                    MediaError::EffectStartFailed { .. } => e,
                    other => MediaError::EffectStartFailed {
                        kind,
                        reason: other.to_string(),
                    },
                })
            }
        }
    }

    /// Stop and remove the running effect. Returns false if there was none.
    pub fn detach(&mut self, registry: &mut TrackRegistry, track_id: &TrackId) -> bool {
        let Some(mut attached) = self.attached.remove(track_id) else {
            return false;
        };
        attached.effect.stop();
        if let Some(native) = registry.get(track_id).and_then(|track| track.native.clone()) {
            restore_source(&native, track_id);
        }
        registry.patch(track_id, TrackPatch::effects_chain(Vec::new()));
        log::debug!("Effect {} detached from track {}", attached.effect.kind(), track_id);
        true
    }

    /// Stop the effect of a track that is being removed.
    pub fn teardown(&mut self, track: &Track) -> bool {
        let Some(mut attached) = self.attached.remove(&track.id) else {
            return false;
        };
        attached.effect.stop();
        if let Some(ref native) = track.native {
            restore_source(native, &track.id);
        }
        true
    }

    /// Terminate every effect that consumes the signal of `lost`.
    pub fn terminate_dependents(&mut self, registry: &mut TrackRegistry, lost: &TrackId) -> Vec<EffectTermination> {
        let affected: Vec<TrackId> = self
            .attached
            .iter()
            .filter(|(_, attached)| attached.effect.depends_on(lost))
            .map(|(track_id, _)| track_id.clone())
            .collect();

        affected
            .into_iter()
            .filter_map(|track_id| self.terminate_on(registry, &track_id, format!("input track {} went away", lost)))
            .collect()
    }

    /// Terminate every running effect whose own track stopped producing a
    /// signal or that reports itself unhealthy.
    pub fn check_health(&mut self, registry: &mut TrackRegistry) -> Vec<EffectTermination> {
        let failing: Vec<(TrackId, String)> = self
            .attached
            .iter()
            .filter_map(|(track_id, attached)| {
                let primary_lost = registry
                    .get(track_id)
                    .and_then(|track| track.native.as_ref())
                    .is_some_and(|native| !native.is_live());
                if primary_lost {
                    return Some((track_id.clone(), format!("input track {} went away", track_id)));
                }
                attached.effect.health().err().map(|reason| (track_id.clone(), reason))
            })
            .collect();

        failing
            .into_iter()
            .filter_map(|(track_id, reason)| self.terminate_on(registry, &track_id, reason))
            .collect()
    }

    pub fn set_effect_muted(&mut self, track_id: &TrackId, muted: bool) -> bool {
        match self.attached.get_mut(track_id) {
            Some(attached) => {
                attached.effect.set_muted(muted);
                true
            }
            None => false,
        }
    }

    pub fn is_effect_muted(&self, track_id: &TrackId) -> Option<bool> {
        self.attached.get(track_id).map(|attached| attached.effect.is_muted())
    }

    pub fn running_kind(&self, track_id: &TrackId) -> Option<EffectKind> {
        self.attached
            .get(track_id)
            .filter(|attached| attached.effect.state() == EffectState::Running)
            .map(|attached| attached.effect.kind())
    }

    pub fn running_count(&self) -> usize {
        self.attached.len()
    }

    /// Stop the effect running on `track_id`, restore the plain source and
    /// raise `EffectTerminated`. Returns `None` if no effect was attached.
    pub fn terminate_on(
        &mut self,
        registry: &mut TrackRegistry,
        track_id: &TrackId,
        reason: String,
    ) -> Option<EffectTermination> {
        let mut attached = self.attached.remove(track_id)?;
        let kind = attached.effect.kind();
        attached.effect.stop();
        if let Some(native) = registry.get(track_id).and_then(|track| track.native.clone()) {
            restore_source(&native, track_id);
        }
        registry.patch(track_id, TrackPatch::effects_chain(Vec::new()));

        let error = MediaError::EffectTerminated {
            track_id: track_id.clone(),
            kind: kind.clone(),
            reason,
        };
        log::error!("{}", error);
        let notification = Notification::new(
            Some(track_id.clone()),
            NotificationKind::EffectTerminated { effect: kind },
        );
        self.notifier.raise(&notification);
        Some(EffectTermination { error, notification })
    }
}

fn start_on(native: &NativeHandle, effect: &mut dyn StreamEffect) -> Result<(), MediaError> {
    let output = effect.start(native.source_stream())?;
    if let Err(e) = native.set_outgoing_stream(Some(output)) {
        effect.stop();
        return Err(e.into());
    }
    Ok(())
}

fn restore_source(native: &NativeHandle, track_id: &TrackId) {
    if let Err(e) = native.set_outgoing_stream(None) {
        log::error!("Failed to restore source stream of track {}: {}", track_id, e);
    }
}
