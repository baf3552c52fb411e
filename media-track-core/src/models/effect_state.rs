use serde::{Deserialize, Serialize};

/// Effect lifecycle.
///
/// State transitions per attachment:
/// ```text
/// idle → running → stopped
///            ↑          │
///            └ reattach ┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectState {
    #[default]
    Idle,
    Running,
    Stopped,
}

impl EffectState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether `start` is allowed from this state.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Stopped)
    }

    /// Whether moving to `next` keeps the lifecycle monotonic.
    /// `Stopped → Running` is the reattach edge.
    pub fn can_transition_to(&self, next: EffectState) -> bool {
        matches!(
            (*self, next),
            (Self::Idle, Self::Running)
                | (Self::Idle, Self::Stopped)
                | (Self::Running, Self::Stopped)
                | (Self::Stopped, Self::Running)
        )
    }
}
