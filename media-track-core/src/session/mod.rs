pub mod driver;
pub mod liveness;
pub mod manager;
pub mod mute;
pub mod pipeline;
pub mod timers;
