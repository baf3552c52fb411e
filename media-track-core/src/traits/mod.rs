pub mod effect;
pub mod engine;
pub mod mixer_graph;
pub mod native_track;
pub mod notifier;
pub mod observer;
