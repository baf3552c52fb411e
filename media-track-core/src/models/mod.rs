pub mod config;
pub mod effect_state;
pub mod error;
pub mod event;
pub mod media_stream;
pub mod notification;
pub mod track;
