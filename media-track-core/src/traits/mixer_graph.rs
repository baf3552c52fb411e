use crate::models::error::MediaError;
use crate::models::media_stream::MediaStream;

/// Audio mixing primitive: N input signals in, one mixed signal out.
pub trait MixerGraph: Send {
    fn add_input(&mut self, stream: MediaStream) -> Result<(), MediaError>;

    /// Build the graph and return the mixed output.
    fn start(&mut self) -> Result<MediaStream, MediaError>;

    /// Tear the graph down and release every input.
    fn reset(&mut self);

    fn is_running(&self) -> bool;

    /// Reason the graph stopped producing output, if an input was lost.
    fn failure(&self) -> Option<String>;
}
