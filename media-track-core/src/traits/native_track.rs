use crate::models::error::DeviceError;
use crate::models::media_stream::MediaStream;
use crate::models::track::MediaType;

/// Engine-side capture or render primitive backing a track.
///
/// Implemented by the conferencing engine adapter. Calls arrive on the
/// thread that owns the track manager.
pub trait NativeTrack: Send + Sync {
    fn media_type(&self) -> MediaType;

    /// The unprocessed signal captured from (or received for) the device.
    fn source_stream(&self) -> MediaStream;

    /// Replace what this track transmits. `None` restores `source_stream`.
    fn set_outgoing_stream(&self, stream: Option<MediaStream>) -> Result<(), DeviceError>;

    /// Hardware-level enabled flag; the logical mute is its negation.
    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool) -> Result<(), DeviceError>;

    /// False once the underlying device has gone away.
    fn is_live(&self) -> bool;
}
