//! Device collaborator traits.
//!
//! The hardware layer (ALSA, CoreAudio, a DSP bridge) lives outside this
//! crate. Sources and sinks talk to it only through these traits, injected
//! at construction. [`mock`] provides hardware-free implementations for
//! tests and CI.

pub mod mock;

pub use mock::{MockCaptureDevice, MockCaptureHandle, MockPlaybackDevice, MockPlaybackHandle};

use crate::error::DeviceError;

/// A microphone-like capture device.
///
/// Expected to deliver pre-filtered audio: any hardware filtering or
/// preprocessing happens before data reaches this interface.
pub trait CaptureDevice: Send {
    /// Opens the device for capture at the given format.
    ///
    /// A running source holds the device exclusively until it stops.
    fn start_recording(
        &mut self,
        sample_rate: u32,
        channels: u16,
        samples_per_frame: usize,
    ) -> Result<(), DeviceError>;

    /// Reads one frame of little-endian 16-bit PCM.
    ///
    /// Returns `None` when no full frame is available yet; that is not an
    /// error, the caller pauses briefly and retries.
    fn read_audio(&mut self, samples_per_frame: usize) -> Option<Vec<u8>>;

    /// Releases the device.
    fn stop_recording(&mut self);
}

/// A speaker-like playback device.
pub trait PlaybackDevice: Send {
    /// Opens the device for playback at the given format.
    ///
    /// `low_latency` requests the platform's low-latency performance path
    /// where supported; devices without one ignore the flag.
    fn start_playback(
        &mut self,
        sample_rate: u32,
        channels: u16,
        low_latency: bool,
    ) -> Result<(), DeviceError>;

    /// Submits one frame of little-endian 16-bit PCM for playback.
    fn write_audio(&mut self, bytes: &[u8]) -> Result<(), DeviceError>;

    /// Releases the device.
    fn stop_playback(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traits_are_object_safe() {
        fn assert_boxable(_: &dyn CaptureDevice, _: &dyn PlaybackDevice) {}
        let capture = MockCaptureDevice::new();
        let playback = MockPlaybackDevice::new();
        assert_boxable(&capture, &playback);
    }
}
