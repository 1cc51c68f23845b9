//! Source trait and the line-device capture implementation.
//!
//! A [`Source`] produces frames and pushes them to at most one attached
//! [`Sink`]. The crate provides [`LineSource`], which captures from a
//! microphone-like device, applies gain, and encodes via an injected codec.

mod line;

pub use line::{LineSource, SourceStats};

use std::sync::Arc;

use crate::config::StreamFormat;
use crate::error::StreamError;
use crate::sink::Sink;

/// A producer of audio frames.
///
/// Lifecycle transitions are idempotent: `start()` on a running source and
/// `stop()` on a stopped one are no-ops. Both are safe to call from any
/// thread.
pub trait Source: Send + Sync {
    /// Opens the capture device and begins producing frames.
    ///
    /// # Errors
    ///
    /// [`StreamError::DeviceUnavailable`] if the device cannot be acquired.
    fn start(&self) -> Result<(), StreamError>;

    /// Signals the capture loop to exit and releases the device.
    fn stop(&self);

    /// The negotiated stream format frames are produced at.
    fn format(&self) -> StreamFormat;

    /// Attaches (or detaches, with `None`) the sink receiving this source's
    /// frames.
    ///
    /// Rebinding takes effect on the next produced frame; already-buffered
    /// frames are unaffected.
    fn set_sink(&self, sink: Option<Arc<dyn Sink>>);
}

/// The capturing end of a call.
///
/// The variant set is closed: a source is either a local line device or a
/// remote peer. `Remote` is a recognized placeholder until the mesh
/// transport lands.
pub enum CallSource {
    /// Capture from a local line device.
    Local(LineSource),
    /// Frames arriving from a remote peer. Not yet implemented.
    Remote,
}

impl CallSource {
    /// Starts capture on a local source.
    pub fn start(&self) -> Result<(), StreamError> {
        match self {
            Self::Local(source) => source.start(),
            Self::Remote => Err(StreamError::RemoteUnsupported),
        }
    }

    /// Stops capture. No-op for remote placeholders.
    pub fn stop(&self) {
        if let Self::Local(source) = self {
            source.stop();
        }
    }

    /// Attaches a sink to a local source.
    pub fn set_sink(&self, sink: Option<Arc<dyn Sink>>) -> Result<(), StreamError> {
        match self {
            Self::Local(source) => {
                source.set_sink(sink);
                Ok(())
            }
            Self::Remote => Err(StreamError::RemoteUnsupported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PcmCodec;
    use crate::config::SourceConfig;
    use crate::device::MockCaptureDevice;

    #[test]
    fn test_remote_source_is_rejected() {
        let remote = CallSource::Remote;
        assert!(matches!(
            remote.start(),
            Err(StreamError::RemoteUnsupported)
        ));
        assert!(remote.set_sink(None).is_err());
        remote.stop();
    }

    #[test]
    fn test_local_source_delegates() {
        let source = LineSource::new(
            Box::new(MockCaptureDevice::new()),
            Box::new(PcmCodec::new()),
            SourceConfig::default(),
        );
        let local = CallSource::Local(source);

        local.start().unwrap();
        assert!(local.set_sink(None).is_ok());
        local.stop();
    }
}
