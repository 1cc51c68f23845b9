//! Sink trait and implementations for audio destinations.
//!
//! A [`Sink`] is anything that accepts frames from a source. The crate
//! provides two built-in sinks:
//!
//! - [`LineSink`]: buffers frames and plays them on a line device (speaker)
//! - [`ChannelSink`]: forwards frames to a tokio mpsc channel, the seam the
//!   network transport plugs into

mod channel;
mod line;
mod queue;

pub use channel::ChannelSink;
pub use line::{LineSink, SinkStats};
pub use queue::FrameQueue;

use std::sync::Arc;

use crate::config::StreamFormat;
use crate::error::StreamError;
use crate::frame::FramePayload;

/// A destination for audio frames.
///
/// # Contract
///
/// - [`can_receive`](Sink::can_receive) is advisory: it lets the producer
///   skip wasted encode work under backpressure. It must be O(1) and must
///   not take any lock the producer's hot path could contend on.
/// - [`handle_frame`](Sink::handle_frame) accepts unconditionally, even when
///   `can_receive` would have said no, and must never block the caller.
/// - Methods take `&self`; implementations use interior mutability and are
///   shared across threads as `Arc<dyn Sink>`.
pub trait Sink: Send + Sync {
    /// Answers whether an immediate [`handle_frame`](Sink::handle_frame)
    /// would be accepted without forcing an overflow drop.
    fn can_receive(&self, from: Option<&StreamFormat>) -> bool;

    /// Accepts one frame.
    ///
    /// `from` describes the producing source's stream format, used by sinks
    /// that detect their playback format from the feed. It may be `None`;
    /// sinks must not require it.
    fn handle_frame(&self, frame: FramePayload, from: Option<&StreamFormat>);
}

/// The playing end of a call.
///
/// The variant set is closed: a sink is either a local line device or a
/// remote peer. `Remote` is a recognized placeholder until the mesh
/// transport lands; its operations are rejected rather than silently
/// ignored.
pub enum CallSink {
    /// Playback through a local line device.
    Local(Arc<LineSink>),
    /// Playback at a remote peer. Not yet implemented.
    Remote,
}

impl CallSink {
    /// Starts playback on a local sink.
    pub fn start(&self) -> Result<(), StreamError> {
        match self {
            Self::Local(sink) => sink.start(),
            Self::Remote => Err(StreamError::RemoteUnsupported),
        }
    }

    /// Stops playback. No-op for remote placeholders.
    pub fn stop(&self) {
        if let Self::Local(sink) = self {
            sink.stop();
        }
    }

    /// Returns the frame-accepting handle for wiring into a source.
    pub fn sink_handle(&self) -> Result<Arc<dyn Sink>, StreamError> {
        match self {
            Self::Local(sink) => {
                let handle: Arc<dyn Sink> = sink.clone();
                Ok(handle)
            }
            Self::Remote => Err(StreamError::RemoteUnsupported),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SinkConfig;
    use crate::device::MockPlaybackDevice;

    #[test]
    fn test_sink_trait_is_object_safe() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn Sink>();
        assert_send_sync::<Arc<dyn Sink>>();
    }

    #[test]
    fn test_remote_sink_is_rejected() {
        let remote = CallSink::Remote;
        assert!(matches!(
            remote.start(),
            Err(StreamError::RemoteUnsupported)
        ));
        assert!(remote.sink_handle().is_err());
        // stop on a placeholder is a harmless no-op
        remote.stop();
    }

    #[test]
    fn test_local_sink_handle() {
        let sink = Arc::new(LineSink::new(
            Box::new(MockPlaybackDevice::new()),
            SinkConfig {
                auto_start: false,
                ..Default::default()
            },
        ));
        let local = CallSink::Local(sink);
        assert!(local.sink_handle().is_ok());
        local.stop();
    }
}
