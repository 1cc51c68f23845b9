//! Tokio mpsc channel sink.
//!
//! The seam the network transport plugs into: a source feeds this sink and
//! the transport task drains the receiver, packetizes, and ships frames over
//! the mesh.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::config::StreamFormat;
use crate::event::{EventCallback, StreamEvent};
use crate::frame::FramePayload;
use crate::sink::Sink;

/// Dropped-frame count between log lines while the channel stays full.
const DROP_LOG_INTERVAL: u64 = 50;

/// A sink that forwards frames to a tokio mpsc channel.
///
/// Delivery is strictly non-blocking: a full channel drops the frame rather
/// than stalling the capture loop, and `can_receive` reflects remaining
/// channel capacity so the producer can skip the encode work up front.
///
/// # Example
///
/// ```
/// use tokio::sync::mpsc;
/// use voiceline::{ChannelSink, FramePayload};
///
/// let (tx, mut rx) = mpsc::channel::<FramePayload>(32);
/// let sink = ChannelSink::new(tx);
///
/// // hand `sink` to a source via `set_sink`, then in the transport task:
/// // while let Some(frame) = rx.recv().await { ... }
/// ```
pub struct ChannelSink {
    name: String,
    sender: mpsc::Sender<FramePayload>,
    dropped: AtomicU64,
    events: Option<EventCallback>,
}

impl ChannelSink {
    /// Creates a channel sink with the given sender.
    ///
    /// Size the channel for the consumer's draining speed; a capacity of 32
    /// (about 2.5 seconds of 80 ms frames) suits most transports.
    pub fn new(sender: mpsc::Sender<FramePayload>) -> Self {
        Self {
            name: "channel".to_string(),
            sender,
            dropped: AtomicU64::new(0),
            events: None,
        }
    }

    /// Creates a channel sink with a custom name for logging.
    pub fn with_name(name: impl Into<String>, sender: mpsc::Sender<FramePayload>) -> Self {
        Self {
            name: name.into(),
            sender,
            dropped: AtomicU64::new(0),
            events: None,
        }
    }

    /// Registers a callback for runtime events.
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.events = Some(callback);
        self
    }

    /// Human-readable name for logging.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frames dropped because the channel was full or closed.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn record_drop(&self, why: &str) {
        let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(callback) = &self.events {
            callback(StreamEvent::BackpressureDrop {
                dropped_frames: dropped,
            });
        }
        if dropped == 1 || dropped % DROP_LOG_INTERVAL == 0 {
            tracing::warn!(
                sink = %self.name,
                total_dropped = dropped,
                "{why}, frame dropped"
            );
        }
    }
}

impl Sink for ChannelSink {
    fn can_receive(&self, _from: Option<&StreamFormat>) -> bool {
        self.sender.capacity() > 0
    }

    fn handle_frame(&self, frame: FramePayload, _from: Option<&StreamFormat>) {
        match self.sender.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.record_drop("transport channel full"),
            Err(TrySendError::Closed(_)) => self.record_drop("transport channel closed"),
        }
    }
}
