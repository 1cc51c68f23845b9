//! Runtime events for monitoring stream health.
//!
//! Events are non-fatal notifications about stream behavior. The loops keep
//! running after an event is emitted; the orchestration layer decides whether
//! a given signal warrants user-facing action (ending the call, showing a
//! reconnect prompt).

use std::sync::Arc;

/// Which half of a codec produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecStage {
    /// Failure while encoding captured audio.
    Encode,
    /// Failure while decoding a queued frame.
    Decode,
}

/// Why a sink's playback loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `stop()` was called.
    Requested,
    /// The queue stayed empty past the underrun timeout.
    ///
    /// No synthetic silence is inserted; a persistent underrun means
    /// upstream has nothing to say, and the stop itself is the signal.
    UnderrunTimeout,
}

/// Runtime events emitted by sources and sinks.
///
/// These are informational, not errors. Register an [`EventCallback`] to log
/// them or feed a call-health monitor.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// The producer dropped an encoded frame because the sink reported
    /// backpressure.
    ///
    /// Not an error: real-time audio favors recency over completeness.
    BackpressureDrop {
        /// Total frames dropped by this source so far.
        dropped_frames: u64,
    },

    /// A frame arrived at a full queue and displaced the oldest entry.
    QueueOverflow,

    /// The digest loop trimmed the queue after a write because latency was
    /// accumulating.
    LagDrop {
        /// Queue length observed before the trim.
        queue_len: usize,
    },

    /// A codec rejected a single frame; the frame was dropped.
    CodecFailure {
        /// Whether the failure happened on encode or decode.
        stage: CodecStage,
        /// Description of the error.
        error: String,
    },

    /// The capture loop began producing frames.
    CaptureStarted {
        /// Negotiated capture sample rate.
        sample_rate: u32,
        /// Negotiated capture channel count.
        channels: u16,
    },

    /// The capture loop exited and released its device.
    CaptureStopped,

    /// The digest loop began playing frames.
    PlaybackStarted {
        /// Sample rate the playback device was opened at.
        sample_rate: u32,
        /// Channel count the playback device was opened at.
        channels: u16,
    },

    /// The digest loop exited and released its device.
    PlaybackStopped {
        /// Why playback stopped.
        reason: StopReason,
    },

    /// An auto-start attempt from `handle_frame` failed.
    ///
    /// The producer is never poisoned by the consumer's device; the failure
    /// is reported here instead of propagating.
    PlaybackStartFailed {
        /// Description of the start failure.
        error: String,
    },
}

/// Callback type for receiving runtime events.
///
/// Register via `with_event_callback` on [`LineSource`](crate::LineSource)
/// or [`LineSink`](crate::LineSink).
pub type EventCallback = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use voiceline::{event_callback, StreamEvent};
///
/// let callback = event_callback(|event| {
///     tracing::warn!(?event, "stream event");
/// });
/// callback(StreamEvent::QueueOverflow);
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(StreamEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_event_debug() {
        let event = StreamEvent::LagDrop { queue_len: 4 };
        let debug = format!("{event:?}");
        assert!(debug.contains("LagDrop"));
        assert!(debug.contains('4'));
    }

    #[test]
    fn test_event_clone() {
        let event = StreamEvent::CodecFailure {
            stage: CodecStage::Decode,
            error: "truncated".to_string(),
        };
        let cloned = event.clone();
        if let StreamEvent::CodecFailure { stage, error } = cloned {
            assert_eq!(stage, CodecStage::Decode);
            assert_eq!(error, "truncated");
        } else {
            panic!("expected CodecFailure variant");
        }
    }

    #[test]
    fn test_event_callback_helper() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let callback = event_callback(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        callback(StreamEvent::CaptureStopped);
        callback(StreamEvent::PlaybackStopped {
            reason: StopReason::UnderrunTimeout,
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
