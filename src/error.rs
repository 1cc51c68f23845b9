//! Error types for voiceline.
//!
//! Errors are split into two tiers:
//! - **Fatal errors** ([`StreamError`]): returned from `start()`, the
//!   component could not begin streaming.
//! - **Recoverable errors** ([`CodecError`]): per-frame failures handled
//!   inside the loops; the frame is dropped and streaming continues.

/// Fatal errors that prevent a source or sink from starting.
///
/// Runtime issues (backpressure drops, codec failures on individual frames,
/// underruns) are surfaced via [`StreamEvent`](crate::StreamEvent) instead.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The capture or playback device could not be acquired.
    ///
    /// Fatal for this component instance; the caller must retry with a
    /// different device or abort the call.
    #[error("device unavailable: {name}: {source}")]
    DeviceUnavailable {
        /// Which device failed ("capture" or "playback").
        name: &'static str,
        /// The underlying device failure.
        #[source]
        source: DeviceError,
    },

    /// The operation is not available on a remote endpoint placeholder.
    #[error("remote endpoints are not implemented")]
    RemoteUnsupported,
}

/// Errors produced by a device collaborator.
///
/// Device implementations live outside this crate; these variants cover the
/// failure modes the streaming engine distinguishes.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The device is held by another process or component.
    #[error("device busy")]
    Busy,

    /// The OS denied access to the device.
    #[error("permission denied")]
    PermissionDenied,

    /// An error from the underlying audio backend.
    #[error("audio backend error: {0}")]
    Backend(String),

    /// Custom error for user-implemented devices.
    #[error("{0}")]
    Custom(String),
}

impl DeviceError {
    /// Creates a backend error with the given message.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Creates a custom device error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Recoverable per-frame codec failures.
///
/// A codec error never terminates a capture or digest loop; the offending
/// frame is dropped and the loop continues.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame length does not match what the codec expects.
    #[error("invalid frame size: got {got} samples, expected {expected}")]
    InvalidFrameSize {
        /// Sample count that was offered.
        got: usize,
        /// Sample count the codec requires.
        expected: usize,
    },

    /// The codec failed to process an otherwise well-formed frame.
    #[error("codec failure: {reason}")]
    Failed {
        /// Description of what went wrong.
        reason: String,
    },
}

impl CodecError {
    /// Creates a generic codec failure with the given reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}
