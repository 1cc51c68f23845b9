//! # voiceline
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Real-time duplex audio streaming for mesh voice calls.
//!
//! `voiceline` is the source/sink engine at the heart of a voice call: it
//! captures microphone audio, adapts it to a codec's framing constraints,
//! and streams decoded audio to a speaker under bounded memory and bounded
//! latency, degrading gracefully when the two ends drift apart.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use voiceline::{LineSink, LineSource, PcmCodec, SinkConfig, Source, SourceConfig};
//!
//! // Devices come from the platform layer; any CaptureDevice/PlaybackDevice works
//! let sink = Arc::new(
//!     LineSink::new(speaker, SinkConfig::default())
//!         .with_codec(Box::new(PcmCodec::new())),
//! );
//!
//! let source = LineSource::new(microphone, Box::new(PcmCodec::new()), SourceConfig::default());
//! source.set_sink(Some(sink.clone()));
//! source.start()?;
//!
//! // ... call runs; playback auto-starts when the first frame buffers ...
//!
//! source.stop();
//! sink.stop();
//! ```
//!
//! ## Architecture
//!
//! Each running component owns exactly one loop thread:
//!
//! - **Capture loop** (`LineSource`): device read, gain, encode, push to the
//!   attached sink
//! - **Digest loop** (`LineSink`): queue poll, decode, PCM conversion,
//!   device write
//!
//! The loops never share a lock; everything between them passes through a
//! bounded lock-free frame queue and the two-method [`Sink`] contract. The
//! queue favors recency over completeness: under overflow or accumulated
//! lag the oldest frame is dropped, never the newest, and a queue that
//! stays empty past the underrun timeout stops playback cleanly instead of
//! masking the outage with silence.

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod codec;
mod config;
pub mod device;
mod error;
mod event;
pub mod format;
mod frame;
mod sink;
mod source;

pub use codec::{AudioCodec, CodecInfo, PcmCodec};
pub use config::{SinkConfig, SourceConfig, StreamFormat, DEFAULT_SAMPLE_RATE};
pub use device::{CaptureDevice, MockCaptureDevice, MockPlaybackDevice, PlaybackDevice};
pub use error::{CodecError, DeviceError, StreamError};
pub use event::{event_callback, CodecStage, EventCallback, StopReason, StreamEvent};
pub use frame::{AudioFrame, EncodedFrame, FramePayload};
pub use sink::{CallSink, ChannelSink, FrameQueue, LineSink, Sink, SinkStats};
pub use source::{CallSource, LineSource, Source, SourceStats};
