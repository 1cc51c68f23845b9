//! Codec seam between the streaming engine and codec implementations.
//!
//! Codec implementations (Opus, Codec2, etc.) live outside this crate. The
//! engine only needs the encode/decode transforms and the framing
//! constraints advertised by [`CodecInfo`].

use crate::error::CodecError;
use crate::format::{bytes_to_f32, f32_to_bytes};
use crate::frame::EncodedFrame;

/// Read-only framing constraints advertised by a codec.
///
/// Supplied once at source/sink construction and immutable afterwards. All
/// fields are optional; an unconstrained codec leaves everything `None`.
#[derive(Debug, Clone, Default)]
pub struct CodecInfo {
    /// Sample rate the codec wants its input captured at.
    pub preferred_sample_rate: Option<u32>,

    /// Smallest increment of frame duration the codec accepts; frame
    /// durations must be exact multiples of this value.
    pub frame_quanta_ms: Option<f32>,

    /// Largest frame duration the codec accepts.
    pub frame_max_ms: Option<f32>,

    /// Discrete list of accepted frame durations. When set, this is the
    /// final authority on frame sizing.
    pub valid_frame_ms: Option<Vec<f32>>,
}

/// A codec that turns normalized samples into opaque encoded frames and back.
///
/// Encode and decode may be stateful (most voice codecs are), so both take
/// `&mut self`. Errors are per-frame and recoverable: the engine logs them,
/// drops the frame, and keeps streaming.
pub trait AudioCodec: Send {
    /// Returns the codec's framing constraints.
    fn info(&self) -> &CodecInfo;

    /// Encodes one frame of normalized samples.
    fn encode(&mut self, samples: &[f32]) -> Result<EncodedFrame, CodecError>;

    /// Decodes one encoded frame back to normalized samples.
    fn decode(&mut self, data: &[u8]) -> Result<Vec<f32>, CodecError>;
}

/// Pass-through codec carrying uncompressed 16-bit little-endian PCM.
///
/// Useful on links fat enough to skip compression, and as the codec of
/// choice for tests and demos: encode and decode are pure sample
/// conversions with no codec state.
#[derive(Debug, Default)]
pub struct PcmCodec {
    info: CodecInfo,
}

impl PcmCodec {
    /// Creates an unconstrained PCM codec (any frame size, any rate).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sample rate this codec prefers its input captured at.
    pub fn with_preferred_rate(mut self, sample_rate: u32) -> Self {
        self.info.preferred_sample_rate = Some(sample_rate);
        self
    }

    /// Replaces the full constraint descriptor.
    pub fn with_info(mut self, info: CodecInfo) -> Self {
        self.info = info;
        self
    }
}

impl AudioCodec for PcmCodec {
    fn info(&self) -> &CodecInfo {
        &self.info
    }

    fn encode(&mut self, samples: &[f32]) -> Result<EncodedFrame, CodecError> {
        Ok(EncodedFrame::new(f32_to_bytes(samples)))
    }

    fn decode(&mut self, data: &[u8]) -> Result<Vec<f32>, CodecError> {
        if data.len() % 2 != 0 {
            return Err(CodecError::failed(format!(
                "PCM payload length {} is not sample-aligned",
                data.len()
            )));
        }
        Ok(bytes_to_f32(data))
    }
}
