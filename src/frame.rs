//! Audio frame types passed through the pipeline.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

/// One fixed-duration quantum of decoded audio.
///
/// Samples are normalized 32-bit floats in the range `[-1.0, 1.0]`. Sample
/// rate and channel count are carried by the owning source or sink, not per
/// frame.
///
/// Samples are stored in an `Arc<Vec<f32>>` so cloning a frame is cheap and
/// never copies audio data.
///
/// # Example
///
/// ```
/// use voiceline::AudioFrame;
/// use std::time::Duration;
///
/// let frame = AudioFrame::new(vec![0.0f32; 960]);
/// assert_eq!(frame.duration(48000, 1), Duration::from_millis(20));
///
/// let frame2 = frame.clone(); // cheap clone, shares sample data
/// ```
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Normalized f32 samples, interleaved by channel.
    ///
    /// Wrapped in `Arc` for zero-copy sharing.
    pub samples: Arc<Vec<f32>>,
}

impl AudioFrame {
    /// Creates a new frame from raw samples.
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples: Arc::new(samples),
        }
    }

    /// Creates a frame from pre-wrapped Arc samples.
    pub fn from_arc(samples: Arc<Vec<f32>>) -> Self {
        Self { samples }
    }

    /// Returns the number of samples in this frame.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if this frame contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the playback duration of this frame at the given format.
    ///
    /// Returns `Duration::ZERO` for degenerate formats.
    pub fn duration(&self, sample_rate: u32, channels: u16) -> Duration {
        if sample_rate == 0 || channels == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() / channels as usize;
        Duration::from_secs_f64(frames as f64 / f64::from(sample_rate))
    }
}

/// One encoded frame as produced by a codec.
///
/// The streaming engine treats the contents as opaque bytes; only the codec
/// that produced them can interpret them.
#[derive(Debug, Clone)]
pub struct EncodedFrame(Bytes);

impl EncodedFrame {
    /// Wraps encoded bytes into a frame.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    /// Returns the encoded payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the encoded payload length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for EncodedFrame {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

/// What a sink accepts: decoded samples ready for playback, or an encoded
/// frame the sink decodes in its digest loop.
#[derive(Debug, Clone)]
pub enum FramePayload {
    /// Decoded samples, playable after PCM conversion.
    Decoded(AudioFrame),
    /// Encoded bytes, to be decoded by the sink's codec before playback.
    Encoded(EncodedFrame),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_mono_48khz() {
        let frame = AudioFrame::new(vec![0.0f32; 960]);
        assert_eq!(frame.duration(48000, 1), Duration::from_millis(20));
    }

    #[test]
    fn test_duration_stereo() {
        // 9600 samples / 2 channels = 4800 frames / 48000 Hz = 100ms
        let frame = AudioFrame::new(vec![0.0f32; 9600]);
        assert_eq!(frame.duration(48000, 2), Duration::from_millis(100));
    }

    #[test]
    fn test_duration_degenerate_format() {
        let frame = AudioFrame::new(vec![0.0f32; 100]);
        assert_eq!(frame.duration(0, 1), Duration::ZERO);
        assert_eq!(frame.duration(48000, 0), Duration::ZERO);
    }

    #[test]
    fn test_empty_frame() {
        let frame = AudioFrame::new(vec![]);
        assert!(frame.is_empty());
        assert_eq!(frame.len(), 0);
    }

    #[test]
    fn test_clone_shares_samples() {
        let frame = AudioFrame::new(vec![0.5f32; 100]);
        let clone = frame.clone();
        assert!(Arc::ptr_eq(&frame.samples, &clone.samples));
    }

    #[test]
    fn test_encoded_frame_round_trip() {
        let encoded = EncodedFrame::new(vec![1u8, 2, 3, 4]);
        assert_eq!(encoded.as_bytes(), &[1, 2, 3, 4]);
        assert_eq!(encoded.len(), 4);
        assert!(!encoded.is_empty());
    }

    #[test]
    fn test_encoded_frame_from_vec() {
        let encoded: EncodedFrame = vec![9u8, 8, 7].into();
        assert_eq!(encoded.as_bytes(), &[9, 8, 7]);
    }
}
