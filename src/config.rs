//! Configuration types for sources and sinks.

/// Sample rate used when a codec states no preference: 48 kHz, the common
/// full-band voice rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Sample rate and channel count of a PCM stream.
///
/// Carried by sources and sinks rather than by individual frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    /// Sample rate in Hz (e.g. 8000, 16000, 48000).
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo).
    pub channels: u16,
}

impl StreamFormat {
    /// Creates a format with the given rate and channel count.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// The default voice-call format: 48 kHz mono.
    pub fn voice() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, 1)
    }
}

impl Default for StreamFormat {
    fn default() -> Self {
        Self::voice()
    }
}

/// Configuration for a [`LineSource`](crate::LineSource).
///
/// # Example
///
/// ```
/// use voiceline::SourceConfig;
///
/// let config = SourceConfig {
///     gain: 1.5,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Target frame duration in milliseconds.
    ///
    /// The actual duration is negotiated against the codec's framing
    /// constraints and may differ. Default: 80 ms.
    pub frame_duration_ms: f32,

    /// Gain multiplier applied to every captured sample.
    ///
    /// A gain of exactly 1.0 skips the multiply on the capture path.
    /// Default: 1.0.
    pub gain: f32,

    /// Capture channel count. Default: 1 (mono voice).
    pub channels: u16,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            frame_duration_ms: 80.0,
            gain: 1.0,
            channels: 1,
        }
    }
}

/// Configuration for a [`LineSink`](crate::LineSink).
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Start playback automatically once enough frames have buffered.
    ///
    /// Default: true.
    pub auto_start: bool,

    /// Request the platform's low-latency playback path if available.
    ///
    /// Default: false.
    pub low_latency: bool,

    /// Explicit stream format.
    ///
    /// When unset, the format is detected from the first frame's source.
    pub format: Option<StreamFormat>,
}

impl Default for SinkConfig {
    /// Auto-start on, low-latency off, format detected from the feeding
    /// source.
    fn default() -> Self {
        Self {
            auto_start: true,
            low_latency: false,
            format: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_format_voice() {
        let format = StreamFormat::voice();
        assert_eq!(format.sample_rate, 48_000);
        assert_eq!(format.channels, 1);
        assert_eq!(format, StreamFormat::default());
    }

    #[test]
    fn test_source_config_defaults() {
        let config = SourceConfig::default();
        assert_eq!(config.frame_duration_ms, 80.0);
        assert_eq!(config.gain, 1.0);
        assert_eq!(config.channels, 1);
    }

    #[test]
    fn test_sink_config_defaults() {
        let config = SinkConfig::default();
        assert!(config.auto_start);
        assert!(!config.low_latency);
        assert!(config.format.is_none());
    }
}
