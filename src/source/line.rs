//! Line-device capture source.
//!
//! `LineSource` reads raw PCM from an injected capture device, applies gain,
//! encodes via an injected codec, and pushes encoded frames to its attached
//! sink. The capture loop runs on its own OS thread so capture timing never
//! contends with async network tasks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::codec::AudioCodec;
use crate::config::{SourceConfig, StreamFormat, DEFAULT_SAMPLE_RATE};
use crate::device::CaptureDevice;
use crate::error::{DeviceError, StreamError};
use crate::event::{CodecStage, EventCallback, StreamEvent};
use crate::format::{adjust_frame_duration, bytes_to_f32, samples_per_frame};
use crate::frame::FramePayload;
use crate::sink::Sink;
use crate::source::Source;

/// Backpressure drops between log lines, to avoid log storms while the sink
/// stays saturated.
const DROP_LOG_INTERVAL: u64 = 50;

#[derive(Default)]
struct SourceCounters {
    frames_captured: AtomicU64,
    frames_dropped: AtomicU64,
    encode_errors: AtomicU64,
}

/// Snapshot of a source's counters.
#[derive(Debug, Clone, Default)]
pub struct SourceStats {
    /// Frames successfully captured and encoded.
    pub frames_captured: u64,
    /// Encoded frames dropped because no sink was attached or the sink
    /// reported backpressure.
    pub frames_dropped: u64,
    /// Frames dropped because encoding failed.
    pub encode_errors: u64,
}

/// A source that captures from a line device (microphone).
///
/// The frame duration is negotiated against the codec's framing constraints
/// at construction; the capture sample rate follows the codec's preference,
/// falling back to 48 kHz.
///
/// # Example
///
/// ```
/// use voiceline::device::MockCaptureDevice;
/// use voiceline::{LineSource, PcmCodec, Source, SourceConfig};
///
/// let source = LineSource::new(
///     Box::new(MockCaptureDevice::new()),
///     Box::new(PcmCodec::new().with_preferred_rate(8000)),
///     SourceConfig::default(),
/// );
/// assert_eq!(source.samples_per_frame(), 640); // 80ms at 8kHz
/// ```
pub struct LineSource {
    format: StreamFormat,
    frame_duration_ms: f32,
    samples_per_frame: usize,
    gain: f32,
    device: Arc<Mutex<Box<dyn CaptureDevice>>>,
    codec: Arc<Mutex<Box<dyn AudioCodec>>>,
    sink: Arc<Mutex<Option<Arc<dyn Sink>>>>,
    running: Arc<AtomicBool>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<SourceCounters>,
    events: Option<EventCallback>,
}

impl LineSource {
    /// Creates a source around an injected capture device and codec.
    ///
    /// Negotiation happens here: the sample rate is the codec's preferred
    /// rate (default 48 kHz), and the requested frame duration is adjusted
    /// to the codec's framing constraints.
    pub fn new(
        device: Box<dyn CaptureDevice>,
        codec: Box<dyn AudioCodec>,
        config: SourceConfig,
    ) -> Self {
        let info = codec.info();
        let sample_rate = info.preferred_sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);
        let frame_duration_ms = adjust_frame_duration(config.frame_duration_ms, info);
        let per_channel = samples_per_frame(frame_duration_ms, sample_rate);

        tracing::debug!(
            sample_rate,
            channels = config.channels,
            requested_ms = config.frame_duration_ms,
            negotiated_ms = frame_duration_ms,
            samples_per_frame = per_channel,
            "capture format negotiated"
        );

        Self {
            format: StreamFormat::new(sample_rate, config.channels),
            frame_duration_ms,
            samples_per_frame: per_channel,
            gain: config.gain,
            device: Arc::new(Mutex::new(device)),
            codec: Arc::new(Mutex::new(codec)),
            sink: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            loop_handle: Mutex::new(None),
            stats: Arc::new(SourceCounters::default()),
            events: None,
        }
    }

    /// Registers a callback for runtime events.
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.events = Some(callback);
        self
    }

    /// The negotiated frame duration in milliseconds.
    pub fn frame_duration_ms(&self) -> f32 {
        self.frame_duration_ms
    }

    /// Samples per channel in one capture frame.
    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    /// Returns `true` while the capture loop is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns a snapshot of this source's counters.
    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.stats.frames_captured.load(Ordering::Relaxed),
            frames_dropped: self.stats.frames_dropped.load(Ordering::Relaxed),
            encode_errors: self.stats.encode_errors.load(Ordering::Relaxed),
        }
    }

    fn emit(&self, event: StreamEvent) {
        if let Some(callback) = &self.events {
            callback(event);
        }
    }
}

impl Drop for LineSource {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Source for LineSource {
    fn start(&self) -> Result<(), StreamError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(handle) = self.loop_handle.lock().take() {
            let _ = handle.join();
        }

        let opened = self.device.lock().start_recording(
            self.format.sample_rate,
            self.format.channels,
            self.samples_per_frame,
        );
        if let Err(source) = opened {
            self.running.store(false, Ordering::SeqCst);
            return Err(StreamError::DeviceUnavailable {
                name: "capture",
                source,
            });
        }

        tracing::info!(
            sample_rate = self.format.sample_rate,
            channels = self.format.channels,
            frame_ms = self.frame_duration_ms,
            "capture started"
        );
        self.emit(StreamEvent::CaptureStarted {
            sample_rate: self.format.sample_rate,
            channels: self.format.channels,
        });

        let ctx = CaptureContext {
            device: self.device.clone(),
            codec: self.codec.clone(),
            sink: self.sink.clone(),
            running: self.running.clone(),
            stats: self.stats.clone(),
            events: self.events.clone(),
            format: self.format,
            samples_per_frame: self.samples_per_frame,
            gain: self.gain,
            poll: poll_interval(self.frame_duration_ms),
        };
        let spawned = thread::Builder::new()
            .name("line-source".into())
            .spawn(move || capture_loop(ctx));
        match spawned {
            Ok(handle) => {
                *self.loop_handle.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.device.lock().stop_recording();
                self.running.store(false, Ordering::SeqCst);
                Err(StreamError::DeviceUnavailable {
                    name: "capture",
                    source: DeviceError::backend(format!("capture loop spawn failed: {e}")),
                })
            }
        }
    }

    fn stop(&self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        if let Some(handle) = self.loop_handle.lock().take() {
            let _ = handle.join();
        }
        if was_running {
            tracing::debug!("source stop requested");
        }
    }

    fn format(&self) -> StreamFormat {
        self.format
    }

    fn set_sink(&self, sink: Option<Arc<dyn Sink>>) {
        *self.sink.lock() = sink;
    }
}

struct CaptureContext {
    device: Arc<Mutex<Box<dyn CaptureDevice>>>,
    codec: Arc<Mutex<Box<dyn AudioCodec>>>,
    sink: Arc<Mutex<Option<Arc<dyn Sink>>>>,
    running: Arc<AtomicBool>,
    stats: Arc<SourceCounters>,
    events: Option<EventCallback>,
    format: StreamFormat,
    samples_per_frame: usize,
    gain: f32,
    poll: Duration,
}

impl CaptureContext {
    fn emit(&self, event: StreamEvent) {
        if let Some(callback) = &self.events {
            callback(event);
        }
    }
}

/// Capture loop: read one frame, apply gain, encode, push to the sink.
///
/// A single bad frame never terminates capture; encode failures drop that
/// frame only. The stop flag is observed at the top of every iteration.
#[allow(clippy::float_cmp)]
fn capture_loop(ctx: CaptureContext) {
    let mut dropped_since_log: u64 = 0;

    while ctx.running.load(Ordering::SeqCst) {
        let raw = ctx.device.lock().read_audio(ctx.samples_per_frame);
        let Some(raw) = raw else {
            // The device has no full frame yet; that is pacing, not failure
            thread::sleep(ctx.poll);
            continue;
        };

        let mut samples = bytes_to_f32(&raw);
        if ctx.gain != 1.0 {
            for sample in &mut samples {
                *sample *= ctx.gain;
            }
        }

        let encoded = ctx.codec.lock().encode(&samples);
        let frame = match encoded {
            Ok(frame) => frame,
            Err(e) => {
                ctx.stats.encode_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "encode failed, frame dropped");
                ctx.emit(StreamEvent::CodecFailure {
                    stage: CodecStage::Encode,
                    error: e.to_string(),
                });
                continue;
            }
        };
        ctx.stats.frames_captured.fetch_add(1, Ordering::Relaxed);

        let sink = ctx.sink.lock().clone();
        let delivered = match sink {
            Some(sink) if sink.can_receive(Some(&ctx.format)) => {
                sink.handle_frame(FramePayload::Encoded(frame), Some(&ctx.format));
                true
            }
            _ => false,
        };

        if !delivered {
            let dropped = ctx.stats.frames_dropped.fetch_add(1, Ordering::Relaxed) + 1;
            ctx.emit(StreamEvent::BackpressureDrop {
                dropped_frames: dropped,
            });
            if dropped_since_log == 0 {
                tracing::warn!(total_dropped = dropped, "sink not accepting, dropping frames");
            }
            dropped_since_log = (dropped_since_log + 1) % DROP_LOG_INTERVAL;
        } else {
            dropped_since_log = 0;
        }
    }

    // Release the device on every exit path so the exclusive handle never
    // leaks across call sessions.
    ctx.device.lock().stop_recording();
    ctx.running.store(false, Ordering::SeqCst);
    ctx.emit(StreamEvent::CaptureStopped);
    tracing::info!("capture stopped");
}

fn poll_interval(frame_duration_ms: f32) -> Duration {
    Duration::from_secs_f32((frame_duration_ms / 4.0 / 1000.0).max(0.001))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecInfo, PcmCodec};
    use crate::error::CodecError;
    use crate::frame::EncodedFrame;
    use std::time::Instant;

    fn wait_for(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    /// Sink that records what it is offered and answers a fixed admission.
    struct RecordingSink {
        accepting: AtomicBool,
        received: Mutex<Vec<FramePayload>>,
    }

    impl RecordingSink {
        fn new(accepting: bool) -> Arc<Self> {
            Arc::new(Self {
                accepting: AtomicBool::new(accepting),
                received: Mutex::new(Vec::new()),
            })
        }

        fn received_count(&self) -> usize {
            self.received.lock().len()
        }
    }

    impl Sink for RecordingSink {
        fn can_receive(&self, _from: Option<&StreamFormat>) -> bool {
            self.accepting.load(Ordering::SeqCst)
        }

        fn handle_frame(&self, frame: FramePayload, _from: Option<&StreamFormat>) {
            self.received.lock().push(frame);
        }
    }

    /// Codec that fails every encode, for error-path tests.
    struct FailingCodec {
        info: CodecInfo,
    }

    impl AudioCodec for FailingCodec {
        fn info(&self) -> &CodecInfo {
            &self.info
        }

        fn encode(&mut self, _samples: &[f32]) -> Result<EncodedFrame, CodecError> {
            Err(CodecError::failed("bad state"))
        }

        fn decode(&mut self, _data: &[u8]) -> Result<Vec<f32>, CodecError> {
            Err(CodecError::failed("bad state"))
        }
    }

    fn pcm_source(device: Box<dyn CaptureDevice>) -> LineSource {
        LineSource::new(
            device,
            Box::new(PcmCodec::new().with_preferred_rate(8000)),
            SourceConfig::default(),
        )
    }

    #[test]
    fn test_negotiates_codec_preferred_rate() {
        let source = pcm_source(Box::new(crate::device::MockCaptureDevice::new()));
        assert_eq!(source.format().sample_rate, 8000);
        assert_eq!(source.frame_duration_ms(), 80.0);
        assert_eq!(source.samples_per_frame(), 640);
    }

    #[test]
    fn test_defaults_to_48khz_without_preference() {
        let source = LineSource::new(
            Box::new(crate::device::MockCaptureDevice::new()),
            Box::new(PcmCodec::new()),
            SourceConfig::default(),
        );
        assert_eq!(source.format().sample_rate, 48_000);
        assert_eq!(source.samples_per_frame(), 3840);
    }

    #[test]
    fn test_frame_duration_negotiated_against_codec() {
        let codec = PcmCodec::new().with_info(CodecInfo {
            preferred_sample_rate: Some(8000),
            frame_quanta_ms: Some(2.5),
            frame_max_ms: Some(60.0),
            valid_frame_ms: None,
        });
        let source = LineSource::new(
            Box::new(crate::device::MockCaptureDevice::new()),
            Box::new(codec),
            SourceConfig::default(),
        );
        assert_eq!(source.frame_duration_ms(), 60.0);
        assert_eq!(source.samples_per_frame(), 480);
    }

    #[test]
    fn test_start_is_idempotent() {
        let device = crate::device::MockCaptureDevice::new();
        let handle = device.handle();
        let source = pcm_source(Box::new(device));

        source.start().unwrap();
        source.start().unwrap();
        assert_eq!(handle.start_calls(), 1);
        assert_eq!(handle.opened_format(), (8000, 1, 640));

        source.stop();
        source.stop();
        assert_eq!(handle.stop_calls(), 1);
        assert!(!source.is_running());
    }

    #[test]
    fn test_start_failure_propagates() {
        let device = crate::device::MockCaptureDevice::new();
        device.handle().fail_next_start(DeviceError::PermissionDenied);
        let source = pcm_source(Box::new(device));

        let err = source.start().unwrap_err();
        assert!(matches!(
            err,
            StreamError::DeviceUnavailable { name: "capture", .. }
        ));
        assert!(!source.is_running());
    }

    #[test]
    fn test_frames_flow_to_attached_sink() {
        let device = crate::device::MockCaptureDevice::new();
        let handle = device.handle();
        for _ in 0..3 {
            handle.push_sine(440.0, 8000, 640);
        }

        let source = pcm_source(Box::new(device));
        let sink = RecordingSink::new(true);
        source.set_sink(Some(sink.clone()));

        source.start().unwrap();
        assert!(
            wait_for(|| sink.received_count() == 3, Duration::from_secs(2)),
            "sink did not receive the scripted frames"
        );
        source.stop();

        assert_eq!(source.stats().frames_captured, 3);
        assert_eq!(source.stats().frames_dropped, 0);
        // Encoded PCM frames carry two bytes per sample
        let first = sink.received.lock()[0].clone();
        match first {
            FramePayload::Encoded(frame) => assert_eq!(frame.len(), 1280),
            FramePayload::Decoded(_) => panic!("line source must push encoded frames"),
        }
    }

    #[test]
    fn test_backpressure_drops_frames() {
        let device = crate::device::MockCaptureDevice::new();
        let handle = device.handle();
        for _ in 0..4 {
            handle.push_silence(640);
        }

        let source = pcm_source(Box::new(device));
        let sink = RecordingSink::new(false);
        source.set_sink(Some(sink.clone()));

        source.start().unwrap();
        assert!(
            wait_for(|| source.stats().frames_dropped == 4, Duration::from_secs(2)),
            "backpressure drops were not counted"
        );
        source.stop();

        assert_eq!(sink.received_count(), 0);
        assert_eq!(source.stats().frames_captured, 4);
    }

    #[test]
    fn test_no_sink_drops_frames() {
        let device = crate::device::MockCaptureDevice::new();
        device.handle().push_silence(640);

        let source = pcm_source(Box::new(device));
        source.start().unwrap();
        assert!(
            wait_for(|| source.stats().frames_dropped == 1, Duration::from_secs(2)),
            "frame without a sink was not dropped"
        );
        source.stop();
    }

    #[test]
    fn test_encode_failure_drops_frame_and_continues() {
        let device = crate::device::MockCaptureDevice::new();
        let handle = device.handle();
        handle.push_silence(640);
        handle.push_silence(640);

        let source = LineSource::new(
            Box::new(device),
            Box::new(FailingCodec {
                info: CodecInfo::default(),
            }),
            SourceConfig::default(),
        );
        let sink = RecordingSink::new(true);
        source.set_sink(Some(sink.clone()));

        source.start().unwrap();
        assert!(
            wait_for(|| source.stats().encode_errors == 2, Duration::from_secs(2)),
            "encode errors were not counted"
        );
        assert!(source.is_running(), "encode failure must not stop capture");
        source.stop();
        assert_eq!(sink.received_count(), 0);
    }

    #[test]
    fn test_rebinding_takes_effect_on_next_frame() {
        let device = crate::device::MockCaptureDevice::new();
        let handle = device.handle();
        handle.push_silence(640);

        let source = pcm_source(Box::new(device));
        let first = RecordingSink::new(true);
        let second = RecordingSink::new(true);
        source.set_sink(Some(first.clone()));

        source.start().unwrap();
        assert!(wait_for(|| first.received_count() == 1, Duration::from_secs(2)));

        source.set_sink(Some(second.clone()));
        handle.push_silence(640);
        assert!(
            wait_for(|| second.received_count() == 1, Duration::from_secs(2)),
            "rebound sink did not receive the next frame"
        );
        source.stop();
        assert_eq!(first.received_count(), 1);
    }

    #[test]
    fn test_device_released_on_stop() {
        let device = crate::device::MockCaptureDevice::new();
        let handle = device.handle();
        let source = pcm_source(Box::new(device));

        source.start().unwrap();
        assert!(handle.is_started());
        source.stop();
        assert!(!handle.is_started());
    }

    #[test]
    fn test_gain_applied_to_samples() {
        let device = crate::device::MockCaptureDevice::new();
        let handle = device.handle();
        handle.push_pcm(&[1000i16; 640]);

        let source = LineSource::new(
            Box::new(device),
            Box::new(PcmCodec::new().with_preferred_rate(8000)),
            SourceConfig {
                gain: 2.0,
                ..Default::default()
            },
        );
        let sink = RecordingSink::new(true);
        source.set_sink(Some(sink.clone()));

        source.start().unwrap();
        assert!(wait_for(|| sink.received_count() == 1, Duration::from_secs(2)));
        source.stop();

        let payload = sink.received.lock()[0].clone();
        let FramePayload::Encoded(frame) = payload else {
            panic!("expected encoded frame");
        };
        let sample = i16::from_le_bytes([frame.as_bytes()[0], frame.as_bytes()[1]]);
        // 1000/32768 doubled and re-encoded at 32767 lands within a step of 2000
        assert!((i32::from(sample) - 2000).abs() <= 1, "gain not applied: {sample}");
    }
}
