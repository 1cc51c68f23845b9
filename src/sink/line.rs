//! Line-device playback sink.
//!
//! `LineSink` buffers incoming frames in a bounded lock-free queue and plays
//! them back on an injected playback device. The digest loop runs on its own
//! OS thread so playback timing never contends with async network tasks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::codec::AudioCodec;
use crate::config::{SinkConfig, StreamFormat};
use crate::device::PlaybackDevice;
use crate::error::{DeviceError, StreamError};
use crate::event::{CodecStage, EventCallback, StopReason, StreamEvent};
use crate::format::f32_to_bytes;
use crate::frame::{EncodedFrame, FramePayload};
use crate::sink::queue::FrameQueue;
use crate::sink::Sink;

#[derive(Default)]
struct SinkStatsInner {
    frames_played: AtomicU64,
    overflow_drops: AtomicU64,
    lag_drops: AtomicU64,
    decode_errors: AtomicU64,
}

/// Snapshot of a sink's counters.
#[derive(Debug, Clone, Default)]
pub struct SinkStats {
    /// Frames decoded, converted, and written to the device.
    pub frames_played: u64,
    /// Oldest-frame drops caused by enqueuing into a full queue.
    pub overflow_drops: u64,
    /// Oldest-frame drops performed by the digest loop's latency guard.
    pub lag_drops: u64,
    /// Frames dropped because decoding failed or no codec was configured.
    pub decode_errors: u64,
}

/// A sink that plays frames on a line device (speaker).
///
/// Frames are held in a queue of at most [`MAX_FRAMES`](Self::MAX_FRAMES)
/// entries with a drop-oldest overflow policy. With auto-start enabled
/// (the default), playback begins as soon as
/// [`AUTOSTART_MIN`](Self::AUTOSTART_MIN) frames have buffered; a queue that
/// stays empty past the underrun timeout stops playback cleanly, with no
/// synthetic silence inserted.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use voiceline::device::MockPlaybackDevice;
/// use voiceline::{LineSink, PcmCodec, SinkConfig};
///
/// let sink = Arc::new(
///     LineSink::new(Box::new(MockPlaybackDevice::new()), SinkConfig::default())
///         .with_codec(Box::new(PcmCodec::new())),
/// );
/// // hand `sink` to a source via `set_sink`; playback auto-starts on the
/// // first buffered frame
/// ```
pub struct LineSink {
    config: SinkConfig,
    queue: Arc<FrameQueue>,
    device: Arc<Mutex<Box<dyn PlaybackDevice>>>,
    codec: Option<Arc<Mutex<Box<dyn AudioCodec>>>>,
    format: Mutex<Option<StreamFormat>>,
    running: Arc<AtomicBool>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<SinkStatsInner>,
    events: Option<EventCallback>,
}

impl LineSink {
    /// Queue capacity in frames.
    pub const MAX_FRAMES: usize = 6;

    /// Backpressure threshold.
    ///
    /// Kept well below capacity so producers see backpressure before the
    /// queue is actually full; the gap absorbs scheduling jitter between the
    /// capture and digest loops.
    pub const BUFFER_MAX_HEIGHT: usize = Self::MAX_FRAMES - 3;

    /// Buffered frames required before auto-start begins playback.
    pub const AUTOSTART_MIN: usize = 1;

    /// Consecutive empty-poll time, measured in frame durations, tolerated
    /// before playback stops on underrun.
    pub const FRAME_TIMEOUT_FRAMES: u32 = 8;

    /// Creates a sink around an injected playback device.
    pub fn new(device: Box<dyn PlaybackDevice>, config: SinkConfig) -> Self {
        let format = config.format;
        Self {
            config,
            queue: Arc::new(FrameQueue::new(Self::MAX_FRAMES)),
            device: Arc::new(Mutex::new(device)),
            codec: None,
            format: Mutex::new(format),
            running: Arc::new(AtomicBool::new(false)),
            loop_handle: Mutex::new(None),
            stats: Arc::new(SinkStatsInner::default()),
            events: None,
        }
    }

    /// Attaches the codec used to decode [`FramePayload::Encoded`] entries.
    ///
    /// Without a codec, encoded frames are dropped with a decode error.
    pub fn with_codec(mut self, codec: Box<dyn AudioCodec>) -> Self {
        self.codec = Some(Arc::new(Mutex::new(codec)));
        self
    }

    /// Registers a callback for runtime events.
    pub fn with_event_callback(mut self, callback: EventCallback) -> Self {
        self.events = Some(callback);
        self
    }

    /// Starts playback.
    ///
    /// Idempotent: calling on a running sink is a no-op. Opens the playback
    /// device at the detected (or configured) format and spawns the digest
    /// loop.
    ///
    /// # Errors
    ///
    /// [`StreamError::DeviceUnavailable`] if the device cannot be acquired;
    /// the sink stays stopped and can be started again later.
    pub fn start(&self) -> Result<(), StreamError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // Reap a loop that stopped itself on underrun so its thread handle
        // is not leaked.
        if let Some(handle) = self.loop_handle.lock().take() {
            let _ = handle.join();
        }

        let format = {
            let mut latched = self.format.lock();
            *latched.get_or_insert_with(StreamFormat::voice)
        };

        let opened = self.device.lock().start_playback(
            format.sample_rate,
            format.channels,
            self.config.low_latency,
        );
        if let Err(source) = opened {
            self.running.store(false, Ordering::SeqCst);
            return Err(StreamError::DeviceUnavailable {
                name: "playback",
                source,
            });
        }

        tracing::info!(
            sample_rate = format.sample_rate,
            channels = format.channels,
            low_latency = self.config.low_latency,
            "playback started"
        );
        self.emit(StreamEvent::PlaybackStarted {
            sample_rate: format.sample_rate,
            channels: format.channels,
        });

        let ctx = DigestContext {
            queue: self.queue.clone(),
            device: self.device.clone(),
            codec: self.codec.clone(),
            running: self.running.clone(),
            stats: self.stats.clone(),
            events: self.events.clone(),
            format,
        };
        let spawned = thread::Builder::new()
            .name("line-sink".into())
            .spawn(move || digest_loop(ctx));
        match spawned {
            Ok(handle) => {
                *self.loop_handle.lock() = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.device.lock().stop_playback();
                self.running.store(false, Ordering::SeqCst);
                Err(StreamError::DeviceUnavailable {
                    name: "playback",
                    source: DeviceError::backend(format!("digest loop spawn failed: {e}")),
                })
            }
        }
    }

    /// Stops playback, clears the queue, and releases the device.
    ///
    /// Idempotent and safe to call from any thread. The digest loop exits
    /// within one poll interval.
    pub fn stop(&self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        if let Some(handle) = self.loop_handle.lock().take() {
            let _ = handle.join();
        }
        self.queue.clear();
        if was_running {
            tracing::debug!("sink stop requested");
        }
    }

    /// Returns `true` while the digest loop is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of frames currently buffered.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Returns a snapshot of this sink's counters.
    pub fn stats(&self) -> SinkStats {
        SinkStats {
            frames_played: self.stats.frames_played.load(Ordering::Relaxed),
            overflow_drops: self.stats.overflow_drops.load(Ordering::Relaxed),
            lag_drops: self.stats.lag_drops.load(Ordering::Relaxed),
            decode_errors: self.stats.decode_errors.load(Ordering::Relaxed),
        }
    }

    fn emit(&self, event: StreamEvent) {
        if let Some(callback) = &self.events {
            callback(event);
        }
    }
}

impl Drop for LineSink {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Sink for LineSink {
    fn can_receive(&self, _from: Option<&StreamFormat>) -> bool {
        self.queue.len() < Self::BUFFER_MAX_HEIGHT
    }

    fn handle_frame(&self, frame: FramePayload, from: Option<&StreamFormat>) {
        {
            let mut format = self.format.lock();
            if format.is_none() {
                let detected = from.copied().unwrap_or_else(|| {
                    tracing::warn!("no source format available, assuming 48kHz mono");
                    StreamFormat::voice()
                });
                *format = Some(detected);
            }
        }

        if self.queue.push(frame).is_some() {
            self.stats.overflow_drops.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("queue full, displaced oldest frame");
            self.emit(StreamEvent::QueueOverflow);
        }

        if self.config.auto_start
            && !self.running.load(Ordering::SeqCst)
            && self.queue.len() >= Self::AUTOSTART_MIN
        {
            if let Err(e) = self.start() {
                tracing::error!(error = %e, "auto-start failed");
                self.emit(StreamEvent::PlaybackStartFailed {
                    error: e.to_string(),
                });
            }
        }
    }
}

struct DigestContext {
    queue: Arc<FrameQueue>,
    device: Arc<Mutex<Box<dyn PlaybackDevice>>>,
    codec: Option<Arc<Mutex<Box<dyn AudioCodec>>>>,
    running: Arc<AtomicBool>,
    stats: Arc<SinkStatsInner>,
    events: Option<EventCallback>,
    format: StreamFormat,
}

impl DigestContext {
    fn emit(&self, event: StreamEvent) {
        if let Some(callback) = &self.events {
            callback(event);
        }
    }
}

/// Playback loop: pull from the queue, decode if needed, convert, write.
///
/// Communicates with the producer only through the lock-free queue; the stop
/// flag is observed at the top of every iteration, so the loop exits within
/// one frame duration plus one poll interval.
fn digest_loop(ctx: DigestContext) {
    let mut frame_duration = Duration::from_millis(20);
    let mut underrun_since: Option<Instant> = None;
    let mut reason = StopReason::Requested;

    while ctx.running.load(Ordering::SeqCst) {
        match ctx.queue.pop() {
            Some(payload) => {
                underrun_since = None;

                let bytes = match payload {
                    FramePayload::Decoded(frame) => Some(f32_to_bytes(&frame.samples)),
                    FramePayload::Encoded(encoded) => decode_payload(&ctx, &encoded),
                };
                let Some(bytes) = bytes else { continue };
                if bytes.is_empty() {
                    continue;
                }

                frame_duration = pcm_duration(bytes.len() / 2, ctx.format);

                if let Err(e) = ctx.device.lock().write_audio(&bytes) {
                    tracing::warn!(error = %e, "playback write failed, frame dropped");
                } else {
                    ctx.stats.frames_played.fetch_add(1, Ordering::Relaxed);
                }

                // Latency guard: the write should have left the queue at or
                // below the backpressure threshold. If it did not, shed the
                // oldest entry so delay cannot silently accumulate.
                let depth = ctx.queue.len();
                if depth > LineSink::BUFFER_MAX_HEIGHT && ctx.queue.pop().is_some() {
                    ctx.stats.lag_drops.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(queue_len = depth, "latency guard dropped oldest frame");
                    ctx.emit(StreamEvent::LagDrop { queue_len: depth });
                }
            }
            None => {
                let now = Instant::now();
                match underrun_since {
                    None => underrun_since = Some(now),
                    Some(since)
                        if now.duration_since(since)
                            > frame_duration * LineSink::FRAME_TIMEOUT_FRAMES =>
                    {
                        tracing::info!(
                            frame_ms = frame_duration.as_millis() as u64,
                            "queue stayed empty past the underrun timeout"
                        );
                        reason = StopReason::UnderrunTimeout;
                        break;
                    }
                    Some(_) => {}
                }
                thread::sleep(poll_interval(frame_duration));
            }
        }
    }

    // Release the device on every exit path, including underrun stops, so
    // the exclusive handle never leaks across call sessions.
    ctx.device.lock().stop_playback();
    ctx.running.store(false, Ordering::SeqCst);
    ctx.emit(StreamEvent::PlaybackStopped { reason });
    tracing::info!(?reason, "playback stopped");
}

fn decode_payload(ctx: &DigestContext, encoded: &EncodedFrame) -> Option<Vec<u8>> {
    let Some(codec) = &ctx.codec else {
        ctx.stats.decode_errors.fetch_add(1, Ordering::Relaxed);
        tracing::warn!("encoded frame reached a sink with no codec, frame dropped");
        ctx.emit(StreamEvent::CodecFailure {
            stage: CodecStage::Decode,
            error: "no codec configured".to_string(),
        });
        return None;
    };

    match codec.lock().decode(encoded.as_bytes()) {
        Ok(samples) => Some(f32_to_bytes(&samples)),
        Err(e) => {
            ctx.stats.decode_errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, "decode failed, frame dropped");
            ctx.emit(StreamEvent::CodecFailure {
                stage: CodecStage::Decode,
                error: e.to_string(),
            });
            None
        }
    }
}

fn poll_interval(frame_duration: Duration) -> Duration {
    (frame_duration / 4).max(Duration::from_millis(1))
}

fn pcm_duration(samples: usize, format: StreamFormat) -> Duration {
    if format.sample_rate == 0 || format.channels == 0 {
        return Duration::from_millis(20);
    }
    let frames = samples / format.channels as usize;
    Duration::from_secs_f64(frames as f64 / f64::from(format.sample_rate))
}
