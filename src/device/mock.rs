//! Mock devices for testing without hardware.
//!
//! These implement the device traits against in-memory state, making the
//! full capture/playback pipeline runnable in CI. Each mock hands out a
//! controller handle that shares state with the device after the device
//! itself has been boxed and moved into a source or sink.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::device::{CaptureDevice, PlaybackDevice};
use crate::error::DeviceError;

// ---------------------------------------------------------------- capture

#[derive(Default)]
struct CaptureState {
    started: bool,
    start_calls: u32,
    stop_calls: u32,
    opened_sample_rate: u32,
    opened_channels: u16,
    opened_samples_per_frame: usize,
    pending: VecDeque<Vec<u8>>,
    fail_start: Option<DeviceError>,
    pace: Option<Duration>,
    last_read: Option<Instant>,
}

/// A scripted capture device.
///
/// Tests queue PCM frames through the [`MockCaptureHandle`]; `read_audio`
/// pops them one at a time and returns `None` once the script is exhausted.
///
/// # Example
///
/// ```
/// use voiceline::device::MockCaptureDevice;
///
/// let device = MockCaptureDevice::new();
/// let handle = device.handle();
/// handle.push_sine(440.0, 8000, 640);
/// handle.push_silence(640);
/// ```
pub struct MockCaptureDevice {
    state: Arc<Mutex<CaptureState>>,
}

impl MockCaptureDevice {
    /// Creates a mock capture device with an empty script.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CaptureState::default())),
        }
    }

    /// Returns a controller handle sharing this device's state.
    pub fn handle(&self) -> MockCaptureHandle {
        MockCaptureHandle {
            state: self.state.clone(),
        }
    }
}

impl Default for MockCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for MockCaptureDevice {
    fn start_recording(
        &mut self,
        sample_rate: u32,
        channels: u16,
        samples_per_frame: usize,
    ) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if let Some(err) = state.fail_start.take() {
            return Err(err);
        }
        state.started = true;
        state.start_calls += 1;
        state.opened_sample_rate = sample_rate;
        state.opened_channels = channels;
        state.opened_samples_per_frame = samples_per_frame;
        Ok(())
    }

    fn read_audio(&mut self, _samples_per_frame: usize) -> Option<Vec<u8>> {
        let mut state = self.state.lock();
        if !state.started {
            return None;
        }
        if let Some(pace) = state.pace {
            // Real hardware delivers one frame per frame duration; a paced
            // mock answers "no data yet" until the interval elapses
            if state.last_read.is_some_and(|last| last.elapsed() < pace) {
                return None;
            }
        }
        let frame = state.pending.pop_front();
        if frame.is_some() {
            state.last_read = Some(Instant::now());
        }
        frame
    }

    fn stop_recording(&mut self) {
        let mut state = self.state.lock();
        state.started = false;
        state.stop_calls += 1;
    }
}

/// Controller for a [`MockCaptureDevice`] that has been moved into a source.
#[derive(Clone)]
pub struct MockCaptureHandle {
    state: Arc<Mutex<CaptureState>>,
}

impl MockCaptureHandle {
    /// Queues one frame of silence (`samples` zero samples).
    pub fn push_silence(&self, samples: usize) {
        self.push_pcm(&vec![0i16; samples]);
    }

    /// Queues one frame of a sine wave at `frequency` Hz.
    pub fn push_sine(&self, frequency: f64, sample_rate: u32, samples: usize) {
        let pcm: Vec<i16> = (0..samples)
            .map(|i| {
                let t = i as f64 / f64::from(sample_rate);
                let value = (2.0 * std::f64::consts::PI * frequency * t).sin();
                (value * 32767.0) as i16
            })
            .collect();
        self.push_pcm(&pcm);
    }

    /// Queues one frame of deterministic noise at the given amplitude (0-1).
    pub fn push_noise(&self, samples: usize, amplitude: f64) {
        // Simple LCG so "random" noise is reproducible across runs
        let mut seed: u32 = 12345;
        let amplitude = (amplitude * 32767.0) as i16;
        let pcm: Vec<i16> = (0..samples)
            .map(|_| {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
                let random = ((seed >> 16) as i32 - 32768) as i16;
                (i32::from(random) * i32::from(amplitude) / 32767) as i16
            })
            .collect();
        self.push_pcm(&pcm);
    }

    /// Queues one frame of raw i16 samples.
    pub fn push_pcm(&self, samples: &[i16]) {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        self.state.lock().pending.push_back(bytes);
    }

    /// Makes the next `start_recording` call fail with the given error.
    pub fn fail_next_start(&self, err: DeviceError) {
        self.state.lock().fail_start = Some(err);
    }

    /// Paces reads to one frame per `interval`, like real capture hardware.
    ///
    /// Without pacing, queued frames are delivered as fast as the capture
    /// loop can poll.
    pub fn set_pacing(&self, interval: Duration) {
        self.state.lock().pace = Some(interval);
    }

    /// Returns `true` while the device is open.
    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    /// Number of `start_recording` calls so far.
    pub fn start_calls(&self) -> u32 {
        self.state.lock().start_calls
    }

    /// Number of `stop_recording` calls so far.
    pub fn stop_calls(&self) -> u32 {
        self.state.lock().stop_calls
    }

    /// Format the device was most recently opened at.
    pub fn opened_format(&self) -> (u32, u16, usize) {
        let state = self.state.lock();
        (
            state.opened_sample_rate,
            state.opened_channels,
            state.opened_samples_per_frame,
        )
    }

    /// Number of queued frames not yet read.
    pub fn pending_frames(&self) -> usize {
        self.state.lock().pending.len()
    }
}

// --------------------------------------------------------------- playback

#[derive(Default)]
struct PlaybackState {
    started: bool,
    start_calls: u32,
    stop_calls: u32,
    opened_sample_rate: u32,
    opened_channels: u16,
    opened_low_latency: bool,
    writes: Vec<Vec<u8>>,
    fail_start: Option<DeviceError>,
}

/// A recording playback device.
///
/// Every call and every written byte is captured for test assertions.
pub struct MockPlaybackDevice {
    state: Arc<Mutex<PlaybackState>>,
}

impl MockPlaybackDevice {
    /// Creates a mock playback device.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PlaybackState::default())),
        }
    }

    /// Returns a controller handle sharing this device's state.
    pub fn handle(&self) -> MockPlaybackHandle {
        MockPlaybackHandle {
            state: self.state.clone(),
        }
    }
}

impl Default for MockPlaybackDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackDevice for MockPlaybackDevice {
    fn start_playback(
        &mut self,
        sample_rate: u32,
        channels: u16,
        low_latency: bool,
    ) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if let Some(err) = state.fail_start.take() {
            return Err(err);
        }
        state.started = true;
        state.start_calls += 1;
        state.opened_sample_rate = sample_rate;
        state.opened_channels = channels;
        state.opened_low_latency = low_latency;
        Ok(())
    }

    fn write_audio(&mut self, bytes: &[u8]) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if !state.started {
            return Err(DeviceError::custom("write on closed device"));
        }
        state.writes.push(bytes.to_vec());
        Ok(())
    }

    fn stop_playback(&mut self) {
        let mut state = self.state.lock();
        state.started = false;
        state.stop_calls += 1;
    }
}

/// Controller for a [`MockPlaybackDevice`] that has been moved into a sink.
#[derive(Clone)]
pub struct MockPlaybackHandle {
    state: Arc<Mutex<PlaybackState>>,
}

impl MockPlaybackHandle {
    /// Makes the next `start_playback` call fail with the given error.
    pub fn fail_next_start(&self, err: DeviceError) {
        self.state.lock().fail_start = Some(err);
    }

    /// Returns `true` while the device is open.
    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    /// Number of `start_playback` calls so far.
    pub fn start_calls(&self) -> u32 {
        self.state.lock().start_calls
    }

    /// Number of `stop_playback` calls so far.
    pub fn stop_calls(&self) -> u32 {
        self.state.lock().stop_calls
    }

    /// Format the device was most recently opened at.
    pub fn opened_format(&self) -> (u32, u16, bool) {
        let state = self.state.lock();
        (
            state.opened_sample_rate,
            state.opened_channels,
            state.opened_low_latency,
        )
    }

    /// Number of frames written so far.
    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    /// Copies of all frames written so far.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }
}
