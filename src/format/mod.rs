//! Audio format utilities.
//!
//! This module provides:
//! - Sample format conversion (16-bit little-endian PCM bytes ↔ normalized f32)
//! - Frame duration negotiation against a codec's framing constraints

mod convert;
mod framing;

pub use convert::{bytes_to_f32, f32_to_bytes, f32_to_i16, i16_to_f32};
pub use framing::{adjust_frame_duration, samples_per_frame};
