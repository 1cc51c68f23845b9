//! Sample format conversion.

/// Converts an f32 sample to i16.
///
/// Input is clamped to [-1.0, 1.0], then scaled by 32767 and rounded to the
/// nearest integer. Values outside the range are clamped, never wrapped.
///
/// Uses × 32767 (not 32768) so 1.0 maps to 32767 without overflowing; the
/// negative extreme loses one LSB (-1.0 maps to -32767 rather than -32768).
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// Converts an i16 sample to f32.
///
/// Divides by 32768, so output lies in [-1.0, ~1.0). The asymmetry against
/// [`f32_to_i16`] keeps a decode/encode round trip within one quantization
/// step on the integer scale.
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

/// Converts little-endian 16-bit PCM bytes to normalized f32 samples.
///
/// A trailing odd byte is ignored.
pub fn bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16_to_f32(i16::from_le_bytes([pair[0], pair[1]])))
        .collect()
}

/// Converts normalized f32 samples to little-endian 16-bit PCM bytes.
///
/// Each sample is clamped to [-1.0, 1.0] before scaling.
pub fn f32_to_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        bytes.extend_from_slice(&f32_to_i16(sample).to_le_bytes());
    }
    bytes
}
