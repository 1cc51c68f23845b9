//! Frame duration negotiation against codec framing constraints.

use crate::codec::CodecInfo;

/// Tolerance for "already an exact multiple" checks, so float division noise
/// never bumps a valid duration up a whole quantum.
const QUANTA_EPSILON: f32 = 1e-4;

/// Computes an admissible frame duration for a codec.
///
/// Applies the codec's constraints in a fixed order:
/// 1. **Quantize**: round `target_ms` up to the next multiple of
///    `frame_quanta_ms` (exact multiples pass through unchanged).
/// 2. **Clamp**: cap at `frame_max_ms`.
/// 3. **Snap**: replace with the nearest entry of `valid_frame_ms`.
///
/// The order matters: clamping can invalidate an otherwise valid quantized
/// value, and a discrete valid set is the final authority.
pub fn adjust_frame_duration(target_ms: f32, info: &CodecInfo) -> f32 {
    let mut ms = target_ms;

    if let Some(quanta) = info.frame_quanta_ms {
        if quanta > 0.0 {
            let steps = ms / quanta;
            let nearest = steps.round();
            ms = if (steps - nearest).abs() < QUANTA_EPSILON {
                nearest * quanta
            } else {
                steps.ceil() * quanta
            };
        }
    }

    if let Some(max) = info.frame_max_ms {
        if ms > max {
            ms = max;
        }
    }

    if let Some(valid) = &info.valid_frame_ms {
        let current = ms;
        if let Some(&snapped) = valid
            .iter()
            .min_by(|a, b| (*a - current).abs().total_cmp(&(*b - current).abs()))
        {
            ms = snapped;
        }
    }

    ms
}

/// Number of samples per channel in one frame of the given duration.
pub fn samples_per_frame(frame_duration_ms: f32, sample_rate: u32) -> usize {
    (frame_duration_ms * sample_rate as f32 / 1000.0).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(
        quanta: Option<f32>,
        max: Option<f32>,
        valid: Option<Vec<f32>>,
    ) -> CodecInfo {
        CodecInfo {
            preferred_sample_rate: None,
            frame_quanta_ms: quanta,
            frame_max_ms: max,
            valid_frame_ms: valid,
        }
    }

    #[test]
    fn test_exact_multiple_unchanged() {
        let info = info(Some(2.5), Some(120.0), None);
        assert_eq!(adjust_frame_duration(80.0, &info), 80.0);
    }

    #[test]
    fn test_rounds_up_to_next_quantum() {
        // 77 is not a multiple of 2.5; the next multiple up is 77.5
        let info = info(Some(2.5), None, None);
        assert_eq!(adjust_frame_duration(77.0, &info), 77.5);
    }

    #[test]
    fn test_clamps_to_max() {
        let info = info(None, Some(120.0), None);
        assert_eq!(adjust_frame_duration(150.0, &info), 120.0);
    }

    #[test]
    fn test_clamp_applies_after_quantize() {
        // 150 quantizes to 150 (multiple of 2.5), then clamps to 120
        let info = info(Some(2.5), Some(120.0), None);
        assert_eq!(adjust_frame_duration(150.0, &info), 120.0);
    }

    #[test]
    fn test_snaps_to_nearest_valid_entry() {
        let info = info(None, None, Some(vec![20.0, 40.0, 60.0]));
        assert_eq!(adjust_frame_duration(33.0, &info), 40.0);
        assert_eq!(adjust_frame_duration(29.0, &info), 20.0);
    }

    #[test]
    fn test_snap_is_final_authority() {
        // Quantize 77 -> 80, clamp to 60, snap to 60
        let info = info(Some(2.5), Some(60.0), Some(vec![20.0, 60.0, 90.0]));
        assert_eq!(adjust_frame_duration(77.0, &info), 60.0);
    }

    #[test]
    fn test_unconstrained_codec_passes_through() {
        let info = CodecInfo::default();
        assert_eq!(adjust_frame_duration(80.0, &info), 80.0);
        assert_eq!(adjust_frame_duration(33.3, &info), 33.3);
    }

    #[test]
    fn test_empty_valid_set_ignored() {
        let info = info(None, None, Some(vec![]));
        assert_eq!(adjust_frame_duration(80.0, &info), 80.0);
    }

    #[test]
    fn test_samples_per_frame() {
        assert_eq!(samples_per_frame(80.0, 8000), 640);
        assert_eq!(samples_per_frame(20.0, 48_000), 960);
        assert_eq!(samples_per_frame(2.5, 48_000), 120);
    }
}
