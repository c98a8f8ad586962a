//! Sample mixing for the render callback
//!
//! Decoded tracks are added onto the output buffer rather than copied, with
//! each sum clamped to the s16 range.

/// Add little-endian s16 bytes from `src` onto `out`, saturating.
///
/// # Returns
/// Number of samples mixed: `min(out.len(), src.len() / 2)`. A trailing odd
/// byte in `src` is ignored.
pub fn mix_into(out: &mut [i16], src: &[u8]) -> usize {
    let mut mixed = 0;
    for (dst, bytes) in out.iter_mut().zip(src.chunks_exact(2)) {
        *dst = dst.saturating_add(i16::from_le_bytes([bytes[0], bytes[1]]));
        mixed += 1;
    }
    mixed
}

/// Rewind `pos` over whole frames of digital silence.
///
/// Walks back from `pos` one frame (`channels` samples) at a time while every
/// sample of the frame is zero, removing at most `max_samples` samples.
///
/// # Returns
/// The new write position; never greater than `pos`.
pub fn trim_trailing_silence(out: &[i16], pos: usize, channels: usize, max_samples: usize) -> usize {
    if channels == 0 {
        return pos;
    }

    let mut pos = pos.min(out.len());
    let mut trimmed = 0;
    while pos >= channels && trimmed + channels <= max_samples {
        if out[pos - channels..pos].iter().any(|&s| s != 0) {
            break;
        }
        pos -= channels;
        trimmed += channels;
    }
    pos
}
