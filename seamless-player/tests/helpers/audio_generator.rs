//! Audio Test File Generation Utilities
//!
//! Writes deterministic 16-bit WAV files with hound so integration tests can
//! decode real files through symphonia:
//! - Sine tones at any channel count / sample rate
//! - Constant per-channel levels (for channel mapping checks)
//! - Tones followed by digital silence (for gapless trim checks)

use hound::{WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::Path;

/// Shape of a generated file
#[derive(Debug, Clone, Copy)]
pub struct WavShape {
    pub channels: u16,
    pub sample_rate: u32,
}

impl WavShape {
    pub fn stereo(sample_rate: u32) -> Self {
        Self {
            channels: 2,
            sample_rate,
        }
    }

    pub fn mono(sample_rate: u32) -> Self {
        Self {
            channels: 1,
            sample_rate,
        }
    }

    /// Frames in `duration_ms` at this rate
    pub fn frames(&self, duration_ms: u64) -> u64 {
        self.sample_rate as u64 * duration_ms / 1000
    }

    fn spec(&self) -> WavSpec {
        WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }
}

/// Write `frames` frames, asking `frame` for each frame's per-channel values
fn write_frames<P, F>(path: P, shape: WavShape, frames: u64, mut frame: F) -> Result<(), hound::Error>
where
    P: AsRef<Path>,
    F: FnMut(u64, u16) -> i16,
{
    let mut writer = WavWriter::create(path, shape.spec())?;
    for index in 0..frames {
        for channel in 0..shape.channels {
            writer.write_sample(frame(index, channel))?;
        }
    }
    writer.finalize()
}

/// Sine tone, identical on every channel.
///
/// # Arguments
/// * `duration_ms` - Duration in milliseconds
/// * `frequency_hz` - Tone frequency (e.g. 440.0)
/// * `amplitude` - 0.0-1.0 (0.5 avoids clipping after mixing)
pub fn generate_sine_wav<P: AsRef<Path>>(
    path: P,
    shape: WavShape,
    duration_ms: u64,
    frequency_hz: f32,
    amplitude: f32,
) -> Result<(), hound::Error> {
    let peak = amplitude * i16::MAX as f32;
    write_frames(path, shape, shape.frames(duration_ms), |index, _| {
        let t = index as f32 / shape.sample_rate as f32;
        ((2.0 * PI * frequency_hz * t).sin() * peak) as i16
    })
}

/// Sine tone followed by `silence_ms` of zero samples
pub fn generate_tone_with_silent_tail<P: AsRef<Path>>(
    path: P,
    shape: WavShape,
    tone_ms: u64,
    silence_ms: u64,
) -> Result<(), hound::Error> {
    let tone_frames = shape.frames(tone_ms);
    let peak = 0.5 * i16::MAX as f32;
    write_frames(path, shape, tone_frames + shape.frames(silence_ms), |index, _| {
        if index >= tone_frames {
            return 0;
        }
        // Offset the phase so no tone sample is exactly zero at the start
        let t = index as f32 / shape.sample_rate as f32;
        ((2.0 * PI * 440.0 * t + PI / 2.0).sin() * peak) as i16
    })
}

/// Every frame carries `levels[channel]`
pub fn generate_constant_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    duration_ms: u64,
    levels: &[i16],
) -> Result<(), hound::Error> {
    let shape = WavShape {
        channels: levels.len() as u16,
        sample_rate,
    };
    write_frames(path, shape, shape.frames(duration_ms), |_, channel| {
        levels[channel as usize]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_sine_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sine.wav");
        generate_sine_wav(&path, WavShape::stereo(44100), 100, 440.0, 0.5).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.duration(), 4410);
    }

    #[test]
    fn test_silent_tail_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail.wav");
        generate_tone_with_silent_tail(&path, WavShape::mono(8000), 100, 50).unwrap();

        let samples: Vec<i16> = hound::WavReader::open(&path)
            .unwrap()
            .samples::<i16>()
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(samples.len(), 1200);
        assert_ne!(samples[0], 0);
        assert!(samples[800..].iter().all(|&s| s == 0));
    }
}
