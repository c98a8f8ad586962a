//! Audio output using cpal
//!
//! Opens the output device at the player's fixed format and drives the
//! [`Renderer`] from the device's real-time callback.
//!
//! The renderer always produces interleaved s16. Devices that do not offer
//! i16 at the requested channel count and rate get f32 or u16 with a
//! per-buffer conversion.

use crate::audio::types::OutputFormat;
use crate::error::{Error, Result};
use crate::playback::Renderer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// An open output stream.
///
/// Created paused. Dropping it closes the device; after the drop returns the
/// callback no longer runs.
pub trait AudioSink {
    fn resume(&self) -> Result<()>;
    fn pause(&self) -> Result<()>;
}

/// Opens output streams for the player.
pub trait OutputBackend: Send {
    /// Open a paused stream that pulls from `renderer`.
    ///
    /// # Errors
    /// `Error::Device` if no device supports `format` or the stream cannot
    /// be built.
    fn open(
        &self,
        format: OutputFormat,
        buffer_frames: u32,
        renderer: Renderer,
    ) -> Result<Box<dyn AudioSink>>;
}

/// Output backend for the platform's default cpal host.
#[derive(Debug, Clone, Default)]
pub struct CpalBackend {
    /// Requested device name (None = default device)
    device_name: Option<String>,
}

impl CpalBackend {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }

    /// List available audio output devices.
    ///
    /// # Returns
    /// Vector of device names
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::Device(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Requested device, falling back to the default device when it is
    /// missing.
    fn select_device(&self) -> Result<Device> {
        let host = cpal::default_host();

        if let Some(name) = self.device_name.as_ref() {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::Device(format!("Failed to enumerate devices: {}", e)))?;

            if let Some(device) = devices.find(|d| d.name().ok().as_ref() == Some(name)) {
                info!("Found requested audio device: {}", name);
                return Ok(device);
            }
            warn!("Requested device '{}' not found, falling back to default device", name);
        }

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Device("No default output device found".to_string()))?;
        info!(
            "Using audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );
        Ok(device)
    }

    /// Best sample format the device offers at `format`.
    ///
    /// i16 first since it needs no conversion, then f32, then u16.
    fn pick_sample_format(device: &Device, format: OutputFormat) -> Result<SampleFormat> {
        let supported: Vec<SampleFormat> = device
            .supported_output_configs()
            .map_err(|e| Error::Device(format!("Failed to get device configs: {}", e)))?
            .filter(|config| {
                config.channels() == format.channels
                    && config.min_sample_rate().0 <= format.sample_rate
                    && config.max_sample_rate().0 >= format.sample_rate
            })
            .map(|config| config.sample_format())
            .collect();

        [SampleFormat::I16, SampleFormat::F32, SampleFormat::U16]
            .into_iter()
            .find(|preferred| supported.contains(preferred))
            .ok_or_else(|| {
                Error::Device(format!(
                    "No supported output configuration for {} channels at {}Hz",
                    format.channels, format.sample_rate
                ))
            })
    }
}

impl OutputBackend for CpalBackend {
    fn open(
        &self,
        format: OutputFormat,
        buffer_frames: u32,
        renderer: Renderer,
    ) -> Result<Box<dyn AudioSink>> {
        let device = self.select_device()?;
        let sample_format = Self::pick_sample_format(&device, format)?;
        let errors = Arc::new(AtomicU32::new(0));

        let mut config = StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: BufferSize::Fixed(buffer_frames),
        };
        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}, buffer_size={:?}",
            config.sample_rate.0, config.channels, sample_format, config.buffer_size
        );

        let stream = match build_stream(&device, &config, sample_format, renderer.clone(), &errors) {
            Ok(stream) => stream,
            Err(e) => {
                // Some hosts reject fixed buffer sizes outright
                warn!(
                    "Fixed buffer of {} frames rejected ({}), using device default",
                    buffer_frames, e
                );
                config.buffer_size = BufferSize::Default;
                build_stream(&device, &config, sample_format, renderer, &errors)?
            }
        };

        // Silent until play()
        stream
            .pause()
            .map_err(|e| Error::Device(format!("Failed to pause new stream: {}", e)))?;

        info!(
            "Audio output opened: {}Hz, {} channels, {:?}",
            format.sample_rate, format.channels, sample_format
        );

        Ok(Box::new(CpalSink {
            stream,
            sample_format,
            errors,
        }))
    }
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    renderer: Renderer,
    errors: &Arc<AtomicU32>,
) -> Result<Stream> {
    match sample_format {
        SampleFormat::I16 => build_stream_i16(device, config, renderer, errors),
        SampleFormat::F32 => {
            build_converting_stream(device, config, renderer, errors, i16_to_f32)
        }
        SampleFormat::U16 => {
            build_converting_stream(device, config, renderer, errors, i16_to_u16)
        }
        sample_format => Err(Error::Device(format!(
            "Unsupported sample format: {:?}",
            sample_format
        ))),
    }
}

fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Offset binary: i16::MIN maps to 0
fn i16_to_u16(sample: i16) -> u16 {
    (sample as i32 + 32768) as u16
}

fn error_callback(errors: &Arc<AtomicU32>) -> impl FnMut(cpal::StreamError) + Send + 'static {
    let errors = Arc::clone(errors);
    move |err| {
        error!("Audio stream error: {}", err);
        errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Native s16 stream: the renderer writes straight into the device buffer
fn build_stream_i16(
    device: &Device,
    config: &StreamConfig,
    renderer: Renderer,
    errors: &Arc<AtomicU32>,
) -> Result<Stream> {
    device
        .build_output_stream(
            config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| renderer.render(data),
            error_callback(errors),
            None,
        )
        .map_err(|e| Error::Device(format!("Failed to build stream: {}", e)))
}

/// Render into an s16 scratch buffer, then convert each sample
fn build_converting_stream<T, F>(
    device: &Device,
    config: &StreamConfig,
    renderer: Renderer,
    errors: &Arc<AtomicU32>,
    convert: F,
) -> Result<Stream>
where
    T: SizedSample,
    F: Fn(i16) -> T + Send + 'static,
{
    let mut scratch: Vec<i16> = Vec::new();
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // Grows once to the device buffer length, then reused
                scratch.resize(data.len(), 0);
                renderer.render(&mut scratch);
                for (out, &sample) in data.iter_mut().zip(&scratch) {
                    *out = convert(sample);
                }
            },
            error_callback(errors),
            None,
        )
        .map_err(|e| Error::Device(format!("Failed to build stream: {}", e)))
}

/// Stream opened by [`CpalBackend`]
pub struct CpalSink {
    stream: Stream,
    sample_format: SampleFormat,

    /// Errors reported by the device since the stream was built
    errors: Arc<AtomicU32>,
}

impl CpalSink {
    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    pub fn error_count(&self) -> u32 {
        self.errors.load(Ordering::Relaxed)
    }
}

impl AudioSink for CpalSink {
    fn resume(&self) -> Result<()> {
        self.stream
            .play()
            .map_err(|e| Error::Device(format!("Failed to start stream: {}", e)))
    }

    fn pause(&self) -> Result<()> {
        self.stream
            .pause()
            .map_err(|e| Error::Device(format!("Failed to pause stream: {}", e)))
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        info!(
            "Closing audio stream ({} device errors reported)",
            self.error_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Device-dependent tests degrade to a log line when no audio hardware is
    // present (CI containers).

    #[test]
    fn test_list_devices() {
        match CpalBackend::list_devices() {
            Ok(devices) => println!("Found {} devices: {:?}", devices.len(), devices),
            Err(e) => println!("Could not enumerate devices: {}", e),
        }
    }

    #[test]
    fn test_sample_conversions() {
        assert_eq!(i16_to_f32(0), 0.0);
        assert_eq!(i16_to_f32(i16::MIN), -1.0);
        assert!(i16_to_f32(i16::MAX) < 1.0);

        assert_eq!(i16_to_u16(i16::MIN), 0);
        assert_eq!(i16_to_u16(0), 32768);
        assert_eq!(i16_to_u16(i16::MAX), u16::MAX);
    }
}
