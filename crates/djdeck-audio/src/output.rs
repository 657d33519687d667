//! Audio output using cpal.

use std::sync::Arc;

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, SampleFormat, Stream, StreamConfig,
};
use djdeck_core::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::mixer::Mixer;

/// Preferred output stream shape.
///
/// The device's own sample rate and channel count win when it reports them;
/// `block_size` is the largest chunk the mixer renders at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub block_size: usize,
    pub channels: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 512,
            channels: 2,
        }
    }
}

impl EngineConfig {
    /// Block size, never zero.
    pub fn effective_block_size(&self) -> usize {
        self.block_size.max(1)
    }
}

/// Render the mixer into an interleaved device buffer, one block at a time.
pub fn render_interleaved<T>(mixer: &mut Mixer, data: &mut [T], channels: usize, block_size: usize)
where
    T: cpal::FromSample<f32>,
{
    let channels = channels.max(1);
    let block_size = block_size.max(1);
    for chunk in data.chunks_mut(block_size * channels) {
        let frames = chunk.len() / channels;
        mixer.produce_block(frames).write_interleaved(chunk, channels, frames);
    }
}

/// A running output stream pulling from a shared [`Mixer`].
pub struct AudioOutput {
    _stream: Stream,
    config: EngineConfig,
    device_name: String,
}

impl AudioOutput {
    /// Open the default output device, prepare the mixer for its format and
    /// start the stream.
    pub fn start(preferred: EngineConfig, mixer: Arc<Mutex<Mixer>>) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("No output device found".to_string()))?;

        Self::with_device(&device, preferred, mixer)
    }

    /// Start a stream on a specific device.
    pub fn with_device(
        device: &Device,
        preferred: EngineConfig,
        mixer: Arc<Mutex<Mixer>>,
    ) -> Result<Self> {
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using audio output device: {device_name}");

        let supported_config = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get output config: {e}")))?;

        debug!("Supported output config: {:?}", supported_config);

        let sample_format = supported_config.sample_format();
        let stream_config: StreamConfig = supported_config.into();

        let config = EngineConfig {
            sample_rate: stream_config.sample_rate.0,
            channels: stream_config.channels,
            block_size: preferred.effective_block_size(),
        };

        mixer
            .lock()
            .prepare(f64::from(config.sample_rate), config.block_size);

        debug!(
            "Output config: {}Hz, {} channels, block {}",
            config.sample_rate, config.channels, config.block_size
        );

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(device, &stream_config, config, mixer)?,
            SampleFormat::I16 => Self::build_stream::<i16>(device, &stream_config, config, mixer)?,
            SampleFormat::U16 => Self::build_stream::<u16>(device, &stream_config, config, mixer)?,
            _ => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {sample_format:?}"
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {e}")))?;

        Ok(Self {
            _stream: stream,
            config,
            device_name,
        })
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &Device,
        stream_config: &StreamConfig,
        config: EngineConfig,
        mixer: Arc<Mutex<Mixer>>,
    ) -> Result<Stream> {
        let channels = usize::from(config.channels);
        let block_size = config.block_size;

        let err_fn = |err| {
            error!("Audio stream error: {err}");
        };

        device
            .build_output_stream(
                stream_config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    render_interleaved(&mut mixer.lock(), data, channels, block_size);
                },
                err_fn,
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {e}")))
    }

    /// The negotiated stream shape.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

/// An output device as reported by the default host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDevice {
    pub name: String,
    /// Whether this is the device [`AudioOutput::start`] would open.
    pub is_default: bool,
}

/// Output devices on the default host, default device first.
pub fn list_output_devices() -> Result<Vec<OutputDevice>> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    let mut devices: Vec<OutputDevice> = host
        .output_devices()
        .map_err(|e| Error::AudioOutput(format!("Failed to list devices: {e}")))?
        .filter_map(|device| device.name().ok())
        .map(|name| OutputDevice {
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
        })
        .collect();
    devices.sort_by_key(|device| !device.is_default);

    debug!("Found {} output devices", devices.len());
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.block_size, 512);
        assert_eq!(config.channels, 2);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"block_size": 256}"#).unwrap_or_default();
        assert_eq!(config.block_size, 256);
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(EngineConfig { block_size: 0, ..config }.effective_block_size(), 1);
    }

    #[test]
    fn test_render_interleaved_in_blocks() {
        let mut mixer = Mixer::new();
        mixer.prepare(48_000.0, 4);

        // Larger than one block, odd length
        let mut data = vec![1.0f32; 2 * 11];
        render_interleaved(&mut mixer, &mut data, 2, 4);
        assert!(data.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_list_output_devices() {
        // Headless machines may have no host backend at all
        if let Ok(devices) = list_output_devices() {
            assert!(devices.iter().filter(|d| d.is_default).count() <= 1);
            if let Some(pos) = devices.iter().position(|d| d.is_default) {
                assert_eq!(pos, 0);
            }
        }
    }
}
