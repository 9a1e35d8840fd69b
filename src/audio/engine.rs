use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use thiserror::Error;

use super::sidetone::SampleSource;
use crate::config::AudioSettings;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoDevice,
    #[error("audio output device {0:?} not found")]
    DeviceNotFound(String),
    #[error("failed to enumerate audio devices: {0}")]
    Devices(#[from] cpal::DevicesError),
    #[error("failed to query output config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
    #[error("unsupported sample format {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),
}

/// Owns the output stream that pulls samples from a [`SampleSource`].
///
/// The stream stops when this is dropped.
pub struct AudioEngine {
    sample_rate: u32,
    _stream: cpal::Stream,
}

impl AudioEngine {
    /// Open the configured output device and start pulling from the source
    /// built for its sample rate.
    pub fn start<S, F>(settings: &AudioSettings, make_source: F) -> Result<(Self, Arc<S>), AudioError>
    where
        S: SampleSource + 'static,
        F: FnOnce(u32) -> Arc<S>,
    {
        let device = Self::find_device(&settings.sink)?;
        let supported_config = device.default_output_config()?;
        let sample_rate = supported_config.sample_rate().0;
        let source = make_source(sample_rate);
        let source_for_callback: Arc<dyn SampleSource> = source.clone();

        let stream = match supported_config.sample_format() {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &supported_config.into(),
                source_for_callback,
            )?,
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &supported_config.into(),
                source_for_callback,
            )?,
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &supported_config.into(),
                source_for_callback,
            )?,
            other => return Err(AudioError::UnsupportedFormat(other)),
        };

        stream.play()?;

        log::info!(
            "sidetone output on {:?} at {} Hz",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate
        );

        Ok((
            Self {
                sample_rate,
                _stream: stream,
            },
            source,
        ))
    }

    fn find_device(sink: &str) -> Result<cpal::Device, AudioError> {
        let host = cpal::default_host();
        if sink.is_empty() || sink == "default" {
            return host.default_output_device().ok_or(AudioError::NoDevice);
        }
        host.output_devices()?
            .find(|device| device.name().map(|name| name == sink).unwrap_or(false))
            .ok_or_else(|| AudioError::DeviceNotFound(sink.to_string()))
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        source: Arc<dyn SampleSource>,
    ) -> Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;
        let mut mono_buffer: Vec<f32> = Vec::new();

        device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let num_frames = data.len() / channels;
                // Only grows on the first callbacks or when the backend enlarges its period
                if mono_buffer.len() < num_frames {
                    mono_buffer.resize(num_frames, 0.0);
                }
                let mono = &mut mono_buffer[..num_frames];
                source.fill_buffer(mono);

                // Duplicate mono to all channels
                for (frame, sample) in data.chunks_mut(channels).zip(mono.iter()) {
                    let converted: T = T::from_sample(*sample);
                    for channel_sample in frame.iter_mut() {
                        *channel_sample = converted;
                    }
                }
            },
            |err| log::warn!("audio stream error: {err}"),
            None,
        )
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
