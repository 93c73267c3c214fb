// ---------------- Native audio (cpal) ----------------

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};

use universe_core::audio::{render_shared, SharedRenderer};
use universe_core::{AudioDevice, DisposalError, InitializationError};

/// Default output device of the default host, driven by a cpal stream.
pub struct CpalDevice {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
    stream: Option<cpal::Stream>,
}

impl CpalDevice {
    pub fn open_default() -> Result<Self, InitializationError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| InitializationError::DeviceUnavailable("no default output device".into()))?;
        let config = device
            .default_output_config()
            .map_err(|e| InitializationError::DeviceUnavailable(e.to_string()))?;
        Ok(Self {
            device,
            config,
            stream: None,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown".into())
    }
}

impl AudioDevice for CpalDevice {
    fn start(&mut self, renderer: SharedRenderer) -> Result<(), InitializationError> {
        let channels = self.config.channels() as usize;
        let config: cpal::StreamConfig = self.config.clone().into();
        let stream = match self.config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&self.device, &config, channels, renderer),
            cpal::SampleFormat::I16 => build_stream::<i16>(&self.device, &config, channels, renderer),
            cpal::SampleFormat::U16 => build_stream::<u16>(&self.device, &config, channels, renderer),
            other => {
                return Err(InitializationError::Stream(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }
        .map_err(|e| InitializationError::Stream(e.to_string()))?;
        stream
            .play()
            .map_err(|e| InitializationError::Stream(e.to_string()))?;
        log::info!(
            "[audio] output stream on `{}`: {} Hz, {} ch, {:?}",
            self.name(),
            self.sample_rate(),
            channels,
            self.config.sample_format()
        );
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DisposalError> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        let paused = stream.pause();
        // Dropping the stream joins the callback thread
        drop(stream);
        paused.map_err(|e| DisposalError::Device(e.to_string()))
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    renderer: SharedRenderer,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = channels.max(1);
    device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            let frames = data.len() / channels;
            render_shared(&renderer, frames, |i, s| {
                let v = T::from_sample(s);
                for out in &mut data[i * channels..(i + 1) * channels] {
                    *out = v;
                }
            });
        },
        |err| log::error!("[audio] stream error: {err}"),
        None,
    )
}
