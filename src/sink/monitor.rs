//! Audible monitoring of the loopback feed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use tracing::{debug, info, warn};

use crate::device::OutputDevice;
use crate::error::{Error, Result};
use crate::format::AudioFormat;
use crate::sink::LoopbackRingBuffer;

/// Plays the loopback ring buffer on an output device
///
/// The cpal stream lives on its own thread for as long as the sink exists.
/// Each device frame takes one frame from the loopback; device channels beyond
/// the loopback's own are filled from its last channel.
pub struct MonitorSink {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    device_name: String,
}

impl MonitorSink {
    /// Open `device` at `format`'s sample rate and start pulling from `loopback`
    ///
    /// Returns once the stream is playing, or with the error that kept it from
    /// being built.
    pub fn start(
        device: &OutputDevice,
        loopback: Arc<LoopbackRingBuffer>,
        format: AudioFormat,
        volume: f32,
    ) -> Result<Self> {
        let stream_config = cpal::StreamConfig {
            channels: device.channels(),
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let sample_format = device.sample_format();
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);

        let cpal_device = device.device().clone();
        let keep_running = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name("soundboard-monitor".into())
            .spawn(move || {
                let stream = match build_stream(
                    &cpal_device,
                    sample_format,
                    &stream_config,
                    loopback,
                    format.channels as usize,
                    volume,
                )
                .and_then(|stream| {
                    stream.play().map_err(|e| Error::Device(e.to_string()))?;
                    Ok(stream)
                }) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while keep_running.load(Ordering::Acquire) {
                    thread::park();
                }
                drop(stream);
                debug!("monitor stream closed");
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!(device = device.name(), %format, volume, "monitor started");
                Ok(Self {
                    running,
                    thread: Some(thread),
                    device_name: device.name().to_owned(),
                })
            }
            Ok(Err(e)) => {
                warn!(device = device.name(), error = %e, "could not start monitor");
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(Error::Device("monitor thread exited before starting".into()))
            }
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl Drop for MonitorSink {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            let _ = thread.join();
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    sample_format: SampleFormat,
    config: &cpal::StreamConfig,
    loopback: Arc<LoopbackRingBuffer>,
    source_channels: usize,
    volume: f32,
) -> Result<cpal::Stream> {
    match sample_format {
        SampleFormat::F32 => build_typed::<f32>(device, config, loopback, source_channels, volume),
        SampleFormat::I16 => build_typed::<i16>(device, config, loopback, source_channels, volume),
        SampleFormat::U16 => build_typed::<u16>(device, config, loopback, source_channels, volume),
        other => Err(Error::Device(format!("unsupported sample format {other:?}"))),
    }
}

fn build_typed<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    loopback: Arc<LoopbackRingBuffer>,
    source_channels: usize,
    volume: f32,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let device_channels = config.channels.max(1) as usize;
    let source_channels = source_channels.max(1);
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _| {
                let frames = data.len() / device_channels;
                scratch.resize(frames * source_channels, 0.0);
                loopback.pull(&mut scratch);

                for (out, input) in data
                    .chunks_mut(device_channels)
                    .zip(scratch.chunks(source_channels))
                {
                    for (ch, sample) in out.iter_mut().enumerate() {
                        let s = input[ch.min(source_channels - 1)] * volume;
                        *sample = T::from_sample(s.clamp(-1.0, 1.0));
                    }
                }
            },
            |err| warn!(error = %err, "monitor stream error"),
            None,
        )
        .map_err(|e| Error::Device(e.to_string()))
}
