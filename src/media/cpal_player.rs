use super::player::{AudioPlayer, PlaybackEvent, PlaybackEventSender};
use super::wav::{self, WavInfo};
use crate::error::VocablyError;
use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::time::Duration;
use tracing::{debug, error, info};

/// Plays decoded WAV data on the default output device.
pub struct CpalPlayer {
    events: PlaybackEventSender,
    current: Option<Arc<AtomicBool>>,
}

impl CpalPlayer {
    pub fn new(events: PlaybackEventSender) -> Self {
        Self {
            events,
            current: None,
        }
    }
}

struct Source {
    samples: Vec<f32>,
    info: WavInfo,
    position: AtomicUsize,
    finished: AtomicBool,
    failed: AtomicBool,
}

impl Source {
    /// Fills one output buffer, mapping source frames onto the device rate
    /// and channel layout.
    fn fill(&self, out_rate: u32, out_channels: usize, mut write: impl FnMut(usize, f32) -> bool) {
        let in_channels = self.info.channels.max(1) as usize;
        let total_frames = self.samples.len() / in_channels;
        let start = self.position.load(Ordering::Relaxed);
        let mut frame = start;
        let mut index = 0;
        loop {
            let mut wrote = false;
            let src_frame = (frame as u64 * self.info.sample_rate as u64 / out_rate.max(1) as u64)
                as usize;
            for ch in 0..out_channels {
                let value = if src_frame < total_frames {
                    wrote = true;
                    self.samples[src_frame * in_channels + ch.min(in_channels - 1)]
                } else {
                    0.0
                };
                if !write(index, value) {
                    self.position.store(frame, Ordering::Relaxed);
                    return;
                }
                index += 1;
            }
            if !wrote {
                self.finished.store(true, Ordering::Relaxed);
            }
            frame += 1;
        }
    }
}

fn build_stream(
    source: Arc<Source>,
    stopped: Arc<AtomicBool>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("Failed to get default output device")?;
    info!("Using output device: {}", device.name()?);

    let supported = device.default_output_config()?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let out_rate = config.sample_rate.0;
    let out_channels = config.channels as usize;

    let err_source = source.clone();
    let err_fn = move |err: cpal::StreamError| {
        error!("Error on output stream: {}", err);
        err_source.failed.store(true, Ordering::Relaxed);
    };

    let stream = match sample_format {
        SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if stopped.load(Ordering::Relaxed) {
                    data.fill(0.0);
                    return;
                }
                source.fill(out_rate, out_channels, |i, v| match data.get_mut(i) {
                    Some(slot) => {
                        *slot = v;
                        true
                    }
                    None => false,
                });
            },
            err_fn,
            None,
        )?,
        SampleFormat::I16 => device.build_output_stream(
            &config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                if stopped.load(Ordering::Relaxed) {
                    data.fill(0);
                    return;
                }
                source.fill(out_rate, out_channels, |i, v| match data.get_mut(i) {
                    Some(slot) => {
                        *slot = (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                        true
                    }
                    None => false,
                });
            },
            err_fn,
            None,
        )?,
        other => return Err(anyhow!("Unsupported sample format: {:?}", other)),
    };
    Ok(stream)
}

impl AudioPlayer for CpalPlayer {
    fn play(&mut self, playback_id: u64, audio: Bytes) -> Result<(), VocablyError> {
        self.stop();
        let (samples, info) =
            wav::decode_f32(&audio).map_err(|e| VocablyError::Playback(e.to_string()))?;
        let source = Arc::new(Source {
            samples,
            info,
            position: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
            failed: AtomicBool::new(false),
        });
        let stopped = Arc::new(AtomicBool::new(false));
        self.current = Some(stopped.clone());
        let events = self.events.clone();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), String>>();

        // cpal streams are not Send, so each playback owns a thread
        std::thread::spawn(move || {
            let stream = match build_stream(source.clone(), stopped.clone())
                .and_then(|s| s.play().map(|_| s).map_err(Into::into))
            {
                Ok(stream) => stream,
                Err(e) => {
                    ready_tx.send(Err(e.to_string())).ok();
                    return;
                }
            };
            ready_tx.send(Ok(())).ok();

            loop {
                std::thread::sleep(Duration::from_millis(20));
                if stopped.load(Ordering::Relaxed) {
                    debug!(playback_id, "playback stopped");
                    break;
                }
                if source.failed.load(Ordering::Relaxed) {
                    events
                        .send(PlaybackEvent::failed(playback_id, "output stream error"))
                        .ok();
                    break;
                }
                if source.finished.load(Ordering::Relaxed) {
                    events.send(PlaybackEvent::ended(playback_id)).ok();
                    break;
                }
            }
            drop(stream);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.current = None;
                Err(VocablyError::Playback(e))
            }
            Err(_) => {
                self.current = None;
                Err(VocablyError::Playback("playback thread exited".to_string()))
            }
        }
    }

    fn stop(&mut self) {
        if let Some(stopped) = self.current.take() {
            stopped.store(true, Ordering::Relaxed);
        }
    }
}

impl Drop for CpalPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
