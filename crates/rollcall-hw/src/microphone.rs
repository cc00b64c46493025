//! Single-utterance microphone capture via CPAL.
//!
//! Each [`Microphone::listen`] call opens an input stream, calibrates an
//! energy threshold against ambient noise, waits for one phrase and closes
//! the stream before returning.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig, SupportedStreamConfig};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MicrophoneError {
    #[error("no input device available")]
    NoDevice,
    #[error("audio device error: {0}")]
    Device(String),
    #[error("audio stream error: {0}")]
    Stream(String),
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
    #[error("audio stream closed unexpectedly")]
    StreamClosed,
}

impl From<cpal::DevicesError> for MicrophoneError {
    fn from(err: cpal::DevicesError) -> Self {
        MicrophoneError::Device(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for MicrophoneError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        MicrophoneError::Device(err.to_string())
    }
}

impl From<cpal::BuildStreamError> for MicrophoneError {
    fn from(err: cpal::BuildStreamError) -> Self {
        MicrophoneError::Stream(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for MicrophoneError {
    fn from(err: cpal::PlayStreamError) -> Self {
        MicrophoneError::Stream(err.to_string())
    }
}

/// Timing and sensitivity of one listen call.
#[derive(Debug, Clone)]
pub struct ListenOptions {
    /// Ambient-noise sampling window before listening starts.
    pub calibration: Duration,
    /// Trailing silence that ends a phrase.
    pub pause: Duration,
    /// Longest phrase recorded once speech has started.
    pub phrase_limit: Duration,
    /// Overall bound on calibration plus listening.
    pub timeout: Duration,
    /// Speech must be this many times louder (RMS) than the ambient level.
    pub dynamic_factor: f32,
    /// Floor for the energy threshold in a silent room.
    pub min_energy: f32,
}

impl Default for ListenOptions {
    fn default() -> Self {
        Self {
            calibration: Duration::from_secs(1),
            pause: Duration::from_millis(800),
            phrase_limit: Duration::from_secs(10),
            timeout: Duration::from_secs(20),
            dynamic_factor: 1.5,
            min_energy: 0.01,
        }
    }
}

/// One captured phrase as mono PCM.
#[derive(Debug, Clone, Default)]
pub struct Utterance {
    /// Mono samples normalized to [-1.0, 1.0].
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Utterance {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// The default system input device.
pub struct Microphone {
    device: cpal::Device,
    config: SupportedStreamConfig,
}

impl Microphone {
    pub fn open_default() -> Result<Self, MicrophoneError> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or(MicrophoneError::NoDevice)?;
        let config = device.default_input_config()?;
        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate = config.sample_rate().0,
            channels = config.channels(),
            "microphone opened"
        );
        Ok(Self { device, config })
    }

    /// Names of every input device on the default host.
    pub fn list_input_devices() -> Result<Vec<String>, MicrophoneError> {
        let devices = cpal::default_host().input_devices()?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }

    /// Calibrate against ambient noise, then block until one phrase is heard.
    ///
    /// Returns an empty utterance if nothing louder than the ambient level
    /// arrives before `timeout`.
    pub fn listen(&self, opts: &ListenOptions) -> Result<Utterance, MicrophoneError> {
        let sample_rate = self.config.sample_rate().0;
        let (tx, rx) = mpsc::channel::<Vec<f32>>();
        let stream = self.build_stream(tx)?;
        let deadline = Instant::now() + opts.timeout;

        let mut ambient = Vec::new();
        let calibration_end = Instant::now() + opts.calibration;
        while let Some(chunk) = recv_until(&rx, calibration_end.min(deadline))? {
            ambient.extend(chunk);
        }
        let threshold = energy_threshold(rms(&ambient), opts);
        tracing::debug!(threshold, ambient_samples = ambient.len(), "microphone calibrated");

        let mut phrase = PhraseCollector::new(threshold, sample_rate, opts);
        while let Some(chunk) = recv_until(&rx, deadline)? {
            if phrase.push(&chunk) {
                break;
            }
        }
        drop(stream);

        let samples = phrase.finish();
        tracing::debug!(samples = samples.len(), "utterance captured");
        Ok(Utterance {
            samples,
            sample_rate,
        })
    }

    fn build_stream(&self, tx: mpsc::Sender<Vec<f32>>) -> Result<cpal::Stream, MicrophoneError> {
        let config: StreamConfig = self.config.config();
        let channels = config.channels as usize;
        let on_error = |err: cpal::StreamError| tracing::warn!(error = %err, "microphone stream error");

        let stream = match self.config.sample_format() {
            SampleFormat::F32 => self.device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(downmix(data, channels, |s| s));
                },
                on_error,
                None,
            )?,
            SampleFormat::I16 => self.device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(downmix(data, channels, |s| s as f32 / i16::MAX as f32));
                },
                on_error,
                None,
            )?,
            SampleFormat::U16 => self.device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(downmix(data, channels, |s| (s as f32 - 32768.0) / 32768.0));
                },
                on_error,
                None,
            )?,
            other => return Err(MicrophoneError::UnsupportedFormat(format!("{other:?}"))),
        };

        stream.play()?;
        Ok(stream)
    }
}

/// Receive the next chunk, or `None` once `until` has passed.
fn recv_until(rx: &mpsc::Receiver<Vec<f32>>, until: Instant) -> Result<Option<Vec<f32>>, MicrophoneError> {
    let remaining = until.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        return Ok(None);
    }
    match rx.recv_timeout(remaining) {
        Ok(chunk) => Ok(Some(chunk)),
        Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(MicrophoneError::StreamClosed),
    }
}

/// Average interleaved channels into mono f32.
fn downmix<T: Copy>(data: &[T], channels: usize, to_f32: impl Fn(T) -> f32) -> Vec<f32> {
    let channels = channels.max(1);
    data.chunks(channels)
        .map(|frame| frame.iter().map(|&s| to_f32(s)).sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Root-mean-square energy of a block of samples.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

fn energy_threshold(ambient_rms: f32, opts: &ListenOptions) -> f32 {
    (ambient_rms * opts.dynamic_factor).max(opts.min_energy)
}

/// Collects one phrase: starts at the first loud chunk, ends after a pause
/// or when the phrase limit is reached.
struct PhraseCollector {
    threshold: f32,
    pause_samples: usize,
    limit_samples: usize,
    samples: Vec<f32>,
    silent_run: usize,
    started: bool,
}

impl PhraseCollector {
    fn new(threshold: f32, sample_rate: u32, opts: &ListenOptions) -> Self {
        let to_samples = |d: Duration| (d.as_secs_f64() * sample_rate as f64) as usize;
        Self {
            threshold,
            pause_samples: to_samples(opts.pause),
            limit_samples: to_samples(opts.phrase_limit),
            samples: Vec::new(),
            silent_run: 0,
            started: false,
        }
    }

    /// Feed one chunk; returns true once the phrase is complete.
    fn push(&mut self, chunk: &[f32]) -> bool {
        let loud = rms(chunk) > self.threshold;
        if !self.started {
            if !loud {
                return false;
            }
            self.started = true;
        }

        self.samples.extend_from_slice(chunk);
        self.silent_run = if loud { 0 } else { self.silent_run + chunk.len() };

        self.silent_run >= self.pause_samples || self.samples.len() >= self.limit_samples
    }

    /// The phrase with its trailing silence trimmed.
    fn finish(mut self) -> Vec<f32> {
        let keep = self.samples.len().saturating_sub(self.silent_run);
        self.samples.truncate(keep);
        self.samples
    }
}
