//! Microphone audio source
//!
//! Captures one clip per listen attempt: a bounded wait for speech to start,
//! then recording until trailing silence or the phrase limit. Speech
//! boundaries come from RMS energy, which is crude but needs no model.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use super::{AudioClip, AudioSource};
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Minimum RMS energy to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Trailing silence that ends an utterance
const TRAILING_SILENCE: Duration = Duration::from_millis(600);

/// Buffer polling interval while a listen attempt is active
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Captures audio from the default input device
///
/// The device is opened for the scope of each `listen` call only, so
/// concurrent capture sessions serialize on the internal device lock.
pub struct MicSource {
    config: StreamConfig,
    device_lock: Mutex<()>,
}

impl MicSource {
    /// Create a new microphone source
    ///
    /// # Errors
    ///
    /// Returns error if no suitable input device is available
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "microphone source initialized"
        );

        Ok(Self {
            config,
            device_lock: Mutex::new(()),
        })
    }
}

impl AudioSource for MicSource {
    fn listen(&self, timeout: Duration, phrase_limit: Duration) -> Result<Option<AudioClip>> {
        // Exclusive device access for the scope of this attempt
        let _guard = self
            .device_lock
            .lock()
            .map_err(|_| Error::Audio("microphone lock poisoned".to_string()))?;

        let buffer: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
        let callback_buffer = Arc::clone(&buffer);

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device".to_string()))?;

        let stream = device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = callback_buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let result = record_clip(&buffer, timeout, phrase_limit);

        // Release the device before returning
        drop(stream);

        result
    }
}

/// Poll the capture buffer until a full utterance is collected
fn record_clip(
    buffer: &Arc<Mutex<Vec<f32>>>,
    timeout: Duration,
    phrase_limit: Duration,
) -> Result<Option<AudioClip>> {
    let started = Instant::now();
    let mut clip: Vec<f32> = Vec::new();
    let mut speech_at: Option<Instant> = None;
    let mut silence = Duration::ZERO;

    loop {
        std::thread::sleep(POLL_INTERVAL);

        let chunk: Vec<f32> = {
            let mut buf = buffer
                .lock()
                .map_err(|_| Error::Audio("capture buffer poisoned".to_string()))?;
            std::mem::take(&mut *buf)
        };

        let energy = rms_energy(&chunk);

        match speech_at {
            None => {
                if energy > ENERGY_THRESHOLD {
                    speech_at = Some(Instant::now());
                    clip.extend_from_slice(&chunk);
                    tracing::trace!(energy, "speech started");
                } else if started.elapsed() >= timeout {
                    // No speech within the window; not an error
                    return Ok(None);
                }
            }
            Some(start) => {
                clip.extend_from_slice(&chunk);

                if energy > ENERGY_THRESHOLD {
                    silence = Duration::ZERO;
                } else {
                    silence += POLL_INTERVAL;
                }

                if silence >= TRAILING_SILENCE || start.elapsed() >= phrase_limit {
                    tracing::debug!(samples = clip.len(), "utterance captured");
                    return Ok(Some(AudioClip {
                        samples: clip,
                        sample_rate: SAMPLE_RATE,
                    }));
                }
            }
        }
    }
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Convert f32 samples to WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_of_silence_is_near_zero() {
        let silence = vec![0.0f32; 100];
        assert!(rms_energy(&silence) < 0.001);

        let loud = vec![0.5f32; 100];
        assert!(rms_energy(&loud) > 0.4);
    }

    #[test]
    fn energy_of_empty_slice_is_zero() {
        assert!((rms_energy(&[]) - 0.0).abs() < f32::EPSILON);
    }
}
