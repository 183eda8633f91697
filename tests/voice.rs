//! Voice component tests
//!
//! Tests audio clip handling and WAV encoding without audio hardware.

use std::io::Cursor;
use std::time::Duration;

use vesper::voice::{samples_to_wav, AudioClip, SAMPLE_RATE};

mod common;

/// Generate sine wave audio samples
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

#[test]
fn test_wav_encoding_produces_valid_header() {
    let samples = generate_sine_samples(440.0, 0.5, 0.5);
    let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");

    let reader = hound::WavReader::new(Cursor::new(&wav)).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, SAMPLE_RATE);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len(), u32::try_from(samples.len()).unwrap());
}

#[test]
fn test_wav_encoding_clamps_out_of_range_samples() {
    let samples = vec![2.0_f32, -2.0, 0.0];
    let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    let mut reader = hound::WavReader::new(Cursor::new(&wav)).unwrap();
    let decoded: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();

    assert_eq!(decoded[0], 32767);
    assert_eq!(decoded[1], -32768);
    assert_eq!(decoded[2], 0);
}

#[test]
fn test_empty_wav_is_still_well_formed() {
    let wav = samples_to_wav(&[], SAMPLE_RATE).unwrap();
    let reader = hound::WavReader::new(Cursor::new(&wav)).unwrap();
    assert_eq!(reader.len(), 0);
}

#[test]
fn test_clip_duration_reflects_sample_count() {
    let clip = AudioClip {
        samples: generate_sine_samples(440.0, 1.0, 0.3),
        sample_rate: SAMPLE_RATE,
    };

    let duration = clip.duration();
    assert!(duration >= Duration::from_millis(990));
    assert!(duration <= Duration::from_millis(1010));
    assert!(!clip.is_empty());
}

#[test]
fn test_empty_clip() {
    let clip = AudioClip {
        samples: Vec::new(),
        sample_rate: SAMPLE_RATE,
    };

    assert!(clip.is_empty());
    assert_eq!(clip.duration(), Duration::ZERO);
}

#[test]
fn test_clip_roundtrips_through_wav() {
    let clip = AudioClip {
        samples: vec![0.0, 0.25, -0.25, 0.5],
        sample_rate: SAMPLE_RATE,
    };

    let wav = clip.to_wav().unwrap();
    let mut reader = hound::WavReader::new(Cursor::new(&wav)).unwrap();
    let decoded: Vec<f32> = reader
        .samples::<i16>()
        .map(|s| f32::from(s.unwrap()) / 32767.0)
        .collect();

    assert_eq!(decoded.len(), clip.samples.len());
    for (original, restored) in clip.samples.iter().zip(&decoded) {
        assert!((original - restored).abs() < 0.001);
    }
}
