//! The audio decode/encode/filter-graph external-collaborator contract
//! (§4.12): `decode`, `resample`, `apply_filter_graph`, `encode_wav`.
//!
//! Generalizes the teacher's `AudioResampler` (a concrete dasp-backed
//! converter tied to 16kHz Whisper input) into an injectable trait per
//! Design Notes §9, since this core must accept arbitrary source sample
//! rates and channel layouts, not just one fixed target.

use super::types::{AudioBuffer, ChannelLayout, EncodeOptions, FilterGraphSpec};
use crate::error::PipelineError;
use std::path::Path;

pub trait AudioCodec: Send + Sync {
    fn decode(&self, path: &Path) -> Result<AudioBuffer, PipelineError>;
    fn resample(&self, buffer: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer, PipelineError>;
    fn apply_filter_graph(&self, buffer: &AudioBuffer, spec: &FilterGraphSpec) -> Result<AudioBuffer, PipelineError>;
    fn encode_wav(&self, path: &Path, buffer: &AudioBuffer, options: &EncodeOptions) -> Result<(), PipelineError>;
}

/// WAV-only codec backed by `hound`. `apply_filter_graph` is a pass-through
/// here: real filter chains (denoise, de-ess, loudness normalization) are an
/// external tool's job (e.g. an ffmpeg adapter reading `FFMPEG_EXE`); this
/// implementation only satisfies the trait boundary for WAV-to-WAV pipelines
/// that don't need filtering.
pub struct HoundAudioCodec;

impl AudioCodec for HoundAudioCodec {
    fn decode(&self, path: &Path) -> Result<AudioBuffer, PipelineError> {
        let reader = hound::WavReader::open(path).map_err(|e| match e {
            hound::Error::IoError(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                PipelineError::InputMissing { path: path.to_path_buf() }
            }
            other => PipelineError::InputInvalid { source_file: path.display().to_string(), location: String::new(), message: other.to_string() },
        })?;

        let spec = reader.spec();
        let samples: Result<Vec<f32>, _> = match spec.sample_format {
            hound::SampleFormat::Float => reader.into_samples::<f32>().collect(),
            hound::SampleFormat::Int => {
                let max_amplitude = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader.into_samples::<i32>().map(|s| s.map(|v| v as f32 / max_amplitude)).collect()
            }
        };
        let samples = samples.map_err(|e| PipelineError::InputInvalid {
            source_file: path.display().to_string(),
            location: String::new(),
            message: e.to_string(),
        })?;

        Ok(AudioBuffer { samples, sample_rate: spec.sample_rate, channel_layout: ChannelLayout::from_channel_count(spec.channels as u8) })
    }

    /// Linear-interpolation resampling, generalized from the teacher's
    /// `AudioResampler` window-based conversion to an arbitrary source/target
    /// ratio rather than a fixed 16kHz target.
    fn resample(&self, buffer: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer, PipelineError> {
        if buffer.sample_rate == 0 || target_rate == 0 {
            return Err(PipelineError::InputInvalid {
                source_file: "audio buffer".to_string(),
                location: String::new(),
                message: "sample rates must be greater than zero".to_string(),
            });
        }
        if buffer.sample_rate == target_rate {
            return Ok(buffer.clone());
        }

        let channels = buffer.channel_layout.channel_count().max(1) as usize;
        let frame_count = buffer.frame_count();
        let ratio = target_rate as f64 / buffer.sample_rate as f64;
        let out_frames = ((frame_count as f64) * ratio).round() as usize;

        let mut out_samples = Vec::with_capacity(out_frames * channels);
        for out_frame in 0..out_frames {
            let src_pos = out_frame as f64 / ratio;
            let src_frame_lo = src_pos.floor() as usize;
            let frac = src_pos - src_frame_lo as f64;
            let src_frame_hi = (src_frame_lo + 1).min(frame_count.saturating_sub(1));

            for ch in 0..channels {
                let lo = buffer.samples.get(src_frame_lo * channels + ch).copied().unwrap_or(0.0);
                let hi = buffer.samples.get(src_frame_hi * channels + ch).copied().unwrap_or(lo);
                out_samples.push(lo + (hi - lo) * frac as f32);
            }
        }

        Ok(AudioBuffer { samples: out_samples, sample_rate: target_rate, channel_layout: buffer.channel_layout })
    }

    fn apply_filter_graph(&self, buffer: &AudioBuffer, _spec: &FilterGraphSpec) -> Result<AudioBuffer, PipelineError> {
        Ok(buffer.clone())
    }

    fn encode_wav(&self, path: &Path, buffer: &AudioBuffer, options: &EncodeOptions) -> Result<(), PipelineError> {
        let target = if buffer.sample_rate != options.sample_rate { self.resample(buffer, options.sample_rate)? } else { buffer.clone() };

        let spec = hound::WavSpec {
            channels: target.channel_layout.channel_count() as u16,
            sample_rate: options.sample_rate,
            bits_per_sample: options.bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(PipelineError::IOError)?;
        }
        let mut writer = hound::WavWriter::create(path, spec).map_err(|e| PipelineError::InputInvalid {
            source_file: path.display().to_string(),
            location: String::new(),
            message: e.to_string(),
        })?;

        let max_amplitude = (1i64 << (options.bits_per_sample - 1)) as f32 - 1.0;
        for sample in &target.samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer
                .write_sample((clamped * max_amplitude) as i32)
                .map_err(|e| PipelineError::InputInvalid { source_file: path.display().to_string(), location: String::new(), message: e.to_string() })?;
        }
        writer.finalize().map_err(|e| PipelineError::InputInvalid { source_file: path.display().to_string(), location: String::new(), message: e.to_string() })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_tone_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize) {
        let spec = hound::WavSpec { channels, sample_rate, bits_per_sample: 16, sample_format: hound::SampleFormat::Int };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            for _ in 0..channels {
                writer.write_sample(((i % 100) as i32 - 50) * 100).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_pcm_wav_into_float_buffer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.wav");
        write_tone_wav(&path, 16_000, 1, 1600);

        let codec = HoundAudioCodec;
        let buf = codec.decode(&path).unwrap();
        assert_eq!(buf.sample_rate, 16_000);
        assert_eq!(buf.channel_layout, ChannelLayout::Mono);
        assert_eq!(buf.samples.len(), 1600);
    }

    #[test]
    fn resample_changes_frame_count_by_ratio() {
        let buffer = AudioBuffer { samples: (0..1000).map(|i| (i as f32 / 1000.0).sin()).collect(), sample_rate: 16_000, channel_layout: ChannelLayout::Mono };
        let codec = HoundAudioCodec;
        let resampled = codec.resample(&buffer, 8_000).unwrap();
        assert_eq!(resampled.sample_rate, 8_000);
        assert!((resampled.frame_count() as i64 - 500).abs() <= 1);
    }

    #[test]
    fn resample_is_noop_when_rates_match() {
        let buffer = AudioBuffer { samples: vec![0.1, 0.2, 0.3], sample_rate: 44_100, channel_layout: ChannelLayout::Mono };
        let codec = HoundAudioCodec;
        let resampled = codec.resample(&buffer, 44_100).unwrap();
        assert_eq!(resampled.samples, buffer.samples);
    }

    #[test]
    fn encode_then_decode_round_trips_at_canonical_rate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let buffer = AudioBuffer { samples: vec![0.0, 0.5, -0.5, 0.25], sample_rate: 44_100, channel_layout: ChannelLayout::Mono };
        let codec = HoundAudioCodec;
        codec.encode_wav(&path, &buffer, &EncodeOptions::canonical()).unwrap();

        let decoded = codec.decode(&path).unwrap();
        assert_eq!(decoded.sample_rate, 44_100);
        assert_eq!(decoded.samples.len(), buffer.samples.len());
    }

    #[test]
    fn missing_file_is_input_missing() {
        let codec = HoundAudioCodec;
        let err = codec.decode(Path::new("/nonexistent.wav")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InputMissing);
    }
}
