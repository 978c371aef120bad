//! Audio buffer types for the decode/encode external-collaborator contract
//! (§4.12). Internal buffers are 32-bit float regardless of the on-disk
//! sample format (§6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelLayout {
    Mono,
    Stereo,
    /// Arbitrary channel count beyond mono/stereo, e.g. multi-mic captures.
    Multi(u8),
}

impl ChannelLayout {
    pub fn channel_count(&self) -> u8 {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
            ChannelLayout::Multi(n) => *n,
        }
    }

    pub fn from_channel_count(n: u8) -> Self {
        match n {
            1 => ChannelLayout::Mono,
            2 => ChannelLayout::Stereo,
            other => ChannelLayout::Multi(other),
        }
    }
}

/// An in-memory, interleaved 32-bit-float audio buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channel_layout: ChannelLayout,
}

impl AudioBuffer {
    pub fn frame_count(&self) -> usize {
        let channels = self.channel_layout.channel_count().max(1) as usize;
        self.samples.len() / channels
    }

    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// Canonical mastering format for on-disk WAV artifacts (§6): 44.1 kHz,
/// 16-bit PCM.
pub const CANONICAL_SAMPLE_RATE: u32 = 44_100;
pub const CANONICAL_BITS_PER_SAMPLE: u16 = 16;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterGraphSpec {
    /// Opaque filter-chain description (e.g. an ffmpeg `-af`-style string);
    /// the core never interprets this, only threads it through to the
    /// adapter per Design Notes §9.
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncodeOptions {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl EncodeOptions {
    pub fn canonical() -> Self {
        Self { sample_rate: CANONICAL_SAMPLE_RATE, bits_per_sample: CANONICAL_BITS_PER_SAMPLE }
    }
}
