pub mod adapter;
pub mod types;

pub use adapter::{AudioCodec, HoundAudioCodec};
pub use types::{AudioBuffer, ChannelLayout, EncodeOptions, FilterGraphSpec, CANONICAL_BITS_PER_SAMPLE, CANONICAL_SAMPLE_RATE};
