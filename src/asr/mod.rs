pub mod adapter;
pub mod types;

pub use adapter::{Asr, FixtureAsr, HttpAsr};
pub use types::{AsrResponse, AsrSegment, AsrToken};
