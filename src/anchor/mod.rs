pub mod engine;
pub mod types;

pub use engine::mine_anchors;
pub use types::{Anchor, AnchorDocument, AnchorPolicyConfig, AnchorStats, WordRangeInclusive};
