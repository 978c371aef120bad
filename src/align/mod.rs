pub mod stitch;
pub mod types;
pub mod windowed;

pub use stitch::align_chapter;
pub use types::{DpCostConfig, WordOp};
pub use windowed::align_window;
