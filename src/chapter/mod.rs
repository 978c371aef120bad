pub mod context;
pub mod descriptor;
pub mod slot;

pub use context::{ChapterContext, ChapterContextHandle};
pub use descriptor::{BufferDescriptor, BufferRole, ChapterDescriptor};
pub use slot::DocumentSlot;
