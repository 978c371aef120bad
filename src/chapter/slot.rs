//! `DocumentSlot<T>`: a lazy, single-writer, dirty-tracked artifact cell
//! (§4.7).

use crate::error::PipelineError;
use std::path::{Path, PathBuf};

enum State<T> {
    NotLoaded,
    Loaded(T),
    Dirty(T),
}

/// One artifact slot on a `ChapterContext`. `loader`/`saver` close over the
/// on-disk path and the artifact's serialization; the slot itself only
/// tracks load/dirty state.
pub struct DocumentSlot<T> {
    path: PathBuf,
    state: State<T>,
}

impl<T> DocumentSlot<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), state: State::NotLoaded }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        matches!(self.state, State::Dirty(_))
    }

    pub fn is_loaded(&self) -> bool {
        !matches!(self.state, State::NotLoaded)
    }

    /// Loads on first access via `loader`, then returns a borrow of the
    /// cached value on every subsequent call.
    pub fn get(&mut self, loader: impl FnOnce(&Path) -> Result<T, PipelineError>) -> Result<&T, PipelineError> {
        if matches!(self.state, State::NotLoaded) {
            let value = loader(&self.path)?;
            self.state = State::Loaded(value);
        }
        match &self.state {
            State::Loaded(v) | State::Dirty(v) => Ok(v),
            State::NotLoaded => unreachable!("just loaded above"),
        }
    }

    /// Replaces the value and marks the slot dirty, regardless of prior state.
    pub fn set(&mut self, value: T) {
        self.state = State::Dirty(value);
    }

    /// Loads on first access via `loader` like [`Self::get`], then returns a
    /// mutable borrow and eagerly marks the slot dirty — for callers (e.g.
    /// the TextGrid merge stage) that intend to mutate the value in place
    /// rather than replace it wholesale via `set`.
    pub fn get_mut(&mut self, loader: impl FnOnce(&Path) -> Result<T, PipelineError>) -> Result<&mut T, PipelineError> {
        if matches!(self.state, State::NotLoaded) {
            let value = loader(&self.path)?;
            self.state = State::Loaded(value);
        }
        if let State::Loaded(value) = std::mem::replace(&mut self.state, State::NotLoaded) {
            self.state = State::Dirty(value);
        }
        match &mut self.state {
            State::Loaded(v) | State::Dirty(v) => Ok(v),
            State::NotLoaded => unreachable!("just loaded above"),
        }
    }

    /// Discards any cached value and re-loads from disk on next `get`.
    pub fn reload(&mut self) {
        self.state = State::NotLoaded;
    }

    /// Writes the value if dirty, via `saver`, then marks the slot clean
    /// (Loaded). No-op if the slot was never set dirty.
    pub fn save_if_dirty(&mut self, saver: impl FnOnce(&Path, &T) -> Result<(), PipelineError>) -> Result<(), PipelineError> {
        if let State::Dirty(value) = &self.state {
            saver(&self.path, value)?;
        }
        if let State::Dirty(value) = std::mem::replace(&mut self.state, State::NotLoaded) {
            self.state = State::Loaded(value);
        }
        Ok(())
    }
}
