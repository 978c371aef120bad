//! MFA (Montreal Forced Aligner) external-collaborator types (§4.12).

use std::path::PathBuf;

/// Everything the `Mfa` trait needs to stage and run one chapter's forced
/// alignment inside an isolated workspace directory.
#[derive(Debug, Clone)]
pub struct MfaJob {
    pub chapter_id: String,
    pub workspace: PathBuf,
    /// WAV to copy/symlink into the workspace corpus directory.
    pub audio_path: PathBuf,
    /// Plain-text transcript (`.lab` companion file) for the corpus.
    pub corpus_text: String,
    pub dictionary_name: String,
    pub acoustic_model_name: String,
}

#[derive(Debug, Clone)]
pub struct MfaOutcome {
    pub text_grid_path: PathBuf,
    pub tool_version: String,
}
