//! The MFA external-collaborator contract (§4.12): four subprocess
//! operations (`validate`, `g2p`, `add_words`, `align`) producing a
//! TextGrid. Mirrors the `Asr` trait split (Design Notes §9): the core
//! depends only on [`Mfa`], never on the `mfa` binary directly.

use super::types::{MfaJob, MfaOutcome};
use crate::error::PipelineError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

#[async_trait]
pub trait Mfa: Send + Sync {
    /// Checks the corpus/dictionary/acoustic-model triple is usable before
    /// spending time on `align`.
    async fn validate(&self, job: &MfaJob) -> Result<(), PipelineError>;

    /// Grapheme-to-phoneme: generates pronunciations for out-of-dictionary
    /// words found in the corpus text.
    async fn g2p(&self, job: &MfaJob) -> Result<PathBuf, PipelineError>;

    /// Merges G2P output into the working dictionary for this workspace.
    async fn add_words(&self, job: &MfaJob, g2p_output: &Path) -> Result<(), PipelineError>;

    /// Runs forced alignment, producing a TextGrid file.
    async fn align(&self, job: &MfaJob) -> Result<MfaOutcome, PipelineError>;

    fn tool_version(&self) -> String;
}

/// Invokes the real `mfa` CLI. Every operation passes `--output_directory`
/// (or the equivalent positional workspace argument) as `job.workspace`, so
/// N chapters can run concurrently under distinct `MfaWorkspacePool` slots
/// without colliding on shared corpus/dictionary state (§4.12).
pub struct ProcessMfa {
    binary_path: PathBuf,
    dictionary_name: String,
    acoustic_model_name: String,
    version: String,
}

impl ProcessMfa {
    pub fn new(binary_path: impl Into<PathBuf>, dictionary_name: impl Into<String>, acoustic_model_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            dictionary_name: dictionary_name.into(),
            acoustic_model_name: acoustic_model_name.into(),
            version: version.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String, PipelineError> {
        let output = Command::new(&self.binary_path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| PipelineError::ToolUnavailable { tool: "mfa".to_string(), message: e.to_string() })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(PipelineError::tool_exit_nonzero("mfa", output.status.code(), &stdout, &stderr));
        }
        Ok(stdout)
    }

    fn corpus_dir(job: &MfaJob) -> PathBuf {
        job.workspace.join("corpus")
    }

    async fn stage_corpus(&self, job: &MfaJob) -> Result<(), PipelineError> {
        let corpus_dir = Self::corpus_dir(job);
        tokio::fs::create_dir_all(&corpus_dir).await.map_err(PipelineError::IOError)?;
        let wav_dest = corpus_dir.join(format!("{}.wav", job.chapter_id));
        tokio::fs::copy(&job.audio_path, &wav_dest).await.map_err(PipelineError::IOError)?;
        let lab_dest = corpus_dir.join(format!("{}.lab", job.chapter_id));
        tokio::fs::write(&lab_dest, &job.corpus_text).await.map_err(PipelineError::IOError)?;
        Ok(())
    }
}

#[async_trait]
impl Mfa for ProcessMfa {
    async fn validate(&self, job: &MfaJob) -> Result<(), PipelineError> {
        self.stage_corpus(job).await?;
        let corpus = Self::corpus_dir(job);
        self.run(&["validate", corpus.to_str().unwrap_or_default(), &job.dictionary_name, &job.acoustic_model_name]).await?;
        Ok(())
    }

    async fn g2p(&self, job: &MfaJob) -> Result<PathBuf, PipelineError> {
        let corpus = Self::corpus_dir(job);
        let out_path = job.workspace.join(format!("{}.g2p.txt", job.chapter_id));
        self.run(&["g2p", &job.dictionary_name, corpus.to_str().unwrap_or_default(), out_path.to_str().unwrap_or_default()]).await?;
        Ok(out_path)
    }

    async fn add_words(&self, job: &MfaJob, g2p_output: &Path) -> Result<(), PipelineError> {
        self.run(&["model", "add_words", &job.dictionary_name, g2p_output.to_str().unwrap_or_default()]).await?;
        Ok(())
    }

    async fn align(&self, job: &MfaJob) -> Result<MfaOutcome, PipelineError> {
        let corpus = Self::corpus_dir(job);
        let out_dir = job.workspace.join("out");
        self.run(&[
            "align",
            corpus.to_str().unwrap_or_default(),
            &job.dictionary_name,
            &job.acoustic_model_name,
            out_dir.to_str().unwrap_or_default(),
        ])
        .await?;
        let text_grid_path = out_dir.join(format!("{}.TextGrid", job.chapter_id));
        if !text_grid_path.exists() {
            return Err(PipelineError::InputMissing { path: text_grid_path });
        }
        Ok(MfaOutcome { text_grid_path, tool_version: self.version.clone() })
    }

    fn tool_version(&self) -> String {
        self.version.clone()
    }
}

/// Serves a pre-written TextGrid regardless of job contents — used by tests
/// and by callers who already have MFA output from an out-of-process run.
pub struct FixtureMfa {
    text_grid_contents: String,
    version: String,
}

impl FixtureMfa {
    pub fn new(text_grid_contents: impl Into<String>, version: impl Into<String>) -> Self {
        Self { text_grid_contents: text_grid_contents.into(), version: version.into() }
    }
}

#[async_trait]
impl Mfa for FixtureMfa {
    async fn validate(&self, _job: &MfaJob) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn g2p(&self, job: &MfaJob) -> Result<PathBuf, PipelineError> {
        let out_path = job.workspace.join(format!("{}.g2p.txt", job.chapter_id));
        tokio::fs::create_dir_all(&job.workspace).await.map_err(PipelineError::IOError)?;
        tokio::fs::write(&out_path, "").await.map_err(PipelineError::IOError)?;
        Ok(out_path)
    }

    async fn add_words(&self, _job: &MfaJob, _g2p_output: &Path) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn align(&self, job: &MfaJob) -> Result<MfaOutcome, PipelineError> {
        tokio::fs::create_dir_all(&job.workspace).await.map_err(PipelineError::IOError)?;
        let text_grid_path = job.workspace.join(format!("{}.TextGrid", job.chapter_id));
        tokio::fs::write(&text_grid_path, &self.text_grid_contents).await.map_err(PipelineError::IOError)?;
        Ok(MfaOutcome { text_grid_path, tool_version: self.version.clone() })
    }

    fn tool_version(&self) -> String {
        self.version.clone()
    }
}
