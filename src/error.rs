//! Error taxonomy for the alignment pipeline.
//!
//! `PipelineError` enumerates *kinds*, not exhaustive variants per failure
//! site, mirroring how `asr::ASRError` is organized in spirit but scoped to
//! the stage orchestrator and alignment engine. Call sites that talk to the
//! outside world (CLI, batch driver) work in `anyhow::Result` and attach
//! context; only code that needs to branch on the failure kind returns
//! `PipelineError` directly.

use std::path::PathBuf;
use thiserror::Error;

/// The stable error taxonomy from the error-handling design: callers branch
/// on `kind()`, never on the enum variant name, since new variants may be
/// added within a kind over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InputMissing,
    InputInvalid,
    ToolUnavailable,
    ToolExitNonZero,
    AlignmentInsufficient,
    MergeInconsistent,
    Cancelled,
    IOError,
}

impl ErrorKind {
    /// Kinds that are *allowed* to propagate out of a stage and still leave
    /// the stage fingerprint re-runnable once the underlying issue is fixed,
    /// rather than requiring `--force`.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::IOError | ErrorKind::ToolUnavailable)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InputMissing => "input_missing",
            ErrorKind::InputInvalid => "input_invalid",
            ErrorKind::ToolUnavailable => "tool_unavailable",
            ErrorKind::ToolExitNonZero => "tool_exit_nonzero",
            ErrorKind::AlignmentInsufficient => "alignment_insufficient",
            ErrorKind::MergeInconsistent => "merge_inconsistent",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::IOError => "io_error",
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("required input missing: {path}")]
    InputMissing { path: PathBuf },

    #[error("invalid input ({source_file}{location}): {message}")]
    InputInvalid {
        source_file: String,
        /// e.g. "line 12" or "byte 4096"; empty when not known.
        location: String,
        message: String,
    },

    #[error("external tool unavailable: {tool}: {message}")]
    ToolUnavailable { tool: String, message: String },

    #[error("external tool `{tool}` exited with status {code:?}\n--- stdout (tail) ---\n{stdout_tail}\n--- stderr (tail) ---\n{stderr_tail}")]
    ToolExitNonZero {
        tool: String,
        code: Option<i32>,
        stdout_tail: String,
        stderr_tail: String,
    },

    #[error("fewer than two anchors producible (found {found}); whole-chapter fallback also failed")]
    AlignmentInsufficient { found: usize },

    #[error("TextGrid/book merge produced monotonicity violations the shrink pass could not resolve: {detail}")]
    MergeInconsistent { detail: String },

    #[error("stage `{stage}` cancelled: {reason}")]
    Cancelled { stage: String, reason: String },

    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InputMissing { .. } => ErrorKind::InputMissing,
            PipelineError::InputInvalid { .. } => ErrorKind::InputInvalid,
            PipelineError::ToolUnavailable { .. } => ErrorKind::ToolUnavailable,
            PipelineError::ToolExitNonZero { .. } => ErrorKind::ToolExitNonZero,
            PipelineError::AlignmentInsufficient { .. } => ErrorKind::AlignmentInsufficient,
            PipelineError::MergeInconsistent { .. } => ErrorKind::MergeInconsistent,
            PipelineError::Cancelled { .. } => ErrorKind::Cancelled,
            PipelineError::IOError(_) => ErrorKind::IOError,
        }
    }

    pub fn tool_exit_nonzero(tool: impl Into<String>, code: Option<i32>, stdout: &str, stderr: &str) -> Self {
        PipelineError::ToolExitNonZero {
            tool: tool.into(),
            code,
            stdout_tail: tail_lines(stdout, 20),
            stderr_tail: tail_lines(stderr, 20),
        }
    }
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

/// One structured failure record per chapter, as required by the
/// user-visible failure behavior: `chapter_id`, `stage`, `kind`, `message`,
/// optional `cause_tail`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChapterFailure {
    pub chapter_id: String,
    pub stage: String,
    pub kind: String,
    pub message: String,
    pub cause_tail: Option<String>,
}

impl ChapterFailure {
    pub fn from_error(chapter_id: &str, stage: &str, err: &PipelineError) -> Self {
        let cause_tail = match err {
            PipelineError::ToolExitNonZero { stderr_tail, .. } => Some(stderr_tail.clone()),
            _ => None,
        };
        Self {
            chapter_id: chapter_id.to_string(),
            stage: stage.to_string(),
            kind: err.kind().as_str().to_string(),
            message: err.to_string(),
            cause_tail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_exit_nonzero_keeps_only_tail() {
        let stdout: String = (0..40).map(|i| format!("out line {i}\n")).collect();
        let stderr: String = (0..40).map(|i| format!("err line {i}\n")).collect();
        let err = PipelineError::tool_exit_nonzero("mfa", Some(1), &stdout, &stderr);
        match &err {
            PipelineError::ToolExitNonZero { stdout_tail, stderr_tail, .. } => {
                assert_eq!(stdout_tail.lines().count(), 20);
                assert_eq!(stderr_tail.lines().count(), 20);
                assert!(stdout_tail.contains("out line 39"));
                assert!(!stdout_tail.contains("out line 0\n"));
            }
            _ => panic!("wrong variant"),
        }
        assert_eq!(err.kind(), ErrorKind::ToolExitNonZero);
    }

    #[test]
    fn transient_kinds() {
        assert!(ErrorKind::IOError.is_transient());
        assert!(ErrorKind::ToolUnavailable.is_transient());
        assert!(!ErrorKind::InputMissing.is_transient());
    }

    #[test]
    fn chapter_failure_carries_stderr_tail_for_tool_errors() {
        let err = PipelineError::tool_exit_nonzero("mfa", Some(2), "", "boom");
        let failure = ChapterFailure::from_error("ch01", "mfa", &err);
        assert_eq!(failure.kind, "tool_exit_nonzero");
        assert_eq!(failure.cause_tail.as_deref(), Some("boom"));
    }
}
