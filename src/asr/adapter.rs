//! The ASR external-collaborator contract (§4.12): `transcribe(audio_path) -> AsrResponse`.
//!
//! The core depends only on the [`Asr`] trait (Design Notes §9). Two
//! implementations ship here: a fixture-backed adapter for deterministic
//! tests, and an HTTP adapter for a network-hosted ASR service reachable at
//! `ASR_SERVICE_URL` — mirroring the teacher's own split between a
//! `WhisperEngine` (heavy, model-backed) and its `TranscriptionContext`
//! plumbing, generalized here to an injectable trait per Design Notes §9.

use super::types::AsrResponse;
use crate::error::PipelineError;
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
pub trait Asr: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<AsrResponse, PipelineError>;

    /// Reported model identity, folded into stage fingerprints (§4.9).
    fn model_version(&self) -> String;
}

/// Serves a pre-recorded `AsrResponse` regardless of the audio path given —
/// used by tests and by callers who already have ASR output from an
/// out-of-process run and just want the pipeline to ingest it.
pub struct FixtureAsr {
    response: AsrResponse,
}

impl FixtureAsr {
    pub fn new(response: AsrResponse) -> Self {
        Self { response }
    }
}

#[async_trait]
impl Asr for FixtureAsr {
    async fn transcribe(&self, _audio_path: &Path) -> Result<AsrResponse, PipelineError> {
        self.response.validate().map_err(|message| PipelineError::InputInvalid {
            source_file: "asr fixture".to_string(),
            location: String::new(),
            message,
        })?;
        Ok(self.response.clone())
    }

    fn model_version(&self) -> String {
        self.response.model_version.clone()
    }
}

/// Talks to a network-hosted ASR service at `base_url` (typically sourced
/// from the `ASR_SERVICE_URL` environment variable by the caller — the core
/// itself never reads environment variables directly, per §6).
pub struct HttpAsr {
    client: reqwest::Client,
    base_url: String,
    model_version: String,
}

impl HttpAsr {
    pub fn new(base_url: impl Into<String>, model_version: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into(), model_version: model_version.into() }
    }
}

#[async_trait]
impl Asr for HttpAsr {
    async fn transcribe(&self, audio_path: &Path) -> Result<AsrResponse, PipelineError> {
        if !audio_path.exists() {
            return Err(PipelineError::InputMissing { path: audio_path.to_path_buf() });
        }
        let bytes = tokio::fs::read(audio_path).await.map_err(PipelineError::IOError)?;

        let url = format!("{}/transcribe", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("content-type", "audio/wav")
            .body(bytes)
            .send()
            .await
            .map_err(|e| PipelineError::ToolUnavailable { tool: "asr-service".to_string(), message: e.to_string() })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::tool_exit_nonzero("asr-service", Some(status.as_u16() as i32), "", &body));
        }

        let parsed: AsrResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::InputInvalid { source_file: url, location: String::new(), message: e.to_string() })?;

        parsed.validate().map_err(|message| PipelineError::InputInvalid { source_file: "asr response".to_string(), location: String::new(), message })?;
        Ok(parsed)
    }

    fn model_version(&self) -> String {
        self.model_version.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::types::AsrToken;

    #[tokio::test]
    async fn fixture_asr_returns_configured_response() {
        let response = AsrResponse {
            model_version: "fixture-1".into(),
            tokens: vec![AsrToken { start_sec: 0.0, duration_sec: 0.4, text: "Hello".into() }],
            segments: None,
        };
        let adapter = FixtureAsr::new(response.clone());
        let got = adapter.transcribe(Path::new("/any/path.wav")).await.unwrap();
        assert_eq!(got, response);
        assert_eq!(adapter.model_version(), "fixture-1");
    }

    #[tokio::test]
    async fn fixture_asr_rejects_invalid_response_at_construction_use() {
        let bad = AsrResponse { model_version: "x".into(), tokens: vec![AsrToken { start_sec: 0.0, duration_sec: -1.0, text: "a".into() }], segments: None };
        let adapter = FixtureAsr::new(bad);
        assert!(adapter.transcribe(Path::new("/x.wav")).await.is_err());
    }
}
