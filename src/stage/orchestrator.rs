//! The seven-stage pipeline orchestrator (§4.8): per-stage fingerprint
//! checks, permit acquisition, cancellation/timeout handling, and manifest
//! bookkeeping wrapped around each stage's actual work.
//!
//! `BookIndex` itself is built once per book by [`crate::workspace::BookManager`]
//! ahead of any chapter run (it is never a per-chapter artifact), so this
//! stage's body here is a ledger entry only: it records that the chapter's
//! book-index input was observed at a given fingerprint, without redoing the
//! parse.

use super::params::{AnchorsStageParams, AsrStageParams, BookIndexStageParams, HydrateStageParams, MergeStageParams, MfaStageParams, TranscriptStageParams};
use super::resource::ResourcePools;
use super::types::StageRange;
use crate::align::{align_chapter, DpCostConfig};
use crate::anchor::{mine_anchors, AnchorPolicyConfig};
use crate::asr::Asr;
use crate::book::{BookIndex, BookIndexConfig, WordRange};
use crate::chapter::ChapterContext;
use crate::error::PipelineError;
use crate::manifest::{combine_hashes, compute_fingerprint, hash_file, hash_value, Fingerprint, ManifestV2, StageError, StageName, StageStatus};
use crate::mfa::{Mfa, MfaJob};
use crate::rollup::{build_transcript_index, hydrate};
use crate::textgrid::{merge_text_grid, parse_text_grid, DEFAULT_WILD_MATCH_WINDOW};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Every external collaborator and tuning knob one chapter's run needs,
/// beyond what already lives on its [`ChapterContext`].
pub struct ChapterRunInputs<'a> {
    pub book: &'a BookIndex,
    pub book_source_path: &'a Path,
    pub book_index_config: BookIndexConfig,
    pub audio_path: &'a Path,
    pub asr: &'a (dyn Asr + 'a),
    pub mfa: &'a (dyn Mfa + 'a),
    pub anchor_policy: AnchorPolicyConfig,
    pub dp_costs: DpCostConfig,
    pub dictionary_name: String,
    pub acoustic_model_name: String,
    pub wild_match_window: usize,
    pub apply_to_transcript: bool,
    pub force: bool,
    pub range: StageRange,
}

/// Runs `work`, but first checks whether `fresh_fp` already matches the
/// manifest's recorded fingerprint for `stage` (skipping entirely unless
/// `force`), and races it against both `cancel` and `timeout`. Updates the
/// manifest's per-stage bookkeeping (status, attempts, timestamps, error,
/// fingerprint) regardless of outcome. Returns `Ok(true)` if the stage body
/// actually ran, `Ok(false)` if it was skipped as up to date.
async fn execute_stage<F, Fut>(
    manifest: &mut ManifestV2,
    stage: StageName,
    fresh_fp: Fingerprint,
    force: bool,
    cancel: &CancellationToken,
    timeout: Duration,
    work: F,
) -> Result<bool, PipelineError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), PipelineError>>,
{
    if !force && manifest.stage(stage).is_up_to_date(&fresh_fp) {
        return Ok(false);
    }

    {
        let entry = manifest.stage_mut(stage);
        entry.status = StageStatus::InProgress;
        entry.attempts += 1;
        entry.started_at = Some(chrono::Utc::now());
        entry.error = None;
    }
    manifest.modified_at = chrono::Utc::now();

    let result: Result<(), PipelineError> = tokio::select! {
        _ = cancel.cancelled() => Err(PipelineError::Cancelled {
            stage: stage.as_str().to_string(),
            reason: "cancellation requested".to_string(),
        }),
        res = tokio::time::timeout(timeout, work()) => match res {
            Ok(inner) => inner,
            Err(_) => Err(PipelineError::Cancelled {
                stage: stage.as_str().to_string(),
                reason: format!("timed out after {timeout:?}"),
            }),
        },
    };

    let ended_at = chrono::Utc::now();
    match &result {
        Ok(()) => {
            let entry = manifest.stage_mut(stage);
            entry.status = StageStatus::Completed;
            entry.ended_at = Some(ended_at);
            entry.fingerprint = Some(fresh_fp);
        }
        Err(e) => {
            let entry = manifest.stage_mut(stage);
            entry.status = StageStatus::Failed;
            entry.ended_at = Some(ended_at);
            entry.error = Some(StageError { kind: e.kind().as_str().to_string(), message: e.to_string() });
        }
    }
    manifest.modified_at = chrono::Utc::now();

    result.map(|()| true)
}

/// Runs every stage in `inputs.range`, in order, stopping at the first
/// failure (per the chapter-level error propagation policy — a failure here
/// never touches other chapters' manifests). `ctx.save_changes()` runs after
/// every stage that actually executed, so a later stage only ever observes a
/// prior stage's output once it has been durably written (§5).
pub async fn run_chapter(manifest: &mut ManifestV2, ctx: &mut ChapterContext, inputs: &ChapterRunInputs<'_>, pools: &ResourcePools, cancel: &CancellationToken) -> Result<(), PipelineError> {
    if inputs.range.includes(StageName::BookIndex) {
        let input_hash = hash_file(inputs.book_source_path)?;
        let params = BookIndexStageParams { book_index: inputs.book_index_config.clone() };
        let tool_versions = BTreeMap::new();
        let fp = compute_fingerprint(&input_hash, &params, &tool_versions)?;
        execute_stage(manifest, StageName::BookIndex, fp, inputs.force, cancel, pools.timeouts.cpu, || async { Ok(()) }).await?;
    }

    if inputs.range.includes(StageName::Asr) {
        let input_hash = hash_file(inputs.audio_path)?;
        let params = AsrStageParams {};
        let mut tool_versions = BTreeMap::new();
        tool_versions.insert("asr_model_version".to_string(), inputs.asr.model_version());
        let fp = compute_fingerprint(&input_hash, &params, &tool_versions)?;

        let ctx_ref = &mut *ctx;
        let ran = execute_stage(manifest, StageName::Asr, fp, inputs.force, cancel, pools.timeouts.asr, || async {
            let _permit = pools.asr_semaphore.acquire().await.map_err(|_| PipelineError::Cancelled {
                stage: StageName::Asr.as_str().to_string(),
                reason: "asr semaphore closed".to_string(),
            })?;
            let response = inputs.asr.transcribe(inputs.audio_path).await?;
            ctx_ref.asr.set(response);
            Ok(())
        })
        .await?;
        if ran {
            ctx.save_changes()?;
        }
    }

    if inputs.range.includes(StageName::Anchors) {
        let asr_hash = hash_value(ctx.load_asr()?)?;
        let book_hash = hash_value(inputs.book)?;
        let input_hash = combine_hashes(&[&book_hash, &asr_hash]);
        let params = AnchorsStageParams { policy: inputs.anchor_policy.clone() };
        let tool_versions = BTreeMap::new();
        let fp = compute_fingerprint(&input_hash, &params, &tool_versions)?;

        let ctx_ref = &mut *ctx;
        let ran = execute_stage(manifest, StageName::Anchors, fp, inputs.force, cancel, pools.timeouts.cpu, || async {
            let asr = ctx_ref.load_asr()?.clone();
            let section_range = match (ctx_ref.descriptor.book_start_word, ctx_ref.descriptor.book_end_word) {
                (Some(start), Some(end)) => Some(crate::anchor::WordRangeInclusive { start, end }),
                _ => None,
            };
            let doc = mine_anchors(inputs.book, &asr, &inputs.anchor_policy, section_range)?;
            ctx_ref.anchors.set(doc);
            Ok(())
        })
        .await?;
        if ran {
            ctx.save_changes()?;
        }
    }

    if inputs.range.includes(StageName::Transcript) {
        let asr_hash = hash_value(ctx.load_asr()?)?;
        let book_hash = hash_value(inputs.book)?;
        let anchors_hash = hash_value(ctx.load_anchors()?)?;
        let input_hash = combine_hashes(&[&book_hash, &asr_hash, &anchors_hash]);
        let params = TranscriptStageParams { costs: inputs.dp_costs.clone() };
        let tool_versions = BTreeMap::new();
        let fp = compute_fingerprint(&input_hash, &params, &tool_versions)?;

        let ctx_ref = &mut *ctx;
        let ran = execute_stage(manifest, StageName::Transcript, fp, inputs.force, cancel, pools.timeouts.cpu, || async {
            let asr = ctx_ref.load_asr()?.clone();
            let anchors = ctx_ref.load_anchors()?.clone();
            let ops = align_chapter(inputs.book, &asr, &anchors, &inputs.dp_costs)?;
            let index = build_transcript_index(
                &inputs.audio_path.display().to_string(),
                &ctx_ref.asr.path().display().to_string(),
                &inputs.book_source_path.display().to_string(),
                inputs.book,
                &asr,
                ops,
                "dp_window",
                chrono::Utc::now(),
            )?;
            ctx_ref.transcript.set(index);
            Ok(())
        })
        .await?;
        if ran {
            ctx.save_changes()?;
        }
    }

    if inputs.range.includes(StageName::Hydrate) {
        let transcript_hash = hash_value(ctx.load_transcript()?)?;
        let input_hash = transcript_hash;
        let params = HydrateStageParams {};
        let tool_versions = BTreeMap::new();
        let fp = compute_fingerprint(&input_hash, &params, &tool_versions)?;

        let ctx_ref = &mut *ctx;
        let ran = execute_stage(manifest, StageName::Hydrate, fp, inputs.force, cancel, pools.timeouts.cpu, || async {
            let asr = ctx_ref.load_asr()?.clone();
            let transcript = ctx_ref.load_transcript()?.clone();
            let hydrated = hydrate(&transcript, inputs.book, &asr, chrono::Utc::now());
            ctx_ref.hydrated.set(hydrated);
            Ok(())
        })
        .await?;
        if ran {
            ctx.save_changes()?;
        }
    }

    if inputs.range.includes(StageName::Mfa) {
        let hydrated_hash = hash_value(ctx.load_hydrated()?)?;
        let audio_hash = hash_file(inputs.audio_path)?;
        let input_hash = combine_hashes(&[&audio_hash, &hydrated_hash]);
        let params = MfaStageParams { dictionary_name: inputs.dictionary_name.clone(), acoustic_model_name: inputs.acoustic_model_name.clone() };
        let mut tool_versions = BTreeMap::new();
        tool_versions.insert("mfa_version".to_string(), inputs.mfa.tool_version());
        let fp = compute_fingerprint(&input_hash, &params, &tool_versions)?;

        let chapter_id = ctx.descriptor.chapter_id.clone();
        let ctx_ref = &mut *ctx;
        let ran = execute_stage(manifest, StageName::Mfa, fp, inputs.force, cancel, pools.timeouts.mfa, || async {
            let guard = pools.mfa_pool.acquire().await;
            let corpus_text = ctx_ref.load_hydrated()?.sentences.iter().map(|s| s.book_text.as_str()).collect::<Vec<_>>().join(" ");
            let job = MfaJob {
                chapter_id: chapter_id.clone(),
                workspace: guard.path().to_path_buf(),
                audio_path: inputs.audio_path.to_path_buf(),
                corpus_text,
                dictionary_name: inputs.dictionary_name.clone(),
                acoustic_model_name: inputs.acoustic_model_name.clone(),
            };
            inputs.mfa.validate(&job).await?;
            let g2p_output = inputs.mfa.g2p(&job).await?;
            inputs.mfa.add_words(&job, &g2p_output).await?;
            let outcome = inputs.mfa.align(&job).await?;
            let text_grid = parse_text_grid(&outcome.text_grid_path)?;
            ctx_ref.text_grid.set(text_grid);
            Ok(())
        })
        .await?;
        if ran {
            ctx.save_changes()?;
        }
    }

    if inputs.range.includes(StageName::Merge) {
        let text_grid_hash = hash_value(ctx.load_text_grid()?)?;
        let hydrated_hash = hash_value(ctx.load_hydrated()?)?;
        let input_hash = combine_hashes(&[&text_grid_hash, &hydrated_hash]);
        let params = MergeStageParams { wild_match_window: inputs.wild_match_window, apply_to_transcript: inputs.apply_to_transcript };
        let tool_versions = BTreeMap::new();
        let fp = compute_fingerprint(&input_hash, &params, &tool_versions)?;

        let chapter_window = match (ctx.descriptor.book_start_word, ctx.descriptor.book_end_word) {
            (Some(start), Some(end)) => Some(WordRange { start_word: start, end_word: end }),
            _ => None,
        };
        let ctx_ref = &mut *ctx;
        let ran = execute_stage(manifest, StageName::Merge, fp, inputs.force, cancel, pools.timeouts.cpu, || async {
            let text_grid = ctx_ref.load_text_grid()?.clone();
            let (hydrated, transcript) = ctx_ref.hydrated_and_transcript_mut()?;
            merge_text_grid(&text_grid, inputs.book, hydrated, transcript, chapter_window, inputs.wild_match_window, inputs.apply_to_transcript);
            Ok(())
        })
        .await?;
        if ran {
            ctx.save_changes()?;
        }
    }

    Ok(())
}

/// Default wild-match window used when a caller doesn't override it, mirroring
/// the TextGrid merger's own default (§4.6).
pub const DEFAULT_MERGE_WILD_MATCH_WINDOW: usize = DEFAULT_WILD_MATCH_WINDOW;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::{AsrResponse, AsrToken, FixtureAsr};
    use crate::book::{build_book_index, parser::ParseResult, parser::StructureHints};
    use crate::chapter::{ChapterContext, ChapterDescriptor};
    use crate::mfa::FixtureMfa;
    use crate::workspace::MfaWorkspacePool;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::{tempdir, NamedTempFile};

    fn asr_from_words(words: &[&str]) -> AsrResponse {
        let tokens = words.iter().enumerate().map(|(i, w)| AsrToken { start_sec: i as f64 * 0.3, duration_sec: 0.25, text: w.to_string() }).collect();
        AsrResponse { model_version: "test-1".into(), tokens, segments: None }
    }

    fn text_grid_for(words: &[&str]) -> String {
        let mut body = String::from("File type = \"ooTextFile\"\nObject class = \"TextGrid\"\nitem []:\n    item [1]:\n        class = \"IntervalTier\"\n        name = \"words\"\n        intervals: size = 0\n");
        for (i, w) in words.iter().enumerate() {
            let start = i as f64 * 0.3;
            let end = start + 0.25;
            body.push_str(&format!("        intervals [{}]:\n            xmin = {start}\n            xmax = {end}\n            text = \"{w}\"\n", i + 1));
        }
        body
    }

    #[tokio::test]
    async fn full_range_run_completes_every_stage() {
        let text = "alpha bravo charlie delta echo foxtrot golf hotel india juliet kilo lima mike november oscar";
        let mut book_file = NamedTempFile::new().unwrap();
        book_file.write_all(text.as_bytes()).unwrap();

        let parsed = ParseResult { full_text: text.to_string(), structure_hints: StructureHints::default() };
        let book = build_book_index("book.txt", &parsed, &BookIndexConfig::default()).unwrap();

        let words: Vec<&str> = text.split_whitespace().collect();
        let asr_response = asr_from_words(&words);
        let asr = FixtureAsr::new(asr_response);

        let mut audio_file = NamedTempFile::new().unwrap();
        audio_file.write_all(b"riff-fake-wav-bytes").unwrap();

        let mfa = FixtureMfa::new(text_grid_for(&words), "2.2.0");

        let artifacts = tempdir().unwrap();
        let descriptor = ChapterDescriptor {
            chapter_id: "ch01".into(),
            root_path: artifacts.path().to_path_buf(),
            aliases: vec![],
            buffer_descriptors: vec![],
            book_start_word: None,
            book_end_word: None,
        };
        let mut ctx = ChapterContext::open(descriptor, artifacts.path());

        let mfa_base = tempdir().unwrap();
        let pools = ResourcePools::new(2, Arc::new(MfaWorkspacePool::new(mfa_base.path(), 1)), super::super::resource::StageTimeouts::default());

        let mut manifest = ManifestV2::new("ch01", audio_file.path().display().to_string(), artifacts.path().join("transcript.json").display().to_string(), chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap());

        let inputs = ChapterRunInputs {
            book: &book,
            book_source_path: book_file.path(),
            book_index_config: BookIndexConfig::default(),
            audio_path: audio_file.path(),
            asr: &asr,
            mfa: &mfa,
            anchor_policy: crate::anchor::AnchorPolicyConfig { min_separation: 2, ..crate::anchor::AnchorPolicyConfig::default() },
            dp_costs: DpCostConfig::default(),
            dictionary_name: "english_us_arpa".into(),
            acoustic_model_name: "english_us_arpa".into(),
            wild_match_window: DEFAULT_MERGE_WILD_MATCH_WINDOW,
            apply_to_transcript: true,
            force: false,
            range: StageRange::full(),
        };

        let cancel = CancellationToken::new();
        run_chapter(&mut manifest, &mut ctx, &inputs, &pools, &cancel).await.unwrap();

        for stage in StageName::ORDER {
            assert_eq!(manifest.stage(stage).status, StageStatus::Completed, "stage {stage:?} did not complete");
        }
        assert!(ctx.load_hydrated().unwrap().sentences.iter().any(|s| s.timing.start >= 0.0));
    }

    #[tokio::test]
    async fn second_run_skips_every_stage_when_nothing_changed() {
        let text = "alpha bravo charlie delta echo foxtrot golf hotel india juliet kilo lima mike november oscar";
        let mut book_file = NamedTempFile::new().unwrap();
        book_file.write_all(text.as_bytes()).unwrap();
        let parsed = ParseResult { full_text: text.to_string(), structure_hints: StructureHints::default() };
        let book = build_book_index("book.txt", &parsed, &BookIndexConfig::default()).unwrap();
        let words: Vec<&str> = text.split_whitespace().collect();
        let asr = FixtureAsr::new(asr_from_words(&words));
        let mut audio_file = NamedTempFile::new().unwrap();
        audio_file.write_all(b"riff-fake-wav-bytes").unwrap();
        let mfa = FixtureMfa::new(text_grid_for(&words), "2.2.0");
        let artifacts = tempdir().unwrap();
        let descriptor =
            ChapterDescriptor { chapter_id: "ch01".into(), root_path: artifacts.path().to_path_buf(), aliases: vec![], buffer_descriptors: vec![], book_start_word: None, book_end_word: None };
        let mut ctx = ChapterContext::open(descriptor, artifacts.path());
        let mfa_base = tempdir().unwrap();
        let pools = ResourcePools::new(2, Arc::new(MfaWorkspacePool::new(mfa_base.path(), 1)), super::super::resource::StageTimeouts::default());
        let mut manifest = ManifestV2::new("ch01", audio_file.path().display().to_string(), artifacts.path().join("transcript.json").display().to_string(), chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let inputs = ChapterRunInputs {
            book: &book,
            book_source_path: book_file.path(),
            book_index_config: BookIndexConfig::default(),
            audio_path: audio_file.path(),
            asr: &asr,
            mfa: &mfa,
            anchor_policy: crate::anchor::AnchorPolicyConfig { min_separation: 2, ..crate::anchor::AnchorPolicyConfig::default() },
            dp_costs: DpCostConfig::default(),
            dictionary_name: "english_us_arpa".into(),
            acoustic_model_name: "english_us_arpa".into(),
            wild_match_window: DEFAULT_MERGE_WILD_MATCH_WINDOW,
            apply_to_transcript: true,
            force: false,
            range: StageRange::full(),
        };
        let cancel = CancellationToken::new();
        run_chapter(&mut manifest, &mut ctx, &inputs, &pools, &cancel).await.unwrap();
        let attempts_first: Vec<u32> = StageName::ORDER.iter().map(|s| manifest.stage(*s).attempts).collect();

        run_chapter(&mut manifest, &mut ctx, &inputs, &pools, &cancel).await.unwrap();
        let attempts_second: Vec<u32> = StageName::ORDER.iter().map(|s| manifest.stage(*s).attempts).collect();

        assert_eq!(attempts_first, attempts_second, "no stage should re-run when inputs are unchanged");
    }

    #[tokio::test]
    async fn execute_stage_returns_cancelled_when_token_already_cancelled() {
        let mut manifest = ManifestV2::new("ch01", "a.wav", "t.json", chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let fp = Fingerprint { input_hash: "a".into(), params_hash: "b".into(), tool_versions: BTreeMap::new() };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = execute_stage(&mut manifest, StageName::Asr, fp, false, &cancel, Duration::from_secs(5), || async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), crate::error::ErrorKind::Cancelled);
        assert_eq!(manifest.stage(StageName::Asr).status, StageStatus::Failed);
    }

    #[tokio::test]
    async fn execute_stage_times_out_when_work_outlasts_the_deadline() {
        let mut manifest = ManifestV2::new("ch01", "a.wav", "t.json", chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let fp = Fingerprint { input_hash: "a".into(), params_hash: "b".into(), tool_versions: BTreeMap::new() };
        let cancel = CancellationToken::new();

        let result = execute_stage(&mut manifest, StageName::Mfa, fp, false, &cancel, Duration::from_millis(10), || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), crate::error::ErrorKind::Cancelled);
    }
}
