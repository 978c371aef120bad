//! `bookcast-align`: command-line front end for the chapter pipeline (§6).
//!
//! The core crate never reads environment variables or argv directly (Design
//! Notes §9); this binary is the one place that does, translating flags into
//! the typed configuration the core consumes.

use anyhow::{bail, Context, Result};
use bookcast_align::align::{align_chapter, DpCostConfig};
use bookcast_align::anchor::mine_anchors;
use bookcast_align::asr::{Asr, AsrResponse, HttpAsr};
use bookcast_align::book::{
    build_book_index, BookIndex, BookIndexConfig, DocumentParser, PlainTextDocumentParser, UnsupportedFormatParser,
};
use bookcast_align::chapter::{BufferDescriptor, BufferRole, ChapterDescriptor};
use bookcast_align::config::{BatchOutcome, BatchReport, ChapterResult, PipelineConfig};
use bookcast_align::manifest::{load_manifest, save_manifest, ManifestV2, StageName};
use bookcast_align::mfa::{Mfa, ProcessMfa};
use bookcast_align::rollup::build_transcript_index;
use bookcast_align::stage::{run_chapter, ChapterRunInputs, ResourcePools, StageRange, DEFAULT_MERGE_WILD_MATCH_WINDOW};
use bookcast_align::workspace::{discover, BookManager, ChapterManager, MfaWorkspacePool, OpenPolicy};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "bookcast-align", version, about = "Aligns narrated audiobook audio to its source book text")]
struct Cli {
    /// Minimum log level: error, warn, info, debug, trace.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Optional TOML file overriding the default `PipelineConfig`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Runs the seven-stage chapter pipeline for one or every chapter of a book.
    Pipeline {
        #[command(subcommand)]
        action: PipelineAction,
    },
    /// Parses a book manuscript into a `BookIndex` and writes it as JSON.
    BuildIndex {
        #[arg(long)]
        book: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        force_refresh: bool,
        #[arg(long)]
        avg_wpm: Option<f64>,
        #[arg(long)]
        no_cache: bool,
    },
    /// Anchor mining and word-alignment utilities operating directly on
    /// already-produced artifacts, outside the fingerprinted pipeline.
    Align {
        #[command(subcommand)]
        action: AlignAction,
    },
    /// Compares a standalone narration script against an ASR transcript and
    /// reports per-sentence WER/CER without touching the chapter manifest.
    Validate {
        #[command(subcommand)]
        action: ValidateAction,
    },
}

#[derive(Subcommand)]
enum PipelineAction {
    Run {
        #[arg(long)]
        book: PathBuf,
        /// A single chapter's audio file, or a book-root directory
        /// containing one subdirectory per chapter (see `workspace::discover`).
        #[arg(long)]
        audio: PathBuf,
        #[arg(long)]
        chapter: Option<String>,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        force: bool,
        #[arg(long)]
        asr_concurrency: Option<usize>,
        #[arg(long)]
        mfa_concurrency: Option<usize>,
    },
}

#[derive(Subcommand)]
enum AlignAction {
    /// Mines anchors between a book index and an ASR transcript.
    Anchors {
        #[arg(long)]
        book_index: PathBuf,
        #[arg(long)]
        asr: PathBuf,
        #[arg(long)]
        emit_windows: bool,
    },
    /// Runs anchor mining plus windowed DP alignment, producing a `TranscriptIndex`.
    Tx {
        #[arg(long)]
        book_index: PathBuf,
        #[arg(long)]
        asr: PathBuf,
        #[arg(long)]
        audio: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum ValidateAction {
    Script {
        #[arg(long)]
        audio: PathBuf,
        #[arg(long)]
        script: PathBuf,
        #[arg(long)]
        asr_json: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::load(p).with_context(|| format!("loading config from {}", p.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn parser_for(path: &Path) -> Box<dyn DocumentParser> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("txt") | Some("md") | None => Box::new(PlainTextDocumentParser),
        Some(other) => Box::new(UnsupportedFormatParser { format: Box::leak(other.to_string().into_boxed_str()) }),
    }
}

fn parse_stage(name: &str) -> Result<StageName> {
    StageName::ORDER.into_iter().find(|s| s.as_str() == name).ok_or_else(|| anyhow::anyhow!("unknown stage `{name}`; expected one of {:?}", StageName::ORDER.map(StageName::as_str)))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing JSON from {}", path.display()))
}

/// Writes `value` in the canonical on-disk format required by §6
/// (`book-index.json` et al.): sorted keys, no insignificant whitespace.
/// Goes through [`bookcast_align::manifest::canonical_json`] rather than
/// `serde_json::to_vec_pretty`, which would emit struct-declaration-order,
/// pretty-printed JSON instead.
fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let body = bookcast_align::manifest::canonical_json(value).with_context(|| format!("canonicalizing JSON for {}", path.display()))?;
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::from(1);
        }
    };

    match run(cli.command, config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::from(1)
        }
    }
}

async fn run(command: Command, config: PipelineConfig) -> Result<ExitCode> {
    match command {
        Command::BuildIndex { book, out, force_refresh, avg_wpm, no_cache } => build_index(&book, &out, force_refresh, avg_wpm, no_cache, &config),
        Command::Align { action } => align(action),
        Command::Validate { action } => validate(action),
        Command::Pipeline { action } => pipeline(action, config).await,
    }
}

fn build_index(book: &Path, out: &Path, _force_refresh: bool, avg_wpm: Option<f64>, _no_cache: bool, config: &PipelineConfig) -> Result<ExitCode> {
    let mut book_index_config = config.book_index.clone();
    if let Some(wpm) = avg_wpm {
        book_index_config = BookIndexConfig { average_wpm: wpm, ..book_index_config };
    }
    let parser = parser_for(book);
    let parsed = parser.parse(book).context("parsing book manuscript")?;
    let index = build_book_index(&book.display().to_string(), &parsed, &book_index_config).context("building book index")?;
    write_json(out, &index)?;
    println!("wrote {} ({} words, {} sentences)", out.display(), index.totals.words, index.totals.sentences);
    Ok(ExitCode::SUCCESS)
}

fn align(action: AlignAction) -> Result<ExitCode> {
    match action {
        AlignAction::Anchors { book_index, asr, emit_windows } => {
            let book: BookIndex = read_json(&book_index)?;
            let asr: AsrResponse = read_json(&asr)?;
            let policy = bookcast_align::anchor::AnchorPolicyConfig::default();
            let doc = mine_anchors(&book, &asr, &policy, None)?;
            if emit_windows {
                for pair in doc.anchors.windows(2) {
                    println!("[{}, {}) -> [{}, {})", pair[0].book_position, pair[1].book_position, pair[0].asr_position, pair[1].asr_position);
                }
            }
            println!("{}", serde_json::to_string_pretty(&doc)?);
            Ok(ExitCode::SUCCESS)
        }
        AlignAction::Tx { book_index, asr, audio, out } => {
            let book: BookIndex = read_json(&book_index)?;
            let asr: AsrResponse = read_json(&asr)?;
            let anchors = mine_anchors(&book, &asr, &bookcast_align::anchor::AnchorPolicyConfig::default(), None)?;
            let ops = align_chapter(&book, &asr, &anchors, &DpCostConfig::default())?;
            let index = build_transcript_index(
                &audio.display().to_string(),
                &asr.model_version,
                &book_index.display().to_string(),
                &book,
                &asr,
                ops,
                "dp_window",
                chrono::Utc::now(),
            )?;
            write_json(&out, &index)?;
            println!("wrote {}", out.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn validate(action: ValidateAction) -> Result<ExitCode> {
    let ValidateAction::Script { audio, script, asr_json, out } = action;
    let parser = parser_for(&script);
    let parsed = parser.parse(&script).context("parsing narration script")?;
    let book = build_book_index(&script.display().to_string(), &parsed, &BookIndexConfig::default())?;
    let asr: AsrResponse = read_json(&asr_json)?;
    let anchors = mine_anchors(&book, &asr, &bookcast_align::anchor::AnchorPolicyConfig::default(), None)?;
    let ops = align_chapter(&book, &asr, &anchors, &DpCostConfig::default())?;
    let report = build_transcript_index(&audio.display().to_string(), &asr_json.display().to_string(), &script.display().to_string(), &book, &asr, ops, "dp_window", chrono::Utc::now())?;
    write_json(&out, &report)?;

    let flagged = report.sentences.iter().filter(|s| !matches!(s.status, bookcast_align::rollup::AlignStatus::Ok)).count();
    println!("wrote {} ({} sentences, {} flagged or unaligned)", out.display(), report.sentences.len(), flagged);
    Ok(ExitCode::SUCCESS)
}

fn build_asr(config: &PipelineConfig) -> Result<Box<dyn Asr>> {
    let base_url = std::env::var("ASR_SERVICE_URL").context("ASR_SERVICE_URL must be set to run the ASR stage")?;
    let model_version = if config.asr_model_version.is_empty() { "asr-service".to_string() } else { config.asr_model_version.clone() };
    Ok(Box::new(HttpAsr::new(base_url, model_version)))
}

fn build_mfa(config: &PipelineConfig) -> Result<Box<dyn Mfa>> {
    let root = std::env::var("MFA_ROOT_DIR").unwrap_or_default();
    let binary_path = if root.is_empty() { PathBuf::from("mfa") } else { PathBuf::from(root).join("bin").join("mfa") };
    let dictionary_name = if config.dictionary_name.is_empty() { "english_us_arpa".to_string() } else { config.dictionary_name.clone() };
    let acoustic_model_name = if config.acoustic_model_name.is_empty() { "english_us_arpa".to_string() } else { config.acoustic_model_name.clone() };
    Ok(Box::new(ProcessMfa::new(binary_path, dictionary_name, acoustic_model_name, "unknown")))
}

fn discover_descriptors(audio: &Path, chapter: Option<&str>, all: bool) -> Result<Vec<ChapterDescriptor>> {
    if audio.is_dir() {
        let descriptors = discover(audio)?;
        if all {
            return Ok(descriptors);
        }
        let Some(id) = chapter else { bail!("--chapter <id> or --all is required when --audio is a directory") };
        let matched: Vec<_> = descriptors.into_iter().filter(|d| d.chapter_id == id || d.aliases.iter().any(|a| a == id)).collect();
        if matched.is_empty() {
            bail!("no chapter `{id}` found under {}", audio.display());
        }
        Ok(matched)
    } else {
        let Some(id) = chapter else { bail!("--chapter <id> is required when --audio is a single file") };
        Ok(vec![ChapterDescriptor {
            chapter_id: id.to_string(),
            root_path: audio.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(".")),
            aliases: vec![],
            buffer_descriptors: vec![BufferDescriptor { role: BufferRole::Raw, path: audio.to_path_buf() }],
            book_start_word: None,
            book_end_word: None,
        }])
    }
}

async fn pipeline(action: PipelineAction, config: PipelineConfig) -> Result<ExitCode> {
    let PipelineAction::Run { book, audio, chapter, all, from, to, force, asr_concurrency, mfa_concurrency } = action;

    let range = match (from, to) {
        (None, None) => StageRange::full(),
        (from, to) => {
            let start = from.as_deref().map(parse_stage).transpose()?.unwrap_or(StageName::BookIndex);
            let end = to.as_deref().map(parse_stage).transpose()?.unwrap_or(StageName::Merge);
            StageRange::from_to(start, end)
        }
    };

    let descriptors = discover_descriptors(&audio, chapter.as_deref(), all)?;

    let book_manager = BookManager::new();
    let parser = parser_for(&book);
    let book_index = book_manager.get_or_build(&book, parser.as_ref(), &config.book_index).await.context("building book index")?;

    let asr = build_asr(&config)?;
    let mfa = build_mfa(&config)?;

    let asr_concurrency = asr_concurrency.unwrap_or(config.concurrency.asr_concurrency);
    let mfa_workspace_base = audio.parent().unwrap_or_else(|| Path::new(".")).join(".mfa-workspaces");
    let mfa_pool = Arc::new(MfaWorkspacePool::new(&mfa_workspace_base, mfa_concurrency.unwrap_or(config.concurrency.mfa_workspace_count)));
    let pools = ResourcePools::new(asr_concurrency, mfa_pool, config.timeouts.to_stage_timeouts());

    let artifacts_root = audio.is_dir().then(|| audio.clone()).unwrap_or_else(|| audio.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(".")));
    let chapter_manager = ChapterManager::new(artifacts_root);

    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_for_signal.cancel();
        }
    });

    let mut report: BatchReport = Vec::new();
    for descriptor in descriptors {
        let chapter_id = descriptor.chapter_id.clone();
        let Some(audio_path) = descriptor.preferred_audio_path().cloned() else {
            report.push(BatchOutcome {
                chapter_id,
                result: ChapterResult::Failed { kind: "input_missing".to_string(), stage: "book_index".to_string(), message: "no audio buffer found for chapter".to_string() },
                duration_ms: 0,
            });
            continue;
        };

        let manifest_path = descriptor.root_path.join("manifest.json");
        let mut manifest = load_manifest(&manifest_path).unwrap_or_else(|_| ManifestV2::new(&chapter_id, audio_path.display().to_string(), descriptor.root_path.join(format!("{chapter_id}.align.tx.json")).display().to_string(), chrono::Utc::now()));

        let lease = chapter_manager.open(descriptor.clone(), OpenPolicy::FailFast).await?;
        let mut handle = lease.handle;

        let inputs = ChapterRunInputs {
            book: &book_index,
            book_source_path: &book,
            book_index_config: config.book_index.clone(),
            audio_path: &audio_path,
            asr: asr.as_ref(),
            mfa: mfa.as_ref(),
            anchor_policy: config.anchor_policy.clone(),
            dp_costs: config.dp_costs.clone(),
            dictionary_name: config.dictionary_name.clone(),
            acoustic_model_name: config.acoustic_model_name.clone(),
            wild_match_window: DEFAULT_MERGE_WILD_MATCH_WINDOW,
            apply_to_transcript: true,
            force,
            range,
        };

        let started = Instant::now();
        let outcome = run_chapter(&mut manifest, handle.get_mut(), &inputs, &pools, &cancel).await;
        let duration_ms = started.elapsed().as_millis();
        save_manifest(&manifest_path, &manifest)?;

        match outcome {
            Ok(()) => {
                tracing::info!(chapter_id = %chapter_id, "chapter completed");
                report.push(BatchOutcome { chapter_id, result: ChapterResult::Ok, duration_ms });
            }
            Err(e) => {
                let stage = StageName::ORDER.into_iter().find(|s| manifest.stage(*s).status == bookcast_align::manifest::StageStatus::Failed).map(|s| s.as_str().to_string()).unwrap_or_default();
                tracing::error!(chapter_id = %chapter_id, stage = %stage, error = %e, "chapter failed");
                report.push(BatchOutcome { chapter_id, result: ChapterResult::Failed { kind: e.kind().as_str().to_string(), stage, message: e.to_string() }, duration_ms });
            }
        }

        if cancel.is_cancelled() {
            break;
        }
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    if cancel.is_cancelled() {
        return Ok(ExitCode::from(130));
    }
    if report.iter().any(|o| matches!(o.result, ChapterResult::Failed { .. })) {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}
