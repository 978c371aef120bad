//! The document-parsing external-collaborator contract (§4.12): book
//! manuscripts in Markdown/DOCX/PDF/RTF/TXT become a flat `full_text` plus
//! structural hints the `BookIndex` builder can use to recover paragraph and
//! section boundaries without re-deriving them from punctuation alone.

use crate::error::PipelineError;
use std::path::Path;

/// A candidate section/chapter heading found in the source document, e.g. a
/// Markdown `#`/`##` line or a detected "Chapter N" marker.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingHint {
    /// Byte offset into `full_text` where the heading's body text begins.
    pub char_offset: u32,
    pub title: String,
}

/// Structural hints a parser can recover from document formatting that
/// plain text loses (paragraph breaks, heading candidates).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureHints {
    /// Byte offsets into `full_text` at which a new paragraph starts.
    /// Always includes `0` if `full_text` is non-empty.
    pub paragraph_breaks: Vec<u32>,
    pub headings: Vec<HeadingHint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub full_text: String,
    pub structure_hints: StructureHints,
}

/// A book document parser. One implementation per source format; the core
/// depends only on this trait (Design Notes §9: "service interfaces with a
/// single implementation").
pub trait DocumentParser: Send + Sync {
    fn parse(&self, path: &Path) -> Result<ParseResult, PipelineError>;
}

/// Parses plain text and Markdown-ish manuscripts: paragraph breaks are
/// blank lines; headings are Markdown `#`-prefixed lines or a bare
/// "Chapter N" / "CHAPTER N" line.
pub struct PlainTextDocumentParser;

impl DocumentParser for PlainTextDocumentParser {
    fn parse(&self, path: &Path) -> Result<ParseResult, PipelineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PipelineError::InputMissing { path: path.to_path_buf() }
            } else {
                PipelineError::IOError(e)
            }
        })?;

        let mut full_text = String::with_capacity(raw.len());
        let mut paragraph_breaks = vec![0u32];
        let mut headings = Vec::new();
        let mut blank_run = 0usize;

        for line in raw.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                blank_run += 1;
                continue;
            }
            if blank_run > 0 && !full_text.is_empty() {
                paragraph_breaks.push(full_text.len() as u32);
            }
            blank_run = 0;

            if let Some(heading) = heading_from_line(trimmed) {
                headings.push(HeadingHint { char_offset: full_text.len() as u32, title: heading });
            }

            full_text.push_str(trimmed);
            full_text.push(' ');
        }

        Ok(ParseResult { full_text, structure_hints: StructureHints { paragraph_breaks, headings } })
    }
}

fn heading_from_line(line: &str) -> Option<String> {
    if let Some(stripped) = line.strip_prefix('#') {
        return Some(stripped.trim_start_matches('#').trim().to_string());
    }
    let upper_chapter = line.to_lowercase();
    if upper_chapter.starts_with("chapter ") {
        return Some(line.to_string());
    }
    None
}

/// Document formats explicitly named in the spec that this crate does not
/// vendor a parser for. The trait boundary is real and exercised by
/// `PlainTextDocumentParser`/tests; wiring in `docx`/`pdf`/`rtf` crates is
/// left to the integration that has a concrete need for them.
pub struct UnsupportedFormatParser {
    pub format: &'static str,
}

impl DocumentParser for UnsupportedFormatParser {
    fn parse(&self, path: &Path) -> Result<ParseResult, PipelineError> {
        Err(PipelineError::InputInvalid {
            source_file: path.display().to_string(),
            location: String::new(),
            message: format!("{} parsing is not implemented by this core; supply a pre-parsed plain text file", self.format),
        })
    }
}
