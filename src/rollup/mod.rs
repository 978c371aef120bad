pub mod hydrator;
pub mod types;

pub use hydrator::{build_transcript_index, hydrate, SENTENCE_FLAG_THRESHOLD};
pub use types::{
    AlignStatus, AsrRange, HydratedParagraph, HydratedSentence, HydratedTranscript, HydratedWord, ParagraphAlign,
    ParagraphMetrics, SentenceAlign, SentenceMetrics, TranscriptIndex, WordAlign,
};
