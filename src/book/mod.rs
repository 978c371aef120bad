pub mod index;
pub mod parser;
pub mod types;

pub use index::{build_book_index, BookIndexConfig};
pub use parser::{DocumentParser, ParseResult, PlainTextDocumentParser, StructureHints, UnsupportedFormatParser};
pub use types::{BookIndex, BookParagraph, BookSection, BookSentence, BookTotals, BookWord, WordRange};
