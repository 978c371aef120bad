pub mod normalize;
pub mod stopwords;

pub use normalize::{is_content_token, normalize_token, NORMALIZATION_VERSION};
pub use stopwords::DEFAULT_STOPWORD_SET_ID;
