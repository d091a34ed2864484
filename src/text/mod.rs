//! Text primitives shared by every scorer.
//!
//! - `normalize`: canonical form used for substring checks and tokenization
//! - `labels`: loose taxonomy label compatibility
//! - `similarity`: containment, token-F1 and Jaccard span scorers

pub mod labels;
pub mod normalize;
pub mod similarity;

pub use labels::labels_compatible;
pub use normalize::{normalize, tokenize};
pub use similarity::{containment, is_stopword, jaccard, token_f1, SimilarityKind, STOPWORDS};
