pub mod document;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod licenses;
pub mod normalize;
pub mod persist;
pub mod store;

pub use document::{Document, DocumentSummary};
pub use engine::SearchEngine;
pub use error::SearchError;
pub use fusion::{FusionWeights, Lemmatizer, SearchContext, SearchFilters, SearchPage};
pub use licenses::LicenseCategory;
pub use store::{CorpusStatistics, DocumentStore};
