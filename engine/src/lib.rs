pub mod builder;
pub mod cache;
pub mod config;
pub mod corpus;
pub mod dictionary;
pub mod docstore;
pub mod error;
pub mod evaluator;
pub mod index;
pub mod merge;
pub mod partition;
pub mod persist;
pub mod posting;
pub mod query;
pub mod storage;
pub mod tokenizer;
pub mod varint;

use serde::{Deserialize, Serialize};

pub use builder::{BuildSummary, IndexBuilder};
pub use config::IndexConfig;
pub use docstore::{DocumentMeta, DocumentRecord};
pub use error::{IndexError, Result};
pub use evaluator::QueryContext;
pub use index::InvertedIndex;
pub use posting::PostingList;
pub use query::Query;
pub use storage::{FsStorage, MemStorage, Storage};

pub type TermId = u32;
pub type DocId = u32;

/// One occurrence of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub position: u32,
}
