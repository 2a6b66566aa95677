use crate::config::IndexConfig;
use crate::dictionary::TermDictionary;
use crate::docstore::{DocumentRecord, DocumentStore};
use crate::error::{IndexError, Result};
use crate::evaluator::QueryContext;
use crate::merge::BLOCK_PREFIX;
use crate::persist::{self, DOC_TERMS_FILE, POSTINGS_FILE};
use crate::posting::PostingList;
use crate::storage::{RandomAccess, Storage};
use crate::{DocId, TermId};
use byteorder::{BigEndian, ByteOrder};
use std::collections::HashMap;

/// A loaded, read-only index.
///
/// Immutable once opened and safe to share between threads. Query state
/// lives in the [`QueryContext`]s handed out by [`InvertedIndex::context`].
pub struct InvertedIndex {
    config: IndexConfig,
    dictionary: TermDictionary,
    directory: Vec<u64>,
    postings: Box<dyn RandomAccess>,
    documents: DocumentStore,
    total_term_frequency: u64,
}

impl InvertedIndex {
    pub fn open(storage: &dyn Storage, config: IndexConfig) -> Result<Self> {
        let snapshot = persist::load_snapshot(storage)?;
        let directory = persist::load_directory(storage, snapshot.terms.len())?;
        let postings = storage.open(POSTINGS_FILE)?;
        if directory.last().is_some_and(|&off| off.checked_add(BLOCK_PREFIX).map_or(true, |e| e > postings.len())) {
            return Err(IndexError::corrupt("offset directory", "last block starts past the posting store"));
        }
        let documents = DocumentStore::new(snapshot.docs, snapshot.doc_term_offsets, storage.open(DOC_TERMS_FILE)?)?;
        let index = Self {
            config,
            dictionary: TermDictionary::from_terms(snapshot.terms),
            directory,
            postings,
            documents,
            total_term_frequency: snapshot.total_term_frequency,
        };
        tracing::info!(
            docs = index.num_docs(),
            terms = index.num_terms(),
            total_term_frequency = index.total_term_frequency,
            "index loaded"
        );
        Ok(index)
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Fresh per-query evaluation state.
    pub fn context(&self) -> QueryContext<'_> {
        QueryContext::new(self)
    }

    pub fn num_docs(&self) -> u32 {
        self.documents.len() as u32
    }

    pub fn total_term_frequency(&self) -> u64 {
        self.total_term_frequency
    }

    pub fn num_terms(&self) -> usize {
        self.dictionary.len()
    }

    pub fn has_term(&self, term: &str) -> bool {
        self.dictionary.contains(term)
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.dictionary.lookup(term)
    }

    pub fn terms(&self) -> &[String] {
        self.dictionary.terms()
    }

    pub fn get_doc(&self, doc_id: DocId) -> Option<&DocumentRecord> {
        self.documents.get_doc(doc_id)
    }

    pub fn get_doc_term_map(&self, doc_id: DocId) -> Result<HashMap<String, u32>> {
        self.documents.doc_term_map(doc_id, &self.dictionary)
    }

    /// Read and decode one term's block with a single positioned read.
    pub fn read_posting_list(&self, term_id: TermId) -> Result<PostingList> {
        let t = term_id as usize;
        let Some(&start) = self.directory.get(t) else {
            return Ok(PostingList::default());
        };
        let end = self.directory.get(t + 1).copied().unwrap_or_else(|| self.postings.len());
        if start.checked_add(BLOCK_PREFIX).map_or(true, |min| end < min) {
            return Err(IndexError::corrupt("posting store", format!("block of term {term_id} is truncated")));
        }
        let bytes = self.postings.read_vec(start, (end - start) as usize)?;
        let declared = BigEndian::read_u32(&bytes[..4]) as usize;
        let body = &bytes[BLOCK_PREFIX as usize..];
        if declared != body.len() {
            return Err(IndexError::corrupt(
                "posting store",
                format!("term {term_id} declares {declared} bytes, directory gives {}", body.len()),
            ));
        }
        PostingList::decode(body)
    }

    /// Decoded postings of `term`, or `None` for an unknown term.
    pub fn postings(&self, term: &str) -> Result<Option<PostingList>> {
        self.term_id(term).map(|id| self.read_posting_list(id)).transpose()
    }

    pub fn corpus_doc_frequency_by_term(&self, term: &str) -> Result<u32> {
        Ok(self.postings(term)?.map_or(0, |l| l.doc_frequency()))
    }

    pub fn corpus_term_frequency(&self, term: &str) -> Result<u64> {
        Ok(self.postings(term)?.map_or(0, |l| l.term_frequency()))
    }
}
