use crate::config::IndexConfig;
use crate::dictionary::TermDictionary;
use crate::docstore::{DocumentMeta, DocumentStoreWriter};
use crate::error::{IndexError, Result};
use crate::merge::merge_partitions;
use crate::partition::{PartitionWriter, PostingBuffer};
use crate::persist::{self, MetaFile, Snapshot, SNAPSHOT_VERSION};
use crate::storage::Storage;
use crate::tokenizer::tokenize;
use crate::{DocId, TermId};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildSummary {
    pub num_docs: u32,
    pub num_terms: usize,
    pub total_term_frequency: u64,
    pub partitions: usize,
}

/// Single-pass index construction.
///
/// Documents get sequential ids as they are added. Postings accumulate in a
/// buffer that is spilled to a partition every `partition_size` documents;
/// [`IndexBuilder::finish`] merges the partitions and writes the snapshot.
pub struct IndexBuilder {
    storage: Arc<dyn Storage>,
    dictionary: TermDictionary,
    buffer: PostingBuffer,
    partitions: PartitionWriter,
    documents: DocumentStoreWriter,
    total_term_frequency: u64,
}

impl IndexBuilder {
    /// Start a fresh build, removing whatever a previous build left behind.
    pub fn new(storage: Arc<dyn Storage>, config: IndexConfig) -> Result<Self> {
        persist::delete_existing(storage.as_ref())?;
        let documents = DocumentStoreWriter::create(storage.as_ref())?;
        Ok(Self {
            partitions: PartitionWriter::new(storage.clone()),
            storage,
            dictionary: TermDictionary::new(),
            buffer: PostingBuffer::new(config.partition_size),
            documents,
            total_term_frequency: 0,
        })
    }

    pub fn num_docs(&self) -> u32 {
        self.documents.num_docs() as u32
    }

    pub fn total_term_frequency(&self) -> u64 {
        self.total_term_frequency
    }

    /// Index an already tokenized document. Token `i` is at position `i`.
    pub fn add_document<S: AsRef<str>>(&mut self, meta: DocumentMeta, tokens: &[S]) -> Result<DocId> {
        let length = u32::try_from(tokens.len())
            .map_err(|_| IndexError::corrupt("document", format!("{} tokens exceed u32 positions", tokens.len())))?;
        let doc_id = self.documents.append_document(meta, length);
        let mut freqs: BTreeMap<TermId, u32> = BTreeMap::new();
        for (position, token) in tokens.iter().enumerate() {
            let term_id = self.dictionary.intern(token.as_ref());
            self.buffer.add_occurrence(term_id, doc_id, position as u32);
            *freqs.entry(term_id).or_insert(0) += 1;
        }
        self.total_term_frequency += length as u64;
        self.documents.append_term_frequency_block(doc_id, freqs)?;

        self.buffer.document_finished();
        if self.buffer.should_flush() {
            self.partitions.flush(&mut self.buffer)?;
        }
        Ok(doc_id)
    }

    /// Tokenize `text` and index it.
    pub fn add_text(&mut self, meta: DocumentMeta, text: &str) -> Result<DocId> {
        let tokens = tokenize(text);
        self.add_document(meta, &tokens)
    }

    /// Flush, merge and persist everything needed to serve.
    pub fn finish(mut self) -> Result<BuildSummary> {
        if self.buffer.has_postings() {
            self.partitions.flush(&mut self.buffer)?;
        }
        let partitions = self.partitions.partitions();
        merge_partitions(self.storage.as_ref(), &partitions, self.dictionary.len())?;

        let num_terms = self.dictionary.len();
        let (docs, doc_term_offsets) = self.documents.finish()?;
        let num_docs = docs.len() as u32;
        let snapshot = Snapshot {
            terms: self.dictionary.terms().to_vec(),
            docs,
            doc_term_offsets,
            total_term_frequency: self.total_term_frequency,
        };
        persist::save_snapshot(self.storage.as_ref(), &snapshot)?;
        persist::save_meta(
            self.storage.as_ref(),
            &MetaFile {
                num_docs,
                num_terms: num_terms as u32,
                total_term_frequency: self.total_term_frequency,
                partitions: partitions.len(),
                created_at: persist::now_rfc3339(),
                version: SNAPSHOT_VERSION,
            },
        )?;

        let summary = BuildSummary {
            num_docs,
            num_terms,
            total_term_frequency: self.total_term_frequency,
            partitions: partitions.len(),
        };
        tracing::info!(?summary, "index build complete");
        Ok(summary)
    }
}
