//! Document records and per-document term frequency blocks.

use crate::dictionary::TermDictionary;
use crate::error::{IndexError, Result};
use crate::merge::BLOCK_PREFIX;
use crate::persist::DOC_TERMS_FILE;
use crate::storage::{RandomAccess, Storage};
use crate::varint;
use crate::{DocId, TermId};
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub doc_id: DocId,
    pub title: String,
    /// Where the document came from (file path or corpus row).
    pub url: Option<String>,
    /// Number of tokens indexed for the document.
    pub length: u32,
    pub popularity: f32,
    pub num_views: u32,
}

/// Caller-supplied part of a document record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMeta {
    pub title: String,
    pub url: Option<String>,
    pub popularity: f32,
    pub num_views: u32,
}

impl DocumentMeta {
    pub fn titled(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Self::default() }
    }
}

/// Construction side: assigns doc ids and streams term frequency blocks.
pub struct DocumentStoreWriter {
    docs: Vec<DocumentRecord>,
    out: Box<dyn Write + Send>,
    offsets: Vec<u64>,
    written: u64,
    scratch: Vec<u8>,
}

impl DocumentStoreWriter {
    pub fn create(storage: &dyn Storage) -> Result<Self> {
        Ok(Self {
            docs: Vec::new(),
            out: storage.create(DOC_TERMS_FILE)?,
            offsets: Vec::new(),
            written: 0,
            scratch: Vec::new(),
        })
    }

    pub fn append_document(&mut self, meta: DocumentMeta, length: u32) -> DocId {
        let doc_id = self.docs.len() as DocId;
        self.docs.push(DocumentRecord {
            doc_id,
            title: meta.title,
            url: meta.url,
            length,
            popularity: meta.popularity,
            num_views: meta.num_views,
        });
        doc_id
    }

    /// Blocks must be appended in doc id order, one per document.
    pub fn append_term_frequency_block(
        &mut self,
        doc_id: DocId,
        term_freqs: impl IntoIterator<Item = (TermId, u32)>,
    ) -> Result<()> {
        if doc_id as usize != self.offsets.len() {
            return Err(IndexError::corrupt(
                "doc-term store",
                format!("block for doc {doc_id} appended after {} blocks", self.offsets.len()),
            ));
        }
        self.scratch.clear();
        varint::encode_pairs(term_freqs, &mut self.scratch);
        let len = u32::try_from(self.scratch.len())
            .map_err(|_| IndexError::corrupt("doc-term store", format!("doc {doc_id} block exceeds 4 GiB")))?;
        self.out.write_u32::<BigEndian>(len)?;
        self.out.write_all(&self.scratch)?;
        self.written += BLOCK_PREFIX + self.scratch.len() as u64;
        self.offsets.push(self.written);
        Ok(())
    }

    pub fn num_docs(&self) -> usize {
        self.docs.len()
    }

    /// Flush the block store; returns the records and cumulative offsets.
    pub fn finish(mut self) -> Result<(Vec<DocumentRecord>, Vec<u64>)> {
        self.out.flush()?;
        Ok((self.docs, self.offsets))
    }
}

/// Serving side: records in memory, term frequency blocks read on demand.
pub struct DocumentStore {
    docs: Vec<DocumentRecord>,
    offsets: Vec<u64>,
    blocks: Box<dyn RandomAccess>,
}

impl DocumentStore {
    pub fn new(docs: Vec<DocumentRecord>, offsets: Vec<u64>, blocks: Box<dyn RandomAccess>) -> Result<Self> {
        if docs.len() != offsets.len() {
            return Err(IndexError::corrupt(
                "doc-term offsets",
                format!("{} offsets for {} documents", offsets.len(), docs.len()),
            ));
        }
        if offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(IndexError::corrupt("doc-term offsets", "offsets decrease"));
        }
        if offsets.last().is_some_and(|&end| end > blocks.len()) {
            return Err(IndexError::corrupt("doc-term offsets", "offsets run past the block store"));
        }
        Ok(Self { docs, offsets, blocks })
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get_doc(&self, doc_id: DocId) -> Option<&DocumentRecord> {
        self.docs.get(doc_id as usize)
    }

    /// `(term_id, frequency)` pairs of one document, empty when out of range.
    pub fn term_frequencies(&self, doc_id: DocId) -> Result<Vec<(TermId, u32)>> {
        let d = doc_id as usize;
        let Some(&end) = self.offsets.get(d) else {
            return Ok(Vec::new());
        };
        let start = if d == 0 { 0 } else { self.offsets[d - 1] };
        let bytes = self.blocks.read_vec(start, (end - start) as usize)?;
        if bytes.len() < BLOCK_PREFIX as usize {
            return Err(IndexError::corrupt("doc-term store", format!("doc {doc_id} block shorter than its prefix")));
        }
        let declared = BigEndian::read_u32(&bytes[..4]) as usize;
        let body = &bytes[BLOCK_PREFIX as usize..];
        if declared != body.len() {
            return Err(IndexError::corrupt(
                "doc-term store",
                format!("doc {doc_id} declares {declared} bytes, offsets give {}", body.len()),
            ));
        }
        varint::decode_pairs(body, "doc-term store")
    }

    pub fn doc_term_map(&self, doc_id: DocId, dictionary: &TermDictionary) -> Result<HashMap<String, u32>> {
        self.term_frequencies(doc_id)?
            .into_iter()
            .map(|(term_id, freq)| {
                dictionary
                    .resolve(term_id)
                    .map(|term| (term.to_string(), freq))
                    .ok_or_else(|| IndexError::corrupt("doc-term store", format!("unknown term id {term_id}")))
            })
            .collect()
    }
}
