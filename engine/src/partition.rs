//! In-memory posting accumulation and the partition files it spills to.
//!
//! A partition is a run of `(term_id: u32 BE, byte_len: u32 BE, bytes)`
//! records in ascending term id order, where `bytes` are varint
//! `(doc_id, position)` pairs.

use crate::error::{IndexError, Result};
use crate::storage::{RandomAccess, Storage};
use crate::varint;
use crate::{DocId, Posting, TermId};
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

const RECORD_HEADER: usize = 8;
const PARTITION_PREFIX: &str = "part-";
const PARTITION_SUFFIX: &str = ".tmp";

pub fn partition_name(n: usize) -> String {
    format!("{PARTITION_PREFIX}{n:05}{PARTITION_SUFFIX}")
}

pub fn is_partition_name(name: &str) -> bool {
    name.starts_with(PARTITION_PREFIX) && name.ends_with(PARTITION_SUFFIX)
}

/// Postings for the documents ingested since the last flush.
#[derive(Debug)]
pub struct PostingBuffer {
    lists: HashMap<TermId, Vec<Posting>>,
    docs_since_flush: usize,
    partition_size: usize,
}

impl PostingBuffer {
    pub fn new(partition_size: usize) -> Self {
        Self { lists: HashMap::new(), docs_since_flush: 0, partition_size: partition_size.max(1) }
    }

    pub fn add_occurrence(&mut self, term_id: TermId, doc_id: DocId, position: u32) {
        self.lists.entry(term_id).or_default().push(Posting { doc_id, position });
    }

    pub fn document_finished(&mut self) {
        self.docs_since_flush += 1;
    }

    pub fn should_flush(&self) -> bool {
        self.docs_since_flush >= self.partition_size
    }

    pub fn has_postings(&self) -> bool {
        !self.lists.is_empty()
    }

    pub fn docs_since_flush(&self) -> usize {
        self.docs_since_flush
    }

    /// Drain the buffer, ordered by term id.
    pub fn take(&mut self) -> Vec<(TermId, Vec<Posting>)> {
        self.docs_since_flush = 0;
        let mut lists: Vec<_> = self.lists.drain().collect();
        lists.sort_unstable_by_key(|(term_id, _)| *term_id);
        lists
    }
}

pub fn encode_postings(postings: &[Posting], out: &mut Vec<u8>) {
    varint::encode_pairs(postings.iter().map(|p| (p.doc_id, p.position)), out);
}

/// Spills full buffers to numbered partition files.
pub struct PartitionWriter {
    storage: Arc<dyn Storage>,
    written: usize,
}

impl PartitionWriter {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage, written: 0 }
    }

    /// Write the buffer out and reset it. Returns the partition name, or
    /// `None` when the buffered documents produced no postings.
    pub fn flush(&mut self, buffer: &mut PostingBuffer) -> Result<Option<String>> {
        let docs = buffer.docs_since_flush();
        let lists = buffer.take();
        if lists.is_empty() {
            return Ok(None);
        }
        let name = partition_name(self.written);
        let mut out = self.storage.create(&name)?;
        let mut bytes = Vec::new();
        for (term_id, postings) in &lists {
            bytes.clear();
            encode_postings(postings, &mut bytes);
            let len = u32::try_from(bytes.len())
                .map_err(|_| IndexError::corrupt("partition", format!("term {term_id} block exceeds 4 GiB")))?;
            out.write_u32::<BigEndian>(*term_id)?;
            out.write_u32::<BigEndian>(len)?;
            out.write_all(&bytes)?;
        }
        out.flush()?;
        self.written += 1;
        tracing::debug!(partition = %name, docs, terms = lists.len(), "flushed partition");
        Ok(Some(name))
    }

    pub fn partitions(&self) -> Vec<String> {
        (0..self.written).map(partition_name).collect()
    }
}

/// Forward reader over one partition file.
pub struct PartitionReader {
    file: Box<dyn RandomAccess>,
    pos: u64,
    current: Option<(TermId, u32)>,
}

impl PartitionReader {
    pub fn open(storage: &dyn Storage, name: &str) -> Result<Self> {
        let file = storage.open(name)?;
        let mut reader = Self { file, pos: 0, current: None };
        reader.read_header(None)?;
        Ok(reader)
    }

    /// Term id of the record the reader is positioned at.
    pub fn current_term(&self) -> Option<TermId> {
        self.current.map(|(term_id, _)| term_id)
    }

    /// Return the current record's bytes and move to the next record.
    pub fn take_block(&mut self) -> Result<Vec<u8>> {
        let Some((term_id, len)) = self.current else {
            return Err(IndexError::corrupt("partition", "read past last record"));
        };
        let block = self.file.read_vec(self.pos, len as usize)?;
        self.pos += len as u64;
        self.read_header(Some(term_id))?;
        Ok(block)
    }

    fn read_header(&mut self, previous: Option<TermId>) -> Result<()> {
        if self.pos == self.file.len() {
            self.current = None;
            return Ok(());
        }
        let header = self.file.read_vec(self.pos, RECORD_HEADER)?;
        let term_id = BigEndian::read_u32(&header[..4]);
        let len = BigEndian::read_u32(&header[4..]);
        if previous.is_some_and(|prev| term_id <= prev) {
            return Err(IndexError::corrupt(
                "partition",
                format!("term {term_id} follows term {}", previous.unwrap_or_default()),
            ));
        }
        self.pos += RECORD_HEADER as u64;
        self.current = Some((term_id, len));
        Ok(())
    }
}
