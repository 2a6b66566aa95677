use crate::error::{IndexError, Result};
use crate::varint::Decoder;
use crate::Posting;

/// A decoded posting list: every occurrence of one term, ordered by doc id
/// and then by position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    postings: Vec<Posting>,
    max_position: Option<u32>,
}

impl PostingList {
    /// Decode a posting block body, checking the ordering invariants.
    pub fn decode(block: &[u8]) -> Result<Self> {
        let mut decoder = Decoder::new(block);
        let mut postings: Vec<Posting> = Vec::new();
        let mut max_position = None;
        while let Some(doc_id) = decoder.next_u32()? {
            let position = decoder
                .next_u32()?
                .ok_or_else(|| IndexError::corrupt("posting list", "doc id without a position"))?;
            if let Some(prev) = postings.last() {
                let ordered = prev.doc_id < doc_id || (prev.doc_id == doc_id && prev.position < position);
                if !ordered {
                    return Err(IndexError::corrupt(
                        "posting list",
                        format!("({doc_id}, {position}) follows ({}, {})", prev.doc_id, prev.position),
                    ));
                }
            }
            max_position = max_position.max(Some(position));
            postings.push(Posting { doc_id, position });
        }
        Ok(Self { postings, max_position })
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Largest position recorded in any document.
    pub fn max_position(&self) -> Option<u32> {
        self.max_position
    }

    /// Number of distinct documents.
    pub fn doc_frequency(&self) -> u32 {
        let mut count = 0;
        let mut last = None;
        for p in &self.postings {
            if last != Some(p.doc_id) {
                count += 1;
                last = Some(p.doc_id);
            }
        }
        count
    }

    /// Number of occurrences across the corpus.
    pub fn term_frequency(&self) -> u64 {
        self.postings.len() as u64
    }

    /// `[doc, pos, doc, pos, ...]`
    pub fn to_flat(&self) -> Vec<u32> {
        self.postings.iter().flat_map(|p| [p.doc_id, p.position]).collect()
    }
}
