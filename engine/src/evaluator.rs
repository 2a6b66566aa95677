//! Document-at-a-time evaluation of AND and phrase queries.
//!
//! All calls within one query move forward over doc ids, so each term keeps
//! a cursor into its decoded posting list and every lookup resumes from it.
//! "Before the first document" and "before the first position" are `None`.

use crate::cache::PostingCache;
use crate::docstore::DocumentRecord;
use crate::error::Result;
use crate::index::InvertedIndex;
use crate::query::Query;
use crate::{DocId, Posting, TermId};

/// Evaluation state of one query against a shared index.
///
/// Contexts are cheap to create and must not be shared between queries
/// running at the same time; the index itself can be.
pub struct QueryContext<'a> {
    index: &'a InvertedIndex,
    cache: PostingCache,
    active: Vec<String>,
}

/// First doc id (or position) strictly after `after`.
fn first_after(after: Option<u32>) -> u64 {
    after.map_or(0, |a| a as u64 + 1)
}

/// Move `cursor` to the first posting whose doc id is at least `target`.
///
/// Forward moves scan from the cursor; a target behind the cursor falls back
/// to a binary search of the prefix.
fn seek(postings: &[Posting], cursor: &mut usize, target: u64) {
    let mut c = (*cursor).min(postings.len());
    if c > 0 && postings[c - 1].doc_id as u64 >= target {
        *cursor = postings[..c].partition_point(|p| (p.doc_id as u64) < target);
        return;
    }
    while c < postings.len() && (postings[c].doc_id as u64) < target {
        c += 1;
    }
    *cursor = c;
}

impl<'a> QueryContext<'a> {
    pub fn new(index: &'a InvertedIndex) -> Self {
        Self { index, cache: PostingCache::new(index.config().cache_capacity), active: Vec::new() }
    }

    /// Make `terms` the active query, reloading the cache when they change.
    pub fn activate(&mut self, terms: &[&str]) -> Result<()> {
        if self.active.iter().map(String::as_str).eq(terms.iter().copied()) {
            return Ok(());
        }
        let ids: Vec<TermId> = terms.iter().filter_map(|t| self.index.term_id(t)).collect();
        self.cache.on_new_query(self.index, &ids)?;
        self.active = terms.iter().map(|t| t.to_string()).collect();
        Ok(())
    }

    pub fn cache(&self) -> &PostingCache {
        &self.cache
    }

    /// First doc id greater than `after` containing `term`.
    pub fn next(&mut self, term: &str, after: Option<DocId>) -> Result<Option<DocId>> {
        let Some(term_id) = self.index.term_id(term) else {
            return Ok(None);
        };
        let (list, cursor) = self.cache.list_and_cursor(self.index, term_id)?;
        let postings = list.postings();
        match postings.last() {
            Some(last) if Some(last.doc_id) > after => {}
            _ => return Ok(None),
        }
        seek(postings, cursor, first_after(after));
        Ok(postings.get(*cursor).map(|p| p.doc_id))
    }

    /// Smallest doc id greater than `after` that contains every term.
    pub fn next_doc_containing_all<S: AsRef<str>>(&mut self, terms: &[S], after: Option<DocId>) -> Result<Option<DocId>> {
        if terms.is_empty() {
            return Ok(None);
        }
        let mut after = after;
        let mut docs = Vec::with_capacity(terms.len());
        loop {
            docs.clear();
            for term in terms {
                match self.next(term.as_ref(), after)? {
                    Some(doc_id) => docs.push(doc_id),
                    None => return Ok(None),
                }
            }
            let max = docs.iter().copied().max().unwrap_or_default();
            if docs.iter().all(|&d| d == max) {
                return Ok(Some(max));
            }
            // not all equal, so max > after + 1
            after = Some(max - 1);
        }
    }

    /// First position greater than `after` of `term` inside `doc_id`.
    pub fn next_position(&mut self, term: &str, doc_id: DocId, after: Option<u32>) -> Result<Option<u32>> {
        self.position_at_or_after(term, doc_id, first_after(after))
    }

    fn position_at_or_after(&mut self, term: &str, doc_id: DocId, min: u64) -> Result<Option<u32>> {
        let Some(term_id) = self.index.term_id(term) else {
            return Ok(None);
        };
        let (list, cursor) = self.cache.list_and_cursor(self.index, term_id)?;
        if list.max_position().map_or(true, |max| (max as u64) < min) {
            return Ok(None);
        }
        let postings = list.postings();
        seek(postings, cursor, doc_id as u64);
        Ok(postings[*cursor..]
            .iter()
            .take_while(|p| p.doc_id == doc_id)
            .map(|p| p.position)
            .find(|&pos| pos as u64 >= min))
    }

    /// Whether `terms` occur at consecutive positions somewhere in `doc_id`.
    ///
    /// Each round fetches, for term `i`, its first position at or after
    /// `start + i` and turns it back into a candidate start. Equal starts
    /// are a match; otherwise no start below the largest can match, so the
    /// search resumes from there.
    pub fn contains_phrase<S: AsRef<str>>(&mut self, terms: &[S], doc_id: DocId) -> Result<bool> {
        if terms.is_empty() {
            return Ok(true);
        }
        let mut start: u64 = 0;
        let mut starts = Vec::with_capacity(terms.len());
        loop {
            starts.clear();
            for (i, term) in terms.iter().enumerate() {
                let offset = i as u64;
                match self.position_at_or_after(term.as_ref(), doc_id, start + offset)? {
                    Some(pos) => starts.push(pos as u64 - offset),
                    None => return Ok(false),
                }
            }
            let max = starts.iter().copied().max().unwrap_or(start);
            if starts.iter().all(|&s| s == max) {
                return Ok(true);
            }
            start = max;
        }
    }

    /// Next document after `after` matching every term and phrase of `query`.
    pub fn next_matching_document(&mut self, query: &Query, after: Option<DocId>) -> Result<Option<&'a DocumentRecord>> {
        let terms = query.terms();
        self.activate(&terms)?;
        let mut after = after;
        'candidates: loop {
            let Some(candidate) = self.next_doc_containing_all(&terms, after)? else {
                return Ok(None);
            };
            for phrase in query.phrases() {
                if !self.contains_phrase(phrase, candidate)? {
                    after = Some(candidate);
                    continue 'candidates;
                }
            }
            return Ok(self.index.get_doc(candidate));
        }
    }

    /// Up to `limit` matching documents after `after`, in doc id order.
    pub fn matching_documents(&mut self, query: &Query, after: Option<DocId>, limit: usize) -> Result<Vec<&'a DocumentRecord>> {
        let mut out = Vec::new();
        let mut after = after;
        while out.len() < limit {
            match self.next_matching_document(query, after)? {
                Some(doc) => {
                    after = Some(doc.doc_id);
                    out.push(doc);
                }
                None => break,
            }
        }
        Ok(out)
    }

    /// Number of documents containing `term`.
    pub fn corpus_doc_frequency_by_term(&mut self, term: &str) -> Result<u32> {
        match self.index.term_id(term) {
            Some(term_id) => Ok(self.cache.get(self.index, term_id)?.doc_frequency()),
            None => Ok(0),
        }
    }

    /// Number of occurrences of `term` in the corpus.
    pub fn corpus_term_frequency(&mut self, term: &str) -> Result<u64> {
        match self.index.term_id(term) {
            Some(term_id) => Ok(self.cache.get(self.index, term_id)?.term_frequency()),
            None => Ok(0),
        }
    }

    /// Occurrences of `term` in `doc_id`.
    pub fn document_term_frequency(&mut self, term: &str, doc_id: DocId) -> Result<u32> {
        let Some(term_id) = self.index.term_id(term) else {
            return Ok(0);
        };
        let (list, cursor) = self.cache.list_and_cursor(self.index, term_id)?;
        let postings = list.postings();
        seek(postings, cursor, doc_id as u64);
        Ok(postings[*cursor..].iter().take_while(|p| p.doc_id == doc_id).count() as u32)
    }

    pub fn has_term(&self, term: &str) -> bool {
        self.index.has_term(term)
    }
}
