use crate::error::Result;
use crate::index::InvertedIndex;
use crate::posting::PostingList;
use crate::TermId;
use std::collections::HashMap;
use std::sync::Arc;

/// Decoded posting lists and cursors for the active query.
///
/// Up to `capacity` distinct query terms stay decoded. Any other term is
/// decoded again on each access, except for the most recent one which is
/// remembered so repeated statistics calls on it stay cheap.
#[derive(Debug)]
pub struct PostingCache {
    capacity: usize,
    resident: HashMap<TermId, Arc<PostingList>>,
    cursors: HashMap<TermId, usize>,
    last_uncached: Option<(TermId, Arc<PostingList>)>,
}

impl PostingCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, resident: HashMap::new(), cursors: HashMap::new(), last_uncached: None }
    }

    /// Reset every cursor and load the lists of a new query's terms.
    pub fn on_new_query(&mut self, index: &InvertedIndex, term_ids: &[TermId]) -> Result<()> {
        self.cursors.clear();
        let mut wanted: Vec<TermId> = Vec::new();
        for &term_id in term_ids {
            if wanted.len() == self.capacity {
                break;
            }
            if !wanted.contains(&term_id) {
                wanted.push(term_id);
            }
        }
        self.resident.retain(|term_id, _| wanted.contains(term_id));
        for term_id in wanted {
            if !self.resident.contains_key(&term_id) {
                let list = match self.last_uncached.take() {
                    Some((id, list)) if id == term_id => list,
                    other => {
                        self.last_uncached = other;
                        Arc::new(index.read_posting_list(term_id)?)
                    }
                };
                self.resident.insert(term_id, list);
            }
        }
        tracing::debug!(terms = term_ids.len(), resident = self.resident.len(), "posting cache loaded");
        Ok(())
    }

    pub fn is_resident(&self, term_id: TermId) -> bool {
        self.resident.contains_key(&term_id)
    }

    pub fn resident_len(&self) -> usize {
        self.resident.len()
    }

    pub fn get(&mut self, index: &InvertedIndex, term_id: TermId) -> Result<Arc<PostingList>> {
        if let Some(list) = self.resident.get(&term_id) {
            return Ok(list.clone());
        }
        if let Some((id, list)) = &self.last_uncached {
            if *id == term_id {
                return Ok(list.clone());
            }
        }
        let list = Arc::new(index.read_posting_list(term_id)?);
        self.last_uncached = Some((term_id, list.clone()));
        Ok(list)
    }

    /// The term's list together with its cursor.
    pub fn list_and_cursor(&mut self, index: &InvertedIndex, term_id: TermId) -> Result<(Arc<PostingList>, &mut usize)> {
        let list = self.get(index, term_id)?;
        Ok((list, self.cursors.entry(term_id).or_insert(0)))
    }
}
