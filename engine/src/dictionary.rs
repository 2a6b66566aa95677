use crate::TermId;
use std::collections::HashMap;

/// Term strings to dense ids, assigned in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct TermDictionary {
    ids: HashMap<String, TermId>,
    terms: Vec<String>,
}

impl TermDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the forward map from a persisted reverse list.
    pub fn from_terms(terms: Vec<String>) -> Self {
        let ids = terms.iter().enumerate().map(|(id, t)| (t.clone(), id as TermId)).collect();
        Self { ids, terms }
    }

    pub fn intern(&mut self, term: &str) -> TermId {
        if let Some(&id) = self.ids.get(term) {
            return id;
        }
        let id = self.terms.len() as TermId;
        self.ids.insert(term.to_string(), id);
        self.terms.push(term.to_string());
        id
    }

    pub fn lookup(&self, term: &str) -> Option<TermId> {
        self.ids.get(term).copied()
    }

    pub fn resolve(&self, id: TermId) -> Option<&str> {
        self.terms.get(id as usize).map(String::as_str)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.ids.contains_key(term)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms ordered by id.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}
