use crate::tokenizer::tokenize;

/// A conjunctive query: every group must match, and groups of more than one
/// token must also appear as a phrase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    groups: Vec<Vec<String>>,
}

impl Query {
    pub fn new(groups: Vec<Vec<String>>) -> Self {
        Self { groups: groups.into_iter().filter(|g| !g.is_empty()).collect() }
    }

    /// Quoted spans become phrases; everything else is single terms.
    ///
    /// `new "new york" cat` is the terms `new`, `cat` and the phrase
    /// `new york`. Tokens go through the same tokenizer as documents.
    pub fn parse(text: &str) -> Self {
        let mut groups = Vec::new();
        for (i, span) in text.split('"').enumerate() {
            let tokens = tokenize(span);
            if i % 2 == 1 {
                groups.push(tokens);
            } else {
                groups.extend(tokens.into_iter().map(|t| vec![t]));
            }
        }
        Self::new(groups)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Distinct tokens across all groups, in order of first appearance.
    pub fn terms(&self) -> Vec<&str> {
        let mut terms: Vec<&str> = Vec::new();
        for token in self.groups.iter().flatten() {
            if !terms.contains(&token.as_str()) {
                terms.push(token);
            }
        }
        terms
    }

    /// Groups that need positional verification.
    pub fn phrases(&self) -> impl Iterator<Item = &[String]> {
        self.groups.iter().filter(|g| g.len() > 1).map(Vec::as_slice)
    }
}
