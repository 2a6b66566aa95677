#![allow(dead_code)]

use engine::{DocumentMeta, IndexBuilder, IndexConfig, InvertedIndex, MemStorage};
use std::sync::Arc;

pub fn build(storage: &MemStorage, docs: &[Vec<&str>], config: IndexConfig) -> InvertedIndex {
    let mut builder = IndexBuilder::new(Arc::new(storage.clone()), config).unwrap();
    for (i, tokens) in docs.iter().enumerate() {
        builder.add_document(DocumentMeta::titled(format!("doc {i}")), tokens).unwrap();
    }
    builder.finish().unwrap();
    InvertedIndex::open(storage, config).unwrap()
}

pub fn build_mem(docs: &[Vec<&str>], config: IndexConfig) -> InvertedIndex {
    build(&MemStorage::new(), docs, config)
}

pub fn split(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}
