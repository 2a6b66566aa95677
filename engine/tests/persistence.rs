use engine::corpus::index_tsv;
use engine::persist::{load_meta, DIRECTORY_FILE, META_FILE, POSTINGS_FILE, SNAPSHOT_FILE};
use engine::{DocumentMeta, FsStorage, IndexBuilder, IndexConfig, IndexError, InvertedIndex, MemStorage, Query, Storage};
use std::fs;
use std::io::Cursor;
use std::sync::Arc;

fn build_fs(dir: &std::path::Path, texts: &[&str], config: IndexConfig) -> InvertedIndex {
    let storage = Arc::new(FsStorage::new(dir));
    let mut builder = IndexBuilder::new(storage.clone(), config).unwrap();
    for (i, text) in texts.iter().enumerate() {
        let meta = DocumentMeta { url: Some(format!("file{i}.html")), popularity: 0.25, num_views: i as u32, ..DocumentMeta::titled(format!("Doc {i}")) };
        builder.add_text(meta, text).unwrap();
    }
    builder.finish().unwrap();
    InvertedIndex::open(storage.as_ref(), config).unwrap()
}

#[test]
fn index_reloads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let texts = ["cat dog", "dog cat cat", "bird"];
    build_fs(dir.path(), &texts, IndexConfig::default().with_partition_size(1));

    // no partition files survive the merge
    let names: Vec<String> = FsStorage::new(dir.path()).list().unwrap();
    assert!(names.iter().all(|n| !n.ends_with(".tmp")), "{names:?}");

    let storage = FsStorage::new(dir.path());
    let index = InvertedIndex::open(&storage, IndexConfig::default()).unwrap();
    assert_eq!(index.num_docs(), 3);
    assert_eq!(index.total_term_frequency(), 6);
    let doc = index.get_doc(2).unwrap();
    assert_eq!(doc.title, "Doc 2");
    assert_eq!(doc.url.as_deref(), Some("file2.html"));
    assert_eq!(doc.num_views, 2);
    assert_eq!(doc.popularity, 0.25);

    let meta = load_meta(&storage).unwrap();
    assert_eq!(meta.num_docs, 3);
    assert_eq!(meta.num_terms, 3);
    assert_eq!(meta.partitions, 3);

    let mut ctx = index.context();
    let hit = ctx.next_matching_document(&Query::parse("\"dog cat\""), None).unwrap();
    assert_eq!(hit.map(|d| d.doc_id), Some(1));
}

#[test]
fn rebuild_replaces_previous_generation() {
    let dir = tempfile::tempdir().unwrap();
    build_fs(dir.path(), &["alpha beta", "gamma"], IndexConfig::default());
    fs::write(dir.path().join("part-00009.tmp"), b"stale").unwrap();
    fs::write(dir.path().join("keep.txt"), b"unrelated").unwrap();

    let index = build_fs(dir.path(), &["delta"], IndexConfig::default());
    assert_eq!(index.num_docs(), 1);
    assert!(!index.has_term("alpha"));
    assert!(!dir.path().join("part-00009.tmp").exists());
    assert!(dir.path().join("keep.txt").exists());
}

#[test]
fn truncated_posting_store_is_reported_as_corruption() {
    let dir = tempfile::tempdir().unwrap();
    build_fs(dir.path(), &["one two three", "two three four"], IndexConfig::default());
    let path = dir.path().join(POSTINGS_FILE);
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 1]).unwrap();

    let storage = FsStorage::new(dir.path());
    let index = InvertedIndex::open(&storage, IndexConfig::default()).unwrap();
    let last = index.terms().last().cloned().unwrap();
    assert!(matches!(index.postings(&last), Err(IndexError::Corrupt { .. })));
    // unknown terms are not errors
    assert_eq!(index.corpus_term_frequency("missing").unwrap(), 0);
}

#[test]
fn missing_snapshot_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    build_fs(dir.path(), &["x"], IndexConfig::default());
    fs::remove_file(dir.path().join(SNAPSHOT_FILE)).unwrap();
    assert!(InvertedIndex::open(&FsStorage::new(dir.path()), IndexConfig::default()).is_err());
    assert!(dir.path().join(META_FILE).exists());
}

#[test]
fn tsv_corpus_indexes_title_and_body() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FsStorage::new(dir.path()));
    let mut builder = IndexBuilder::new(storage.clone(), IndexConfig::default().with_partition_size(2)).unwrap();
    let tsv = "Cats\tcats chase mice\n\nDogs\tdogs chase cats\nBirds\tbirds fly\n";
    assert_eq!(index_tsv(&mut builder, Cursor::new(tsv), "corpus.tsv").unwrap(), 3);
    let summary = builder.finish().unwrap();
    assert_eq!(summary.num_docs, 3);
    assert_eq!(summary.partitions, 2);

    let index = InvertedIndex::open(storage.as_ref(), IndexConfig::default()).unwrap();
    assert_eq!(index.get_doc(1).unwrap().title, "Dogs");
    assert_eq!(index.get_doc(1).unwrap().url.as_deref(), Some("corpus.tsv:3"));
    let mut ctx = index.context();
    let q = Query::parse("chase cats");
    let ids: Vec<u32> = ctx.matching_documents(&q, None, 10).unwrap().iter().map(|d| d.doc_id).collect();
    assert_eq!(ids, vec![0, 1]);
}

#[test]
fn malformed_tsv_row_aborts() {
    let storage = Arc::new(MemStorage::new());
    let mut builder = IndexBuilder::new(storage, IndexConfig::default()).unwrap();
    let err = index_tsv(&mut builder, Cursor::new("ok\tfine\nbroken row\n"), "corpus.tsv").unwrap_err();
    assert!(matches!(err, IndexError::MalformedRow { line: 2 }));
}

#[test]
fn directory_offset_past_the_store_is_corruption() {
    let storage = MemStorage::new();
    let mut builder = IndexBuilder::new(Arc::new(storage.clone()), IndexConfig::default()).unwrap();
    builder.add_text(DocumentMeta::titled("only"), "red green blue").unwrap();
    builder.finish().unwrap();

    let mut directory = storage.read_all(DIRECTORY_FILE).unwrap();
    let n = directory.len();
    directory[n - 8..].copy_from_slice(&(u64::MAX - 1).to_be_bytes());
    storage.write_all(DIRECTORY_FILE, &directory).unwrap();

    let err = InvertedIndex::open(&storage, IndexConfig::default()).err().unwrap();
    assert!(matches!(err, IndexError::Corrupt { .. }), "{err:?}");
}

#[test]
fn empty_corpus_builds_and_reopens() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FsStorage::new(dir.path()));
    let builder = IndexBuilder::new(storage.clone(), IndexConfig::default()).unwrap();
    assert_eq!(builder.num_docs(), 0);
    assert_eq!(builder.total_term_frequency(), 0);
    let summary = builder.finish().unwrap();
    assert_eq!((summary.num_docs, summary.num_terms, summary.partitions), (0, 0, 0));

    let index = InvertedIndex::open(storage.as_ref(), IndexConfig::default()).unwrap();
    assert_eq!(index.num_docs(), 0);
    assert_eq!(index.num_terms(), 0);
    assert!(index.get_doc(0).is_none());
    assert!(index.get_doc_term_map(0).unwrap().is_empty());
    let mut ctx = index.context();
    assert!(ctx.next_matching_document(&Query::parse("anything"), None).unwrap().is_none());
    assert_eq!(load_meta(storage.as_ref()).unwrap().num_docs, 0);
}
