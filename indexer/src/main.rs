mod extract;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use engine::corpus::index_tsv;
use engine::persist::load_meta;
use engine::{DocumentMeta, FsStorage, IndexBuilder, IndexConfig, InvertedIndex, Query};
use serde::de::DeserializeOwned;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const TSV_CORPUS: &str = "corpus.tsv";

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and inspect a compressed positional inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a directory of documents or a corpus.tsv file
    Build {
        /// Input path (directory or .tsv file)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Documents per in-memory partition before spilling to disk
        #[arg(long, default_value_t = engine::config::DEFAULT_PARTITION_SIZE)]
        partition_size: usize,
        /// JSON object mapping file names to a popularity score
        #[arg(long)]
        pagerank: Option<PathBuf>,
        /// JSON object mapping file names to a view count
        #[arg(long)]
        numviews: Option<PathBuf>,
    },
    /// Print the summary written at build time
    Inspect {
        #[arg(long)]
        index: String,
    },
    /// List documents matching a query, with per-term statistics
    Search {
        #[arg(long)]
        index: String,
        #[arg(long)]
        q: String,
        #[arg(long, default_value_t = 10)]
        k: usize,
        /// Posting lists kept resident per query
        #[arg(long, default_value_t = engine::config::DEFAULT_CACHE_CAPACITY)]
        cache_capacity: usize,
    },
}

#[derive(Debug, Default)]
struct Signals {
    popularity: HashMap<String, f32>,
    views: HashMap<String, u32>,
}

impl Signals {
    fn meta_for(&self, file_name: &str, title: String, url: String) -> DocumentMeta {
        DocumentMeta {
            title,
            url: Some(url),
            popularity: self.popularity.get(file_name).copied().unwrap_or(0.0),
            num_views: self.views.get(file_name).copied().unwrap_or(0),
        }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, partition_size, pagerank, numviews } => {
            let signals = Signals {
                popularity: load_signal(pagerank.as_deref())?,
                views: load_signal(numviews.as_deref())?,
            };
            let config = IndexConfig::default().with_partition_size(partition_size);
            build_index(Path::new(&input), Path::new(&output), config, &signals)
        }
        Commands::Inspect { index } => {
            let meta = load_meta(&FsStorage::new(&index))?;
            println!("{}", serde_json::to_string_pretty(&meta)?);
            Ok(())
        }
        Commands::Search { index, q, k, cache_capacity } => {
            search(&index, &q, k, IndexConfig::default().with_cache_capacity(cache_capacity))
        }
    }
}

fn load_signal<T: DeserializeOwned>(path: Option<&Path>) -> Result<HashMap<String, T>> {
    let Some(path) = path else { return Ok(HashMap::new()) };
    let f = File::open(path).with_context(|| format!("opening signal file {}", path.display()))?;
    let map = serde_json::from_reader(BufReader::new(f))?;
    Ok(map)
}

fn build_index(input: &Path, output: &Path, config: IndexConfig, signals: &Signals) -> Result<()> {
    let storage = Arc::new(FsStorage::new(output));
    let mut builder = IndexBuilder::new(storage, config)?;

    if let Some(tsv) = tsv_corpus(input)? {
        tracing::info!(corpus = %tsv.display(), "indexing tab-separated corpus");
        let reader = BufReader::new(File::open(&tsv)?);
        index_tsv(&mut builder, reader, &tsv.display().to_string())?;
    } else if input.is_dir() {
        tracing::info!(corpus = %input.display(), "indexing document directory");
        for path in document_files(input)? {
            index_file(&mut builder, &path, signals)?;
        }
    } else {
        bail!("corpus {} is neither a directory nor a .tsv file", input.display());
    }

    let summary = builder.finish()?;
    tracing::info!(
        docs = summary.num_docs,
        terms = summary.num_terms,
        total_term_frequency = summary.total_term_frequency,
        output = %output.display(),
        "index build complete"
    );
    Ok(())
}

/// A `.tsv` file, or a directory holding nothing but `corpus.tsv`.
fn tsv_corpus(input: &Path) -> Result<Option<PathBuf>> {
    if input.is_file() {
        let is_tsv = input.extension().and_then(|s| s.to_str()) == Some("tsv");
        return Ok(is_tsv.then(|| input.to_path_buf()));
    }
    if input.is_dir() {
        let entries: Vec<PathBuf> = fs::read_dir(input)?.map(|e| e.map(|e| e.path())).collect::<Result<_, _>>()?;
        if let [only] = entries.as_slice() {
            if only.file_name().and_then(|s| s.to_str()) == Some(TSV_CORPUS) {
                return Ok(Some(only.clone()));
            }
        }
    }
    Ok(None)
}

/// Regular files under `dir`, in a stable order so doc ids are reproducible.
fn document_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn index_file(builder: &mut IndexBuilder, path: &Path, signals: &Signals) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let raw = String::from_utf8_lossy(&bytes);
    let file_name = path.file_name().and_then(|s| s.to_str()).unwrap_or_default().to_string();
    let (title, text) = if extract::is_html(path) {
        let page = extract::extract_html(&raw);
        (page.title, page.text)
    } else {
        (String::new(), raw.into_owned())
    };
    let title = if title.is_empty() { file_name.clone() } else { title };
    let url = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()).display().to_string();
    let doc_id = builder.add_text(signals.meta_for(&file_name, title, url), &text)?;
    tracing::debug!(doc_id, file = %path.display(), "indexed document");
    Ok(())
}

fn search(index_dir: &str, q: &str, k: usize, config: IndexConfig) -> Result<()> {
    let storage = FsStorage::new(index_dir);
    let index = InvertedIndex::open(&storage, config)?;
    let query = Query::parse(q);
    let mut ctx = index.context();
    for term in query.terms() {
        println!(
            "{term}: df={} cf={}",
            ctx.corpus_doc_frequency_by_term(term)?,
            ctx.corpus_term_frequency(term)?
        );
    }
    for doc in ctx.matching_documents(&query, None, k)? {
        println!("{}\t{}\t{}", doc.doc_id, doc.title, doc.url.as_deref().unwrap_or(""));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_html_directory_with_signals() {
        let corpus = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(corpus.path().join("a.html"), "<title>Alpha</title><body>red fox</body>").unwrap();
        fs::write(corpus.path().join("b.txt"), "red hen").unwrap();
        let signals = Signals {
            popularity: HashMap::from([("a.html".to_string(), 0.5)]),
            views: HashMap::from([("b.txt".to_string(), 12)]),
        };
        build_index(corpus.path(), out.path(), IndexConfig::default().with_partition_size(1), &signals).unwrap();

        let index = InvertedIndex::open(&FsStorage::new(out.path()), IndexConfig::default()).unwrap();
        assert_eq!(index.num_docs(), 2);
        let a = index.get_doc(0).unwrap();
        assert_eq!(a.title, "Alpha");
        assert_eq!(a.popularity, 0.5);
        let b = index.get_doc(1).unwrap();
        assert_eq!(b.title, "b.txt");
        assert_eq!(b.num_views, 12);
        assert_eq!(index.corpus_doc_frequency_by_term("red").unwrap(), 2);
    }

    #[test]
    fn search_accepts_cache_capacity() {
        let cli = Cli::try_parse_from(["indexer", "search", "--index", "idx", "--q", "cat", "--cache-capacity", "3"]).unwrap();
        match cli.command {
            Commands::Search { cache_capacity, k, .. } => {
                assert_eq!(cache_capacity, 3);
                assert_eq!(k, 10);
            }
            _ => panic!("expected search"),
        }
        let cli = Cli::try_parse_from(["indexer", "search", "--index", "idx", "--q", "cat"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Search { cache_capacity: engine::config::DEFAULT_CACHE_CAPACITY, .. }
        ));
    }

    #[test]
    fn search_runs_with_a_tiny_cache() {
        let corpus = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(corpus.path().join("a.txt"), "red fox red hen").unwrap();
        build_index(corpus.path(), out.path(), IndexConfig::default(), &Signals::default()).unwrap();
        let dir = out.path().to_string_lossy().to_string();
        search(&dir, "red \"red hen\" fox", 5, IndexConfig::default().with_cache_capacity(1)).unwrap();
    }

    #[test]
    fn single_tsv_in_directory_is_tsv_mode() {
        let corpus = tempfile::tempdir().unwrap();
        fs::write(corpus.path().join(TSV_CORPUS), "T\tbody\n").unwrap();
        assert!(tsv_corpus(corpus.path()).unwrap().is_some());
        fs::write(corpus.path().join("other.html"), "x").unwrap();
        assert!(tsv_corpus(corpus.path()).unwrap().is_none());
    }

    #[test]
    fn malformed_tsv_fails_the_build() {
        let corpus = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let tsv = corpus.path().join("rows.tsv");
        fs::write(&tsv, "no tab\n").unwrap();
        assert!(build_index(&tsv, out.path(), IndexConfig::default(), &Signals::default()).is_err());
    }
}
