use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Normalize text into the token sequence that gets indexed.
///
/// NFKC normalization, lowercase, English stemming. Stopwords are kept so
/// that token positions stay dense and phrases can be matched exactly; the
/// position of a token is its index in the returned vector.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        .map(|m| STEMMER.stem(m.as_str().trim_end_matches('\'')).into_owned())
        .filter(|t| !t.is_empty())
        .collect()
}
