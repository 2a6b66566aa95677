//! `title<TAB>body` corpus rows.

use crate::builder::IndexBuilder;
use crate::docstore::DocumentMeta;
use crate::error::{IndexError, Result};
use std::io::BufRead;

/// Split one row. `line` is 1-based and only used for the error.
pub fn parse_tsv_row(row: &str, line: usize) -> Result<(&str, &str)> {
    let row = row.trim_end_matches(['\r', '\n']);
    let (title, rest) = row.split_once('\t').ok_or(IndexError::MalformedRow { line })?;
    // trailing columns are ignored
    let body = rest.split('\t').next().unwrap_or_default();
    Ok((title, body))
}

/// Index every row of a TSV corpus; blank lines are skipped.
///
/// Title and body are indexed as one token stream, title first.
pub fn index_tsv<R: BufRead>(builder: &mut IndexBuilder, reader: R, source: &str) -> Result<usize> {
    let mut indexed = 0;
    for (i, row) in reader.lines().enumerate() {
        let row = row?;
        if row.trim().is_empty() {
            continue;
        }
        let line = i + 1;
        let (title, body) = parse_tsv_row(&row, line)?;
        let meta = DocumentMeta { url: Some(format!("{source}:{line}")), ..DocumentMeta::titled(title) };
        builder.add_text(meta, &format!("{title} {body}"))?;
        indexed += 1;
    }
    Ok(indexed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_split_on_first_tab() {
        assert_eq!(parse_tsv_row("Title\tsome body\textra\n", 1).unwrap(), ("Title", "some body"));
        assert_eq!(parse_tsv_row("Title\t", 1).unwrap(), ("Title", ""));
    }

    #[test]
    fn missing_tab_is_malformed() {
        assert!(matches!(parse_tsv_row("no tab here", 7), Err(IndexError::MalformedRow { line: 7 })));
    }
}
