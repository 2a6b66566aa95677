use crate::docstore::DocumentRecord;
use crate::error::{IndexError, Result};
use crate::merge::DIRECTORY_ENTRY;
use crate::partition::is_partition_name;
use crate::storage::Storage;
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::Write;

pub const POSTINGS_FILE: &str = "postings.bin";
pub const DIRECTORY_FILE: &str = "postings.idx";
pub const DOC_TERMS_FILE: &str = "docterms.bin";
pub const SNAPSHOT_FILE: &str = "snapshot.bin";
pub const META_FILE: &str = "meta.json";

const INDEX_FILES: [&str; 5] = [POSTINGS_FILE, DIRECTORY_FILE, DOC_TERMS_FILE, SNAPSHOT_FILE, META_FILE];

const SNAPSHOT_MAGIC: &[u8; 4] = b"IXSN";
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to serve besides the posting and doc-term stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Reverse dictionary: `terms[term_id]`.
    pub terms: Vec<String>,
    pub docs: Vec<DocumentRecord>,
    /// Cumulative end offsets of each document's block in the doc-term store.
    pub doc_term_offsets: Vec<u64>,
    pub total_term_frequency: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub total_term_frequency: u64,
    pub partitions: usize,
    pub created_at: String,
    pub version: u32,
}

pub fn save_snapshot(storage: &dyn Storage, snapshot: &Snapshot) -> Result<()> {
    let mut out = storage.create(SNAPSHOT_FILE)?;
    out.write_all(SNAPSHOT_MAGIC)?;
    out.write_u32::<BigEndian>(SNAPSHOT_VERSION)?;
    bincode::serialize_into(&mut out, snapshot)?;
    out.flush()?;
    Ok(())
}

pub fn load_snapshot(storage: &dyn Storage) -> Result<Snapshot> {
    let bytes = storage.read_all(SNAPSHOT_FILE)?;
    if bytes.len() < 8 || &bytes[..4] != SNAPSHOT_MAGIC {
        return Err(IndexError::UnsupportedSnapshot("missing snapshot header".into()));
    }
    let version = BigEndian::read_u32(&bytes[4..8]);
    if version != SNAPSHOT_VERSION {
        return Err(IndexError::UnsupportedSnapshot(format!(
            "version {version}, expected {SNAPSHOT_VERSION}"
        )));
    }
    let snapshot: Snapshot = bincode::deserialize(&bytes[8..])?;
    if snapshot.docs.len() != snapshot.doc_term_offsets.len() {
        return Err(IndexError::corrupt("snapshot", "document and offset counts differ"));
    }
    if snapshot.docs.iter().enumerate().any(|(i, d)| d.doc_id as usize != i) {
        return Err(IndexError::corrupt("snapshot", "document ids are not sequential"));
    }
    Ok(snapshot)
}

pub fn save_meta(storage: &dyn Storage, meta: &MetaFile) -> Result<()> {
    let json = serde_json::to_string_pretty(meta)?;
    storage.write_all(META_FILE, json.as_bytes())
}

pub fn load_meta(storage: &dyn Storage) -> Result<MetaFile> {
    let bytes = storage.read_all(META_FILE)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Read the posting store's offset directory.
pub fn load_directory(storage: &dyn Storage, num_terms: usize) -> Result<Vec<u64>> {
    let bytes = storage.read_all(DIRECTORY_FILE)?;
    if bytes.len() as u64 != num_terms as u64 * DIRECTORY_ENTRY {
        return Err(IndexError::corrupt(
            "offset directory",
            format!("{} bytes for {num_terms} terms", bytes.len()),
        ));
    }
    let offsets: Vec<u64> = bytes.chunks_exact(DIRECTORY_ENTRY as usize).map(BigEndian::read_u64).collect();
    if offsets.windows(2).any(|w| w[0] >= w[1]) {
        return Err(IndexError::corrupt("offset directory", "offsets are not strictly increasing"));
    }
    Ok(offsets)
}

/// Remove every file of a previous build, finished or not.
pub fn delete_existing(storage: &dyn Storage) -> Result<usize> {
    let mut removed = 0;
    for name in storage.list()? {
        if INDEX_FILES.contains(&name.as_str()) || is_partition_name(&name) {
            storage.delete(&name)?;
            removed += 1;
        }
    }
    if removed > 0 {
        tracing::info!(removed, "removed previous index files");
    }
    Ok(removed)
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStorage;

    fn sample() -> Snapshot {
        Snapshot {
            terms: vec!["cat".into(), "dog".into()],
            docs: vec![DocumentRecord {
                doc_id: 0,
                title: "t".into(),
                url: Some("corpus.tsv:1".into()),
                length: 2,
                popularity: 0.5,
                num_views: 7,
            }],
            doc_term_offsets: vec![8],
            total_term_frequency: 2,
        }
    }

    #[test]
    fn snapshot_reloads() {
        let storage = MemStorage::new();
        save_snapshot(&storage, &sample()).unwrap();
        assert_eq!(load_snapshot(&storage).unwrap(), sample());
    }

    #[test]
    fn snapshot_version_is_checked() {
        let storage = MemStorage::new();
        save_snapshot(&storage, &sample()).unwrap();
        let mut bytes = storage.read_all(SNAPSHOT_FILE).unwrap();
        bytes[7] = 9;
        storage.write_all(SNAPSHOT_FILE, &bytes).unwrap();
        assert!(matches!(load_snapshot(&storage), Err(IndexError::UnsupportedSnapshot(_))));

        storage.write_all(SNAPSHOT_FILE, b"nope").unwrap();
        assert!(matches!(load_snapshot(&storage), Err(IndexError::UnsupportedSnapshot(_))));
    }

    #[test]
    fn cleanup_only_touches_index_files() {
        let storage = MemStorage::new();
        for name in [POSTINGS_FILE, META_FILE, "part-00003.tmp", "notes.txt"] {
            storage.write_all(name, b"x").unwrap();
        }
        assert_eq!(delete_existing(&storage).unwrap(), 3);
        assert_eq!(storage.list().unwrap(), vec!["notes.txt".to_string()]);
    }

    #[test]
    fn directory_width_is_validated() {
        let storage = MemStorage::new();
        storage.write_all(DIRECTORY_FILE, &[0; 12]).unwrap();
        assert!(load_directory(&storage, 2).is_err());
    }
}
