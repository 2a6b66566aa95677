use crate::error::{IndexError, Result};
use crate::partition::PartitionReader;
use crate::persist::{DIRECTORY_FILE, POSTINGS_FILE};
use crate::storage::Storage;
use crate::TermId;
use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;

/// Size of the length prefix in front of every posting block.
pub const BLOCK_PREFIX: u64 = 4;
/// Width of one offset directory entry.
pub const DIRECTORY_ENTRY: u64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub terms: usize,
    pub partitions: usize,
    pub bytes: u64,
}

/// Merge partitions into the posting store and its offset directory, then
/// delete the partitions.
///
/// Partitions must be given in flush order. Each term's blocks are
/// concatenated in that order, which keeps doc ids ascending without
/// decoding anything.
pub fn merge_partitions(storage: &dyn Storage, partitions: &[String], num_terms: usize) -> Result<MergeSummary> {
    let mut readers = partitions
        .iter()
        .map(|name| PartitionReader::open(storage, name))
        .collect::<Result<Vec<_>>>()?;

    let mut store = storage.create(POSTINGS_FILE)?;
    let mut directory = storage.create(DIRECTORY_FILE)?;
    let mut offset: u64 = 0;
    let mut block = Vec::new();

    for term_id in 0..num_terms as TermId {
        block.clear();
        for reader in readers.iter_mut() {
            if reader.current_term() == Some(term_id) {
                block.extend_from_slice(&reader.take_block()?);
            }
        }
        let len = u32::try_from(block.len())
            .map_err(|_| IndexError::corrupt("posting store", format!("term {term_id} block exceeds 4 GiB")))?;
        directory.write_u64::<BigEndian>(offset)?;
        store.write_u32::<BigEndian>(len)?;
        store.write_all(&block)?;
        offset += BLOCK_PREFIX + len as u64;
    }

    for (name, reader) in partitions.iter().zip(&readers) {
        if let Some(term_id) = reader.current_term() {
            return Err(IndexError::corrupt(
                "partition",
                format!("{name} holds term {term_id} beyond dictionary of {num_terms}"),
            ));
        }
    }
    store.flush()?;
    directory.flush()?;
    drop(readers);

    for name in partitions {
        storage.delete(name)?;
    }
    tracing::info!(terms = num_terms, partitions = partitions.len(), bytes = offset, "merged partitions");
    Ok(MergeSummary { terms: num_terms, partitions: partitions.len(), bytes: offset })
}
