//! Named-file storage used by the builder and by a loaded index.
//!
//! Every persisted structure goes through [`Storage`], so tests can run the
//! whole pipeline against [`MemStorage`] and production uses [`FsStorage`].

use crate::error::{IndexError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A read-only file that supports positioned reads.
pub trait RandomAccess: Send + Sync {
    fn len(&self) -> u64;

    /// Fill `buf` from `offset`. Callers stay within `len()`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bounds-checked read of exactly `len` bytes.
    fn read_vec(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let end = offset.checked_add(len as u64);
        if end.map_or(true, |end| end > self.len()) {
            return Err(IndexError::corrupt(
                "file range",
                format!("{len} bytes at {offset} past end of {}-byte file", self.len()),
            ));
        }
        let mut buf = vec![0u8; len];
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }
}

pub trait Storage: Send + Sync {
    /// Create (or truncate) `name` for writing. Call `flush` before dropping.
    fn create(&self, name: &str) -> Result<Box<dyn Write + Send>>;

    fn open(&self, name: &str) -> Result<Box<dyn RandomAccess>>;

    fn exists(&self, name: &str) -> bool;

    fn delete(&self, name: &str) -> Result<()>;

    fn list(&self) -> Result<Vec<String>>;

    fn read_all(&self, name: &str) -> Result<Vec<u8>> {
        let file = self.open(name)?;
        file.read_vec(0, file.len() as usize)
    }

    fn write_all(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut w = self.create(name)?;
        w.write_all(bytes)?;
        w.flush()?;
        Ok(())
    }
}

/// Files under one directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

struct FsCursor {
    reader: BufReader<File>,
    pos: u64,
}

struct FsFile {
    cursor: Mutex<FsCursor>,
    len: u64,
}

impl RandomAccess for FsFile {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut cursor = self.cursor.lock();
        // seeking drops the read buffer, so only seek on a jump
        if cursor.pos != offset {
            cursor.reader.seek(SeekFrom::Start(offset))?;
        }
        if let Err(e) = cursor.reader.read_exact(buf) {
            // position is unknown after a failed read
            cursor.pos = u64::MAX;
            return Err(e.into());
        }
        cursor.pos = offset + buf.len() as u64;
        Ok(())
    }
}

impl Storage for FsStorage {
    fn create(&self, name: &str) -> Result<Box<dyn Write + Send>> {
        fs::create_dir_all(&self.root)?;
        let f = File::create(self.path(name))?;
        Ok(Box::new(BufWriter::new(f)))
    }

    fn open(&self, name: &str) -> Result<Box<dyn RandomAccess>> {
        let f = File::open(self.path(name))?;
        let len = f.metadata()?.len();
        Ok(Box::new(FsFile { cursor: Mutex::new(FsCursor { reader: BufReader::new(f), pos: 0 }), len }))
    }

    fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn delete(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

type MemFiles = Arc<Mutex<HashMap<String, Vec<u8>>>>;

/// In-memory storage; clones share the same files.
#[derive(Debug, Clone, Default)]
pub struct MemStorage {
    files: MemFiles,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

struct MemWriter {
    files: MemFiles,
    name: String,
}

impl Write for MemWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.files.lock().entry(self.name.clone()).or_default().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct MemFile {
    bytes: Arc<Vec<u8>>,
}

impl RandomAccess for MemFile {
    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let start = offset as usize;
        let src = self
            .bytes
            .get(start..start + buf.len())
            .ok_or_else(|| IndexError::Io(io::ErrorKind::UnexpectedEof.into()))?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

impl Storage for MemStorage {
    fn create(&self, name: &str) -> Result<Box<dyn Write + Send>> {
        self.files.lock().insert(name.to_string(), Vec::new());
        Ok(Box::new(MemWriter { files: self.files.clone(), name: name.to_string() }))
    }

    fn open(&self, name: &str) -> Result<Box<dyn RandomAccess>> {
        let files = self.files.lock();
        let bytes = files
            .get(name)
            .ok_or_else(|| IndexError::Io(io::Error::new(io::ErrorKind::NotFound, name.to_string())))?;
        Ok(Box::new(MemFile { bytes: Arc::new(bytes.clone()) }))
    }

    fn exists(&self, name: &str) -> bool {
        self.files.lock().contains_key(name)
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.files.lock().remove(name);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.files.lock().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
