use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted structure does not decode the way it was written.
    #[error("corrupt {what}: {detail}")]
    Corrupt { what: &'static str, detail: String },

    #[error("varint value does not fit in {bits} bits")]
    VarintOverflow { bits: u32 },

    #[error("malformed corpus row at line {line}: expected `title<TAB>body`")]
    MalformedRow { line: usize },

    #[error("unsupported snapshot: {0}")]
    UnsupportedSnapshot(String),

    #[error("snapshot encoding: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error("meta file: {0}")]
    Meta(#[from] serde_json::Error),
}

impl IndexError {
    pub(crate) fn corrupt(what: &'static str, detail: impl Into<String>) -> Self {
        IndexError::Corrupt { what, detail: detail.into() }
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
