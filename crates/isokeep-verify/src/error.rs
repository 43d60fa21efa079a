use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("no line matching {wanted:?} in checksum file")]
    HashNotListed { wanted: Vec<String> },

    #[error("checksum line has no column {position}: {line:?}")]
    MalformedChecksumLine { line: String, position: usize },

    #[error("expected checksum is not valid hex: {0:?}")]
    InvalidHex(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignature(String),

    #[error("signature does not verify against the configured public key")]
    SignatureInvalid,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, VerifyError>;
