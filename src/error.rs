use thiserror::Error;

/// Which persistence sub-operation failed during the Saving phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceKind {
    Profile,
    Transaction,
    Asset,
}

impl std::fmt::Display for PersistenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceKind::Profile => write!(f, "profile"),
            PersistenceKind::Transaction => write!(f, "transaction"),
            PersistenceKind::Asset => write!(f, "asset"),
        }
    }
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unreadable document: {0}")]
    UnreadableDocument(String),

    #[error("Document upload failed: {0}")]
    UploadFailed(String),

    #[error("Extraction service unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Malformed extraction response: {0}")]
    MalformedOracleResponse(String),

    #[error("Extraction service rate limited after {attempts} attempts")]
    OracleRateLimited { attempts: u32 },

    #[error("Cannot identify client: no name detected in the document and no client selected")]
    UnresolvedClient,

    #[error("{kind} write failed: {message}")]
    Persistence {
        kind: PersistenceKind,
        message: String,
    },

    #[error("Client registry error: {0}")]
    Registry(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;

/// Error type of the narrow relational-store boundary. Backends report plain
/// messages; the gateway and registry attach the operation context.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
