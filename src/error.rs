use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage write failed: {0}")]
    StorageWrite(String),
    #[error("Storage read failed: {0}")]
    StorageRead(String),
    #[error("Persistence failed: {0}")]
    Persistence(String),
    #[error("Access denied: {0}")]
    Authorization(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        source: Box<PortalError>,
    },
}

/// Coarse classification used when a failure is folded into a session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    StorageWrite,
    StorageRead,
    Persistence,
    Authorization,
    NotFound,
    InvalidInput,
    Config,
    Io,
}

impl PortalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PortalError::Io(_) => ErrorKind::Io,
            PortalError::StorageWrite(_) => ErrorKind::StorageWrite,
            PortalError::StorageRead(_) => ErrorKind::StorageRead,
            PortalError::Persistence(_) => ErrorKind::Persistence,
            PortalError::Authorization(_) => ErrorKind::Authorization,
            PortalError::NotFound(_) => ErrorKind::NotFound,
            PortalError::InvalidInput(_) => ErrorKind::InvalidInput,
            PortalError::Config(_) => ErrorKind::Config,
            PortalError::RetriesExhausted { source, .. } => source.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
