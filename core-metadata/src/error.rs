use std::collections::TryReserveError;

use thiserror::Error;

use crate::reader::ReadError;

#[derive(Error, Debug)]
pub enum MetadataError {
    /// The stream reader could not supply the bytes yet; retry after feeding more input.
    #[error("Stream needs more data")]
    NeedMoreData,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Out of memory")]
    OutOfMemory,

    #[error("Unknown text encoding: {0}")]
    UnknownEncoding(u8),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),
}

impl From<ReadError> for MetadataError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::NeedMore => MetadataError::NeedMoreData,
            ReadError::Io(e) => MetadataError::Io(e),
        }
    }
}

impl From<TryReserveError> for MetadataError {
    fn from(_: TryReserveError) -> Self {
        MetadataError::OutOfMemory
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
