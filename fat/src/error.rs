use std::io;

use thiserror::Error;

use crate::ClusterId;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("virtual disk unavailable: {0}")]
    StorageUnavailable(#[from] io::Error),
    #[error("cluster {index} is out of range, capacity is {capacity}")]
    OutOfRange { index: usize, capacity: usize },
    #[error("not enough free clusters")]
    NoSpace,
    #[error("cluster chain corrupted at cluster {0}")]
    CorruptChain(ClusterId),
    #[error("invalid volume: {0}")]
    InvalidVolume(String),
    #[error("invalid name {0:?}")]
    NameInvalid(String),
    #[error("{0:?} already exists")]
    NameCollision(String),
    #[error("the system cannot find {0:?}")]
    PathNotFound(String),
    #[error("{0:?} is not a directory")]
    NotADirectory(String),
    #[error("{0:?} is not a file")]
    NotAFile(String),
    #[error("directory {0:?} is not empty")]
    DirectoryNotEmpty(String),
}

pub type Result<T> = core::result::Result<T, Error>;
